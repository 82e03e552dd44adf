//! The recipe server: YAML-backed storage behind a small axum API.

pub mod routes;
pub mod storage;
pub mod tokens;
pub mod users;

pub use routes::{router, AppState, AuthUser};
pub use storage::{RecipeDatabase, Rejection, ServerStorageError};
pub use tokens::TokenStore;
pub use users::{hash_password, UserStore};

use std::path::PathBuf;

/// Server configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Directory holding `recipes.yaml` and `users.yaml`
    pub data_dir: PathBuf,
    /// Hours a login token stays valid
    pub token_expiry_hours: u64,
}

impl ServerConfig {
    /// Reads `RECIPES_PORT`, `RECIPES_DATA_DIR` and `RECIPES_TOKEN_EXPIRY_HOURS`.
    pub fn from_env() -> Self {
        let port = std::env::var("RECIPES_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let data_dir = std::env::var("RECIPES_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("recipes-server")
            });

        let token_expiry_hours = std::env::var("RECIPES_TOKEN_EXPIRY_HOURS")
            .ok()
            .and_then(|h| h.parse().ok())
            .unwrap_or(24 * 30);

        Self {
            port,
            data_dir,
            token_expiry_hours,
        }
    }

    pub fn recipes_path(&self) -> PathBuf {
        self.data_dir.join("recipes.yaml")
    }
}
