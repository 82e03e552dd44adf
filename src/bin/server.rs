//! Recipe Server
//!
//! Stores recipes for the `recipes` CLI and any other client speaking the
//! same JSON API.
//!
//! # Configuration
//!
//! Environment variables:
//! - `RECIPES_PORT`: Port to listen on (default: 8080)
//! - `RECIPES_DATA_DIR`: Directory holding `recipes.yaml` and `users.yaml`
//!   (default: ~/.local/share/recipes-server)
//! - `RECIPES_TOKEN_EXPIRY_HOURS`: Login token lifetime (default: 720)
//!
//! # Users File Format
//!
//! ```yaml
//! users:
//!   - email: anna@example.com
//!     username: anna
//!     password_sha256: "<hex sha256 of the password>"
//! ```

use recipe_sync::server::{router, AppState, RecipeDatabase, ServerConfig, TokenStore, UserStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const TOKEN_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 10);

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recipes_server=info,recipe_sync=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();

    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        tracing::error!("Failed to create data directory: {}", e);
        std::process::exit(1);
    }
    tracing::info!("Data directory: {}", config.data_dir.display());

    let users = UserStore::load(&config.data_dir);
    if users.is_empty() {
        tracing::warn!(
            "No users configured in {} - every login will fail",
            users.path().display()
        );
    }

    let recipes = match RecipeDatabase::open(config.recipes_path()) {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to open recipe database: {}", e);
            std::process::exit(1);
        }
    };

    let tokens = Arc::new(TokenStore::new(config.token_expiry_hours));
    let cleanup_tokens = tokens.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TOKEN_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = cleanup_tokens.cleanup_expired();
            if removed > 0 {
                tracing::debug!("Removed {} expired token(s)", removed);
            }
        }
    });

    let app = router(AppState::new(recipes, users, tokens));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
