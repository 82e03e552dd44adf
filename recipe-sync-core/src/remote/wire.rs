//! JSON bodies exchanged with the recipe service.
//!
//! Shared by the client and the server so both ends agree on field names.
//! Recipe content travels as `body`; timestamps are milliseconds.

use serde::{Deserialize, Serialize};

use crate::models::{Recipe, SyncStatus};

/// A recipe as stored and listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendRecipe {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub timestamp: i64,
    /// Owning user name. Only present in server responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// Body of `POST /recipes`. The server assigns what is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeRequest {
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub recipe: BackendRecipe,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub data: LoginData,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LoginData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub username: String,
    pub token: String,
}

impl std::fmt::Debug for LoginData {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("LoginData")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Error body returned with 4xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(default)]
    pub data: Option<String>,
    pub error: String,
}

impl From<BackendRecipe> for Recipe {
    fn from(r: BackendRecipe) -> Self {
        Recipe {
            id: Some(r.id),
            title: r.title,
            content: r.body,
            timestamp: r.timestamp,
            sync_status: SyncStatus::Synced,
        }
    }
}

impl From<&Recipe> for RecipeRequest {
    fn from(r: &Recipe) -> Self {
        RecipeRequest {
            id: r.id,
            title: r.title.clone(),
            body: r.content.clone(),
            timestamp: Some(r.timestamp),
        }
    }
}
