//! Core library for recipe-sync.
//!
//! Contains the recipe model, the last-write-wins diff, the HTTP client for
//! the recipe service and the orchestrator that keeps a local store in sync
//! with it.

pub mod credentials;
pub mod diff;
pub mod models;
pub mod remote;
pub mod store;
pub mod sync;

#[cfg(test)]
mod testing;

pub use credentials::{CredentialError, CredentialStore, Credentials, MemoryCredentialStore};
pub use diff::{compute_diff, RecipesDiff};
pub use models::{InvalidRecipe, Recipe, SyncStatus};
pub use remote::{ApiResult, Connector, HttpConnector, NetworkError, RecipeApi, RemoteClient};
pub use store::{LocalStore, MemoryStore, StoreError, StoreResult};
pub use sync::{
    FailureKind, LoginError, OrchestratorConfig, RecipeError, SyncError, SyncOrchestrator,
    SyncReport, SyncState,
};

/// Returns the library version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
