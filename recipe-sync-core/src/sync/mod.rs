//! Sync orchestration: session lifecycle, observable state and full passes.

mod error;
mod orchestrator;
mod state;

pub use error::{LoginError, RecipeError, SyncError};
pub use orchestrator::{OrchestratorConfig, SyncOrchestrator, SyncReport};
pub use state::{FailureKind, SyncState};
