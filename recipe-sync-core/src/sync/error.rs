use super::state::FailureKind;
use crate::credentials::CredentialError;
use crate::models::InvalidRecipe;
use crate::remote::NetworkError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Not logged in")]
    NotAuthenticated,
    /// The session changed while the pass was in flight; its results were
    /// dropped.
    #[error("Sync superseded by a session change")]
    Superseded,
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    pub(crate) fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            SyncError::Network(kind) => Some(FailureKind::Network(*kind)),
            SyncError::Store(e) => Some(FailureKind::Storage(e.to_string())),
            SyncError::NotAuthenticated | SyncError::Superseded => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("Login failed: {0}")]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Credentials(#[from] CredentialError),
}

impl LoginError {
    pub(crate) fn failure_kind(&self) -> FailureKind {
        match self {
            LoginError::Network(kind) => FailureKind::Network(*kind),
            LoginError::Credentials(e) => FailureKind::Storage(e.to_string()),
        }
    }
}

/// Failures of local recipe edits. Remote failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    #[error(transparent)]
    Invalid(#[from] InvalidRecipe),
    #[error(transparent)]
    Store(#[from] StoreError),
}
