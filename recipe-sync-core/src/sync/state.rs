use std::fmt;

use crate::remote::NetworkError;

/// Why the last session or sync operation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Network(NetworkError),
    /// Local persistence (records or credentials) failed.
    Storage(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Network(kind) => write!(f, "{}", kind),
            FailureKind::Storage(detail) => write!(f, "local storage: {}", detail),
        }
    }
}

/// Observable state of the sync session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SyncState {
    /// No authenticated session.
    #[default]
    Empty,
    /// Login or a sync pass is in flight.
    Pending,
    /// Authenticated; the last operation completed.
    Success,
    Failure(FailureKind),
}

impl SyncState {
    pub fn is_failure(&self) -> bool {
        matches!(self, SyncState::Failure(_))
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Empty => write!(f, "logged out"),
            SyncState::Pending => write!(f, "in progress"),
            SyncState::Success => write!(f, "ok"),
            SyncState::Failure(kind) => write!(f, "failed ({})", kind),
        }
    }
}
