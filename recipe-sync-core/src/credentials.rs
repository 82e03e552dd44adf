use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// What a successful login leaves behind: enough to rebuild an
/// authenticated client without asking for the password again.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub server_uri: String,
    pub email: String,
    pub token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("server_uri", &self.server_uri)
            .field("email", &self.email)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Failed to access credentials: {0}")]
    Storage(String),
}

/// Durable home for [`Credentials`], consulted on startup.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<Credentials>, CredentialError>;
    fn save(&self, credentials: &Credentials) -> Result<(), CredentialError>;
    fn clear(&self) -> Result<(), CredentialError>;
}

/// Keeps credentials for the life of the process only.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            slot: Mutex::new(Some(credentials)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credentials>, CredentialError> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        *self.slot.lock() = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        *self.slot.lock() = None;
        Ok(())
    }
}

impl<T: CredentialStore + ?Sized> CredentialStore for std::sync::Arc<T> {
    fn load(&self) -> Result<Option<Credentials>, CredentialError> {
        (**self).load()
    }

    fn save(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        (**self).save(credentials)
    }

    fn clear(&self) -> Result<(), CredentialError> {
        (**self).clear()
    }
}
