//! Accounts allowed to log in.
//!
//! Loaded from `users.yaml` in the data directory:
//!
//! ```text
//! users:
//!   - email: anna@example.com
//!     username: anna
//!     password_sha256: <hex digest>
//! ```

use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub email: String,
    pub username: String,
    password_sha256: String,
}

/// Why a login attempt failed.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    MissingFields,
    UnknownEmail(String),
    BadCredentials,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingFields => write!(f, "Must provide user email and password"),
            AuthError::UnknownEmail(email) => {
                write!(f, "Could not find user with email {}", email)
            }
            AuthError::BadCredentials => write!(f, "Bad credentials"),
        }
    }
}

impl std::error::Error for AuthError {}

#[derive(Debug)]
pub enum UserStoreError {
    IoError(std::io::Error),
    ParseError(serde_yaml::Error),
}

impl std::fmt::Display for UserStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserStoreError::IoError(e) => write!(f, "I/O error: {}", e),
            UserStoreError::ParseError(e) => write!(f, "Invalid users file: {}", e),
        }
    }
}

impl std::error::Error for UserStoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UserStoreError::IoError(e) => Some(e),
            UserStoreError::ParseError(e) => Some(e),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct UsersFile {
    #[serde(default)]
    users: Vec<User>,
}

/// Users indexed by email.
#[derive(Debug, Clone)]
pub struct UserStore {
    path: PathBuf,
    users: HashMap<String, User>,
}

impl UserStore {
    /// Loads `users.yaml` from the data directory.
    ///
    /// A missing or corrupt file yields an empty store.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join("users.yaml");

        match Self::load_users(&path) {
            Ok(users) => {
                tracing::info!("Loaded {} user(s)", users.len());
                Self { path, users }
            }
            Err(e) => {
                if matches!(&e, UserStoreError::IoError(io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
                {
                    tracing::info!("No users.yaml found, starting with 0 users");
                } else {
                    tracing::warn!("Failed to load users.yaml: {}", e);
                }
                Self {
                    path,
                    users: HashMap::new(),
                }
            }
        }
    }

    fn load_users(path: &Path) -> Result<HashMap<String, User>, UserStoreError> {
        let contents = std::fs::read_to_string(path).map_err(UserStoreError::IoError)?;
        let file: Option<UsersFile> =
            serde_yaml::from_str(&contents).map_err(UserStoreError::ParseError)?;

        Ok(file
            .unwrap_or_default()
            .users
            .into_iter()
            .map(|user| (user.email.clone(), user))
            .collect())
    }

    /// Checks an email/password pair and returns the matching user.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<&User, AuthError> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }
        let user = self
            .users
            .get(email)
            .ok_or_else(|| AuthError::UnknownEmail(email.to_string()))?;

        if user.password_sha256.eq_ignore_ascii_case(&hash_password(password)) {
            Ok(user)
        } else {
            Err(AuthError::BadCredentials)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// Hex-encoded SHA-256 of a password, as stored in `users.yaml`.
pub fn hash_password(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_users(dir: &Path) {
        let contents = format!(
            "users:\n  - email: anna@example.com\n    username: anna\n    password_sha256: {}\n",
            hash_password("secret")
        );
        std::fs::write(dir.join("users.yaml"), contents).unwrap();
    }

    #[test]
    fn test_load_empty_when_no_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = UserStore::load(temp_dir.path());

        assert!(store.is_empty());
    }

    #[test]
    fn test_load_empty_when_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("users.yaml"), "users: [[[").unwrap();

        assert!(UserStore::load(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_authenticate() {
        let temp_dir = TempDir::new().unwrap();
        write_users(temp_dir.path());
        let store = UserStore::load(temp_dir.path());
        assert_eq!(store.len(), 1);

        let user = store.authenticate("anna@example.com", "secret").unwrap();
        assert_eq!(user.username, "anna");

        assert_eq!(
            store.authenticate("anna@example.com", "wrong").unwrap_err(),
            AuthError::BadCredentials
        );
        assert_eq!(
            store.authenticate("bob@example.com", "secret").unwrap_err(),
            AuthError::UnknownEmail("bob@example.com".into())
        );
        assert_eq!(
            store.authenticate("", "secret").unwrap_err(),
            AuthError::MissingFields
        );
    }

    #[test]
    fn test_hash_password_is_hex_sha256() {
        assert_eq!(
            hash_password("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
