//! Session tokens handed out by `POST /users/login`.
//!
//! Tokens live in memory only; restarting the server logs everyone out.

use rand::Rng;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Session {
    username: String,
    expires_at: Instant,
}

/// In-memory bearer token store with expiry.
#[derive(Debug)]
pub struct TokenStore {
    tokens: RwLock<HashMap<String, Session>>,
    default_expiry: Duration,
}

impl TokenStore {
    /// Creates a store whose tokens live for `expiry_hours`.
    pub fn new(expiry_hours: u64) -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
            default_expiry: Duration::from_secs(expiry_hours * 60 * 60),
        }
    }

    /// Issues a new token for `username` (32 bytes, base64url encoded).
    pub fn issue(&self, username: &str) -> String {
        self.issue_with_expiry(username, self.default_expiry)
    }

    pub fn issue_with_expiry(&self, username: &str, expiry: Duration) -> String {
        let token = generate_token();
        let session = Session {
            username: username.to_string(),
            expires_at: Instant::now() + expiry,
        };

        let mut tokens = self.tokens.write().unwrap();
        tokens.insert(token.clone(), session);

        token
    }

    /// Returns the username behind a live token.
    pub fn validate(&self, token: &str) -> Option<String> {
        let tokens = self.tokens.read().unwrap();
        let session = tokens.get(token)?;

        if Instant::now() > session.expires_at {
            return None;
        }
        Some(session.username.clone())
    }

    /// Removes all expired tokens, returning how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let mut tokens = self.tokens.write().unwrap();
        let now = Instant::now();

        let before = tokens.len();
        tokens.retain(|_, session| session.expires_at > now);
        before - tokens.len()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.tokens.read().unwrap().len()
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(24 * 30)
    }
}

fn generate_token() -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
