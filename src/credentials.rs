//! Credentials persisted in the `sync` section of the config file.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use recipe_sync_core::{CredentialError, CredentialStore, Credentials};
use serde_yaml::{Mapping, Value};

use crate::config::Config;

/// Keeps `sync.server_url`, `sync.email` and `sync.token` in the YAML
/// config file, leaving every other key untouched.
#[derive(Debug)]
pub struct ConfigFileCredentials {
    path: PathBuf,
    current: Mutex<Option<Credentials>>,
}

impl ConfigFileCredentials {
    /// Starts from the already-loaded config so environment overrides apply.
    pub fn from_config(config: &Config) -> Self {
        let sync = &config.sync;
        let current = match (&sync.server_url, &sync.email, &sync.token) {
            (Some(server_uri), Some(email), Some(token)) => Some(Credentials {
                server_uri: server_uri.clone(),
                email: email.clone(),
                token: token.clone(),
            }),
            _ => None,
        };
        Self {
            path: config.config_path.clone(),
            current: Mutex::new(current),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_yaml(&self) -> Result<Value, CredentialError> {
        if !self.path.exists() {
            return Ok(Value::Mapping(Mapping::new()));
        }
        let contents = std::fs::read_to_string(&self.path).map_err(storage_error)?;
        if contents.trim().is_empty() {
            return Ok(Value::Mapping(Mapping::new()));
        }
        serde_yaml::from_str(&contents).map_err(storage_error)
    }

    fn write_yaml(&self, yaml: &Value) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(storage_error)?;
        }
        let contents = serde_yaml::to_string(yaml).map_err(storage_error)?;
        std::fs::write(&self.path, contents).map_err(storage_error)
    }
}

fn storage_error(e: impl std::fmt::Display) -> CredentialError {
    CredentialError::Storage(e.to_string())
}

fn key(name: &str) -> Value {
    Value::String(name.to_string())
}

/// Returns the `sync` mapping, creating it when missing.
fn sync_section(yaml: &mut Value) -> Result<&mut Mapping, CredentialError> {
    let root = yaml
        .as_mapping_mut()
        .ok_or_else(|| CredentialError::Storage("Invalid config format".to_string()))?;

    let sync = root
        .entry(key("sync"))
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if sync.is_null() {
        *sync = Value::Mapping(Mapping::new());
    }
    sync.as_mapping_mut()
        .ok_or_else(|| CredentialError::Storage("Invalid sync section".to_string()))
}

impl CredentialStore for ConfigFileCredentials {
    fn load(&self) -> Result<Option<Credentials>, CredentialError> {
        let current = self
            .current
            .lock()
            .map_err(|_| CredentialError::Storage("credential lock poisoned".to_string()))?;
        Ok(current.clone())
    }

    fn save(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        let mut yaml = self.read_yaml()?;
        let sync = sync_section(&mut yaml)?;
        sync.insert(key("server_url"), Value::String(credentials.server_uri.clone()));
        sync.insert(key("email"), Value::String(credentials.email.clone()));
        sync.insert(key("token"), Value::String(credentials.token.clone()));
        self.write_yaml(&yaml)?;

        tracing::debug!("Saved credentials to {}", self.path.display());
        let mut current = self
            .current
            .lock()
            .map_err(|_| CredentialError::Storage("credential lock poisoned".to_string()))?;
        *current = Some(credentials.clone());
        Ok(())
    }

    /// Drops the token but keeps server URL and email for the next login.
    fn clear(&self) -> Result<(), CredentialError> {
        if self.path.exists() {
            let mut yaml = self.read_yaml()?;
            if let Some(sync) = yaml
                .as_mapping_mut()
                .and_then(|root| root.get_mut(key("sync")))
                .and_then(Value::as_mapping_mut)
            {
                sync.remove(key("token"));
            }
            self.write_yaml(&yaml)?;
        }

        let mut current = self
            .current
            .lock()
            .map_err(|_| CredentialError::Storage("credential lock poisoned".to_string()))?;
        *current = None;
        Ok(())
    }
}
