use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::sync_status::SyncStatus;

/// Reasons a recipe is rejected before it is written anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRecipe {
    #[error("Recipe title can't be empty")]
    EmptyTitle,
    #[error("Recipe content can't be empty")]
    EmptyContent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recipe {
    pub id: Option<i64>,
    pub title: String,
    pub content: String,
    /// Last modification instant, milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default)]
    pub sync_status: SyncStatus,
}

impl Recipe {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            content: content.into(),
            timestamp: now_millis(),
            sync_status: SyncStatus::Pending,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_sync_status(mut self, status: SyncStatus) -> Self {
        self.sync_status = status;
        self
    }

    /// Replaces title and content and bumps the timestamp, keeping the id.
    pub fn edited(mut self, title: impl Into<String>, content: impl Into<String>) -> Self {
        self.title = title.into();
        self.content = content.into();
        self.timestamp = now_millis().max(self.timestamp + 1);
        self.sync_status = SyncStatus::Pending;
        self
    }

    pub fn validate(&self) -> Result<(), InvalidRecipe> {
        if self.title.trim().is_empty() {
            return Err(InvalidRecipe::EmptyTitle);
        }
        if self.content.trim().is_empty() {
            return Err(InvalidRecipe::EmptyContent);
        }
        Ok(())
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "Recipe[{}] {} (ts {})", id, self.title, self.timestamp),
            None => write!(f, "Recipe[new] {} (ts {})", self.title, self.timestamp),
        }
    }
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
