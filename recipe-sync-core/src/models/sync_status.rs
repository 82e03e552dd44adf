use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Per-record sync bookkeeping. Local only, never part of a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    /// Not yet confirmed by the server
    #[default]
    Pending,
    /// Server holds the same version
    Synced,
    /// Last push attempt failed; retried on the next full sync
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "PENDING",
            SyncStatus::Synced => "SYNCED",
            SyncStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(SyncStatus::Pending),
            "SYNCED" => Ok(SyncStatus::Synced),
            "ERROR" => Ok(SyncStatus::Error),
            _ => Err(format!("Invalid sync status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("synced".parse::<SyncStatus>().unwrap(), SyncStatus::Synced);
        assert_eq!("ERROR".parse::<SyncStatus>().unwrap(), SyncStatus::Error);
        assert!("unknown".parse::<SyncStatus>().is_err());
    }

    #[test]
    fn test_serde_uses_upper_case_names() {
        let json = serde_json::to_string(&SyncStatus::Pending).unwrap();
        assert_eq!(json, "\"PENDING\"");
    }
}
