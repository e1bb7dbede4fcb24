use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{StoreId, SyncLogId, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    Invoice,
}

impl SyncKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
        }
    }
}

/// Outcome of a whole sync run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncLogStatus {
    /// Every record was applied.
    Completed,
    /// Some records were applied, some rejected.
    Partial,
    /// Nothing was applied.
    Failed,
}

impl SyncLogStatus {
    pub fn from_counts(synced: u32, failed: u32) -> Self {
        match (synced, failed) {
            (_, 0) => Self::Completed,
            (0, _) => Self::Failed,
            _ => Self::Partial,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "partial" => Some(Self::Partial),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for SyncLogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit record written once per bulk sync request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncLog {
    pub id: SyncLogId,
    pub user: UserId,
    pub store: StoreId,
    pub sync_type: SyncKind,
    pub status: SyncLogStatus,
    pub items_synced: u32,
    pub items_failed: u32,
    pub error_message: Option<String>,
    pub details: serde_json::Value,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_from_counts() {
        assert_eq!(SyncLogStatus::from_counts(3, 0), SyncLogStatus::Completed);
        assert_eq!(SyncLogStatus::from_counts(0, 0), SyncLogStatus::Completed);
        assert_eq!(SyncLogStatus::from_counts(0, 2), SyncLogStatus::Failed);
        assert_eq!(SyncLogStatus::from_counts(1, 2), SyncLogStatus::Partial);
    }

    #[test]
    fn status_text_roundtrip() {
        for s in [SyncLogStatus::Completed, SyncLogStatus::Partial, SyncLogStatus::Failed] {
            assert_eq!(SyncLogStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(SyncLogStatus::parse("done"), None);
    }
}
