//! Operations: a change plus its review and apply lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::change::Change;
use super::ids::OperationId;

/// Operation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Awaiting review or apply.
    #[default]
    Pending,
    /// Written through the content store.
    Applied,
    /// Rejected by the reviewer; never attempted.
    Rejected,
    /// Attempted and failed.
    Failed,
    /// Applied, then undone.
    Reverted,
    /// The file diverged from the recorded original.
    Conflict,
}

impl OperationStatus {
    /// Whether the status is final for the current apply/revert cycle.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Applied | Self::Rejected | Self::Failed | Self::Reverted
        )
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Applied => write!(f, "applied"),
            Self::Rejected => write!(f, "rejected"),
            Self::Failed => write!(f, "failed"),
            Self::Reverted => write!(f, "reverted"),
            Self::Conflict => write!(f, "conflict"),
        }
    }
}

/// One file-level change within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Operation ID.
    pub id: OperationId,
    /// The change carried by this operation.
    pub change: Change,
    /// Current status.
    pub status: OperationStatus,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Last error recorded while applying or reverting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the change was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
    /// Who proposed the change.
    pub source: String,
}

impl Operation {
    /// Creates a pending operation.
    #[must_use]
    pub fn new(change: Change, source: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: OperationId::generate(),
            change,
            status: OperationStatus::Pending,
            description,
            error: None,
            created_at: Utc::now(),
            applied_at: None,
            source: source.into(),
        }
    }

    /// Number of hunks currently accepted, or `None` without hunks.
    #[must_use]
    pub fn accepted_hunk_count(&self) -> Option<usize> {
        self.change
            .hunks
            .as_ref()
            .map(|hunks| hunks.iter().filter(|h| h.accepted).count())
    }
}
