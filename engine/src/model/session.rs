//! Sessions: an ordered batch of operations with one overall lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{OperationId, SessionId};
use super::operation::{Operation, OperationStatus};

/// Session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, no operations yet.
    #[default]
    Building,
    /// Has operations awaiting review.
    PendingReview,
    /// Apply in progress.
    Applying,
    /// Every operation applied.
    Completed,
    /// Some operations applied, some failed or were skipped.
    PartiallyCompleted,
    /// Nothing applied, or cancelled by the caller.
    Cancelled,
    /// Applied operations were undone.
    Reverted,
}

impl SessionStatus {
    /// Whether operations may still be added or removed.
    #[must_use]
    pub fn is_editable(self) -> bool {
        matches!(self, Self::Building | Self::PendingReview)
    }

    /// Whether the session reached an end state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::PartiallyCompleted | Self::Cancelled | Self::Reverted
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Building => write!(f, "building"),
            Self::PendingReview => write!(f, "pending_review"),
            Self::Applying => write!(f, "applying"),
            Self::Completed => write!(f, "completed"),
            Self::PartiallyCompleted => write!(f, "partially_completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Reverted => write!(f, "reverted"),
        }
    }
}

/// Per-status operation counts for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Total operations.
    pub total: usize,
    /// Pending operations.
    pub pending: usize,
    /// Applied operations.
    pub applied: usize,
    /// Rejected operations.
    pub rejected: usize,
    /// Failed operations.
    pub failed: usize,
    /// Reverted operations.
    pub reverted: usize,
    /// Operations in conflict.
    pub conflict: usize,
}

/// A batch of proposed file changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session ID.
    pub id: SessionId,
    /// Short title.
    pub title: String,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Operations in display and apply order.
    pub operations: Vec<Operation>,
    /// Current status.
    pub status: SessionStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When apply finished or the session was cancelled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Who initiated the session.
    pub source: String,
}

impl Session {
    /// Creates an empty session in [`SessionStatus::Building`].
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        source: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            id: SessionId::generate(),
            title: title.into(),
            description,
            operations: Vec::new(),
            status: SessionStatus::Building,
            created_at: Utc::now(),
            completed_at: None,
            source: source.into(),
        }
    }

    /// Finds an operation by ID.
    #[must_use]
    pub fn operation(&self, id: &OperationId) -> Option<&Operation> {
        self.operations.iter().find(|op| &op.id == id)
    }

    /// Finds an operation by ID for mutation.
    pub fn operation_mut(&mut self, id: &OperationId) -> Option<&mut Operation> {
        self.operations.iter_mut().find(|op| &op.id == id)
    }

    /// Counts operations by status.
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.operations
            .iter()
            .fold(SessionStats::default(), |mut stats, op| {
                stats.total += 1;
                match op.status {
                    OperationStatus::Pending => stats.pending += 1,
                    OperationStatus::Applied => stats.applied += 1,
                    OperationStatus::Rejected => stats.rejected += 1,
                    OperationStatus::Failed => stats.failed += 1,
                    OperationStatus::Reverted => stats.reverted += 1,
                    OperationStatus::Conflict => stats.conflict += 1,
                }
                stats
            })
    }

    /// Every path touched by the session, in operation order, deduplicated.
    #[must_use]
    pub fn affected_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        for op in &self.operations {
            for path in op.change.paths() {
                if !paths.iter().any(|p| p == path) {
                    paths.push(path.to_string());
                }
            }
        }
        paths
    }
}
