//! Conflict detection between recorded originals and current store content.
//!
//! A conflict means the file changed underneath a session after the change
//! was proposed. Detection compares bytes; there is no automatic merging.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{ChangeKind, Operation, OperationId, SessionId};
use crate::store::{ContentStore, StoreError};

/// Why an operation is in conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// The file exists but its content differs from the recorded original.
    ContentChanged,
    /// The file the change expects no longer exists.
    FileMissing,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContentChanged => write!(f, "content_changed"),
            Self::FileMissing => write!(f, "file_missing"),
        }
    }
}

/// Ways a caller can settle a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Apply the session's change anyway, overwriting the store content.
    KeepOurs,
    /// Discard the operation and keep the store content.
    KeepTheirs,
    /// Resolve outside the engine.
    Manual,
}

impl ConflictResolution {
    /// Every resolution, in the order offered to callers.
    pub const ALL: [Self; 3] = [Self::KeepOurs, Self::KeepTheirs, Self::Manual];
}

impl fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeepOurs => write!(f, "keep_ours"),
            Self::KeepTheirs => write!(f, "keep_theirs"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// A detected divergence for one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    /// Session owning the operation.
    pub session_id: SessionId,
    /// Operation in conflict.
    pub operation_id: OperationId,
    /// Path compared.
    pub file_path: String,
    /// Kind of the conflicting change.
    pub kind: ChangeKind,
    /// Why the operation conflicts.
    pub reason: ConflictReason,
    /// Current store content, `None` if the file is missing.
    pub disk_content: Option<String>,
    /// Content recorded on the change.
    pub expected_content: Option<String>,
    /// Resolutions the caller may choose from.
    pub resolutions: Vec<ConflictResolution>,
}

/// Compares the store content for a Modify or Delete operation against its
/// recorded original.
///
/// Returns `Ok(None)` when the content matches or the operation kind is never
/// checked (Create, Rename).
///
/// # Errors
///
/// Returns the store error if the current content cannot be read.
pub async fn detect_conflict(
    store: &dyn ContentStore,
    session_id: &SessionId,
    operation: &Operation,
) -> Result<Option<Conflict>, StoreError> {
    let change = &operation.change;
    if !change.kind.is_destructive() {
        return Ok(None);
    }

    let disk = store.read(&change.file_path).await?;
    if disk.as_deref() == change.original_content.as_deref() {
        return Ok(None);
    }

    let reason = if disk.is_some() {
        ConflictReason::ContentChanged
    } else {
        ConflictReason::FileMissing
    };

    Ok(Some(Conflict {
        session_id: session_id.clone(),
        operation_id: operation.id.clone(),
        file_path: change.file_path.clone(),
        kind: change.kind,
        reason,
        disk_content: disk,
        expected_content: change.original_content.clone(),
        resolutions: ConflictResolution::ALL.to_vec(),
    }))
}
