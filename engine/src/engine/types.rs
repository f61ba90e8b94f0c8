//! Error and result types for the session engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::config::ApplyDefaults;
use crate::model::{OperationId, SessionId, SessionStatus, ValidationError};
use crate::store::StoreError;

/// Errors returned for structural misuse of the engine.
///
/// Per-operation failures during apply and revert are never returned as
/// errors; they are collected into [`ApplyResult`] and [`RevertResult`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// The session ID was not found.
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),
    /// The session's status does not allow the requested action.
    #[error("Cannot {action} session {id} while it is {status}")]
    InvalidSessionState {
        /// Session ID.
        id: SessionId,
        /// Current status.
        status: SessionStatus,
        /// Attempted action.
        action: &'static str,
    },
    /// The change is inconsistent with its kind.
    #[error("Invalid change: {0}")]
    InvalidChange(#[from] ValidationError),
    /// The content store failed outside apply/revert.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Switches controlling [`crate::engine::SessionEngine::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOptions {
    /// Snapshot Modify/Delete targets before applying so revert can restore
    /// what was actually on disk.
    pub create_backup: bool,
    /// Stop at the first failed operation, leaving the rest pending.
    pub stop_on_error: bool,
    /// Flush every written path through the store after applying.
    pub save_after_apply: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self::from(&ApplyDefaults::default())
    }
}

impl From<&ApplyDefaults> for ApplyOptions {
    fn from(defaults: &ApplyDefaults) -> Self {
        Self {
            create_backup: defaults.create_backup,
            stop_on_error: defaults.stop_on_error,
            save_after_apply: defaults.save_after_apply,
        }
    }
}

/// A failure recorded against one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationError {
    /// Operation that failed.
    pub operation_id: OperationId,
    /// Path the operation targeted.
    pub file_path: String,
    /// Error message.
    pub message: String,
}

/// Outcome of an apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    /// `true` when no operation failed.
    pub success: bool,
    /// Operations applied.
    pub success_count: usize,
    /// Operations that failed.
    pub failed_count: usize,
    /// Rejected operations skipped.
    pub skipped_count: usize,
    /// One entry per failed operation.
    pub errors: Vec<OperationError>,
}

/// Outcome of a revert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevertResult {
    /// `true` when every applied operation was reverted.
    pub success: bool,
    /// Operations reverted.
    pub reverted_count: usize,
    /// Operations whose revert failed.
    pub failed_count: usize,
    /// One entry per failed revert.
    pub errors: Vec<OperationError>,
}
