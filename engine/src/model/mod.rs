//! Session, operation, change and hunk data model.
//!
//! These are plain values. All mutation of live sessions goes through
//! [`crate::engine::SessionEngine`]; callers receive cloned snapshots.

pub mod change;
pub mod hunk;
pub mod ids;
pub mod operation;
pub mod session;

pub use change::{Change, ChangeKind, language_for_path};
pub use hunk::{Hunk, Position, Range};
pub use ids::{ChangeId, HunkId, IdError, OperationId, SessionId};
pub use operation::{Operation, OperationStatus};
pub use session::{Session, SessionStats, SessionStatus};

use thiserror::Error;

/// A change whose fields are inconsistent with its kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The file path was empty.
    #[error("file path is empty")]
    EmptyPath,
    /// A field required by the change kind is missing.
    #[error("{kind} change requires {field}")]
    MissingField {
        /// Change kind.
        kind: ChangeKind,
        /// Missing field name.
        field: &'static str,
    },
    /// A field not meaningful for the change kind is set.
    #[error("{kind} change must not set {field}")]
    UnexpectedField {
        /// Change kind.
        kind: ChangeKind,
        /// Offending field name.
        field: &'static str,
    },
    /// A hunk's original range disagrees with its removed lines.
    #[error("hunk {hunk} spans {span} original lines but removes {removed}")]
    HunkRangeMismatch {
        /// Hunk ID.
        hunk: String,
        /// Lines covered by the original range.
        span: usize,
        /// Number of removed lines.
        removed: usize,
    },
    /// A hunk starts at line zero.
    #[error("hunk {0} starts at line 0; lines are 1-indexed")]
    HunkStartLine(String),
}
