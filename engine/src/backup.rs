//! Pre-apply content snapshots used by revert.
//!
//! Backups are keyed by session, then by file path. Only Modify and Delete
//! operations destroy content, so only their targets are captured.

use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::model::{Operation, OperationStatus, SessionId};
use crate::store::ContentStore;

/// Holds pre-apply snapshots for every session that has been applied.
#[derive(Debug, Default)]
pub struct BackupManager {
    backups: RwLock<HashMap<SessionId, HashMap<String, String>>>,
}

impl BackupManager {
    /// Creates an empty backup manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the current content of every path a pending destructive
    /// operation is about to overwrite or delete.
    ///
    /// The first snapshot of a path wins: re-applying a session never
    /// replaces a backup with already-modified content. Paths that do not
    /// exist or cannot be read are skipped; revert then falls back to the
    /// change's recorded original content. Returns the number of new
    /// snapshots taken.
    pub async fn capture(
        &self,
        session_id: &SessionId,
        store: &dyn ContentStore,
        operations: &[Operation],
    ) -> usize {
        let mut captured = 0;
        for op in operations {
            if op.status != OperationStatus::Pending || !op.change.kind.is_destructive() {
                continue;
            }
            let path = op.change.file_path.as_str();
            if self.get(session_id, path).is_some() {
                continue;
            }
            match store.read(path).await {
                Ok(Some(content)) => {
                    self.record(session_id, path, content);
                    captured += 1;
                }
                Ok(None) => debug!(session_id = %session_id, path, "Nothing to back up"),
                Err(e) => warn!(session_id = %session_id, path, error = %e, "Backup read failed"),
            }
        }
        debug!(session_id = %session_id, captured, "Backups captured");
        captured
    }

    /// Records a snapshot for `path`, keeping any existing one.
    pub fn record(&self, session_id: &SessionId, path: &str, content: String) {
        self.backups
            .write()
            .entry(session_id.clone())
            .or_default()
            .entry(path.to_string())
            .or_insert(content);
    }

    /// Returns the snapshot of `path` for a session.
    #[must_use]
    pub fn get(&self, session_id: &SessionId, path: &str) -> Option<String> {
        self.backups
            .read()
            .get(session_id)
            .and_then(|files| files.get(path))
            .cloned()
    }

    /// Whether any snapshot exists for a session.
    #[must_use]
    pub fn has_backups(&self, session_id: &SessionId) -> bool {
        self.backups
            .read()
            .get(session_id)
            .is_some_and(|files| !files.is_empty())
    }

    /// Paths backed up for a session, sorted.
    #[must_use]
    pub fn paths(&self, session_id: &SessionId) -> Vec<String> {
        let mut paths: Vec<String> = self
            .backups
            .read()
            .get(session_id)
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }

    /// Drops every snapshot for a session.
    pub fn discard(&self, session_id: &SessionId) {
        if self.backups.write().remove(session_id).is_some() {
            debug!(session_id = %session_id, "Backups discarded");
        }
    }
}
