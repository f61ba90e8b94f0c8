//! Conflict detection and resolution for pending sessions.

use tracing::{debug, instrument, warn};

use super::core::SessionEngine;
use super::types::EngineError;
use crate::conflict::{Conflict, ConflictResolution, detect_conflict};
use crate::infrastructure::audit::{self, AuditEvent};
use crate::model::{Operation, OperationId, OperationStatus, SessionId};

impl SessionEngine {
    /// Compares the store with the recorded original of every unapplied
    /// Modify and Delete operation.
    ///
    /// Operations that diverge are marked [`OperationStatus::Conflict`];
    /// previously conflicting operations that match again go back to
    /// Pending. Applied operations are never checked, since their content is
    /// expected to differ.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotFound`] for an unknown session and
    /// [`EngineError::Store`] if the store cannot be read.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn check_conflicts(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<Conflict>, EngineError> {
        let session = self.get_session(session_id)?;
        let mut conflicts = Vec::new();

        for op in session.operations.iter().filter(|op| {
            matches!(op.status, OperationStatus::Pending | OperationStatus::Conflict)
        }) {
            let detected = detect_conflict(self.store.as_ref(), session_id, op).await?;
            let status = if detected.is_some() {
                OperationStatus::Conflict
            } else {
                OperationStatus::Pending
            };
            self.mutate_operation(session_id, &op.id, |target| {
                if target.status == status {
                    return false;
                }
                target.status = status;
                true
            });

            if let Some(conflict) = detected {
                warn!(
                    operation_id = %op.id,
                    path = %conflict.file_path,
                    reason = %conflict.reason,
                    "Conflict detected"
                );
                audit::log_audit(&AuditEvent::ConflictDetected {
                    session_id: session_id.to_string(),
                    path: conflict.file_path.clone(),
                });
                conflicts.push(conflict);
            }
        }

        debug!(conflicts = conflicts.len(), "Conflict check finished");
        Ok(conflicts)
    }

    /// Resolves a conflicting operation.
    ///
    /// [`ConflictResolution::KeepOurs`] returns it to Pending so the next
    /// apply overwrites the store. [`ConflictResolution::KeepTheirs`] rejects
    /// it. [`ConflictResolution::Manual`] leaves it in Conflict for the
    /// caller to handle. Operations not in Conflict are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotFound`] for an unknown session.
    #[instrument(skip(self))]
    pub fn resolve_conflict(
        &self,
        session_id: &SessionId,
        operation_id: &OperationId,
        resolution: ConflictResolution,
    ) -> Result<Option<Operation>, EngineError> {
        let Some(op) = self.get_session(session_id)?.operation(operation_id).cloned() else {
            return Ok(None);
        };
        if op.status != OperationStatus::Conflict {
            debug!(status = %op.status, "Operation is not in conflict");
            return Ok(Some(op));
        }

        let status = match resolution {
            ConflictResolution::KeepOurs => OperationStatus::Pending,
            ConflictResolution::KeepTheirs => OperationStatus::Rejected,
            ConflictResolution::Manual => OperationStatus::Conflict,
        };
        self.update_operation_status(session_id, operation_id, status);
        Ok(self.get_operation(session_id, operation_id))
    }
}
