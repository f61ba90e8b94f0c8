//! Best-effort undo of an applied session.

use tracing::{debug, info, instrument, warn};

use super::apply::required;
use super::core::SessionEngine;
use super::types::{EngineError, OperationError, RevertResult};
use crate::events::SessionChangeKind;
use crate::infrastructure::audit::{self, AuditEvent};
use crate::model::{ChangeKind, Operation, OperationStatus, SessionId, SessionStatus};
use crate::store::StoreError;

impl SessionEngine {
    /// Undoes every applied operation of a session, newest first.
    ///
    /// Each failure is recorded and the walk continues. Operations that could
    /// not be reverted stay Applied with the error attached. The session ends
    /// Reverted and its backups are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotFound`] for an unknown session and
    /// [`EngineError::InvalidSessionState`] unless the session is Completed,
    /// PartiallyCompleted or Cancelled.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn revert(&self, session_id: &SessionId) -> Result<RevertResult, EngineError> {
        let _gate = self.write_gate.lock().await;

        let session = self.get_session(session_id)?;
        if !matches!(
            session.status,
            SessionStatus::Completed | SessionStatus::PartiallyCompleted | SessionStatus::Cancelled
        ) {
            return Err(EngineError::InvalidSessionState {
                id: session.id,
                status: session.status,
                action: "revert",
            });
        }

        let mut result = RevertResult::default();
        for op in session
            .operations
            .iter()
            .rev()
            .filter(|op| op.status == OperationStatus::Applied)
        {
            let outcome = self.revert_operation(session_id, op).await;
            let message = outcome.as_ref().err().map(ToString::to_string);
            self.mutate_operation(session_id, &op.id, |target| {
                match &message {
                    None => {
                        target.status = OperationStatus::Reverted;
                        target.error = None;
                    }
                    Some(message) => target.error = Some(message.clone()),
                }
                true
            });

            match outcome {
                Ok(()) => {
                    debug!(operation_id = %op.id, path = %op.change.file_path, "Operation reverted");
                    result.reverted_count += 1;
                }
                Err(e) => {
                    warn!(operation_id = %op.id, path = %op.change.file_path, error = %e, "Revert failed");
                    result.failed_count += 1;
                    result.errors.push(OperationError {
                        operation_id: op.id.clone(),
                        file_path: op.change.file_path.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
        result.success = result.failed_count == 0;

        let session = self
            .sessions
            .update(session_id, |session| {
                session.status = SessionStatus::Reverted;
                session.clone()
            })
            .ok_or_else(|| EngineError::SessionNotFound(session_id.clone()))?;
        self.backups.discard(session_id);
        self.events
            .emit(&session, SessionChangeKind::Updated, None);

        info!(
            reverted = result.reverted_count,
            failed = result.failed_count,
            "Session reverted"
        );
        audit::log_audit(&AuditEvent::SessionReverted {
            session_id: session_id.to_string(),
            reverted: result.reverted_count,
            failed: result.failed_count,
        });

        Ok(result)
    }

    /// Issues the inverse store call for one applied operation.
    ///
    /// Modify and Delete restore the pre-apply backup when one exists and the
    /// recorded original content otherwise.
    async fn revert_operation(
        &self,
        session_id: &SessionId,
        op: &Operation,
    ) -> Result<(), StoreError> {
        let change = &op.change;
        let path = change.file_path.as_str();
        match change.kind {
            ChangeKind::Create => self.store.delete(path).await,
            ChangeKind::Modify | ChangeKind::Delete => {
                let content = match self.backups.get(session_id, path) {
                    Some(content) => content,
                    None => {
                        required(change.original_content.as_deref(), change.kind, "originalContent")?
                            .to_string()
                    }
                };
                self.store.write(path, &content).await
            }
            ChangeKind::Rename => {
                let new_path = required(change.new_file_path.as_deref(), change.kind, "newFilePath")?;
                self.store.rename(new_path, path).await
            }
        }
    }
}
