//! Applying a session's operations to the content store.

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::core::SessionEngine;
use super::types::{ApplyOptions, ApplyResult, EngineError, OperationError};
use crate::events::SessionChangeKind;
use crate::infrastructure::audit::{self, AuditEvent};
use crate::merge::merge_hunks;
use crate::model::{Change, ChangeKind, OperationStatus, Session, SessionId, SessionStatus};
use crate::store::StoreError;

impl SessionEngine {
    /// Applies a session with the engine's configured default options.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`].
    pub async fn apply_with_defaults(
        &self,
        session_id: &SessionId,
    ) -> Result<ApplyResult, EngineError> {
        self.apply(session_id, self.default_apply).await
    }

    /// Applies every pending operation of a session, in order.
    ///
    /// Rejected operations are counted as skipped. Operations in any other
    /// non-pending state are left alone, so applying the same session twice
    /// writes nothing the second time. Per-operation failures are recorded on
    /// the operation and in the result; they never abort the call unless
    /// `stop_on_error` is set.
    ///
    /// The final session status is derived from every operation, not only
    /// the ones this call attempted: Completed when none is Failed or
    /// Rejected, PartiallyCompleted when some are Applied, Cancelled
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotFound`] for an unknown session and
    /// [`EngineError::InvalidSessionState`] if the session is already being
    /// applied, was cancelled, or has been reverted.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn apply(
        &self,
        session_id: &SessionId,
        options: ApplyOptions,
    ) -> Result<ApplyResult, EngineError> {
        let _gate = self.write_gate.lock().await;

        let session = self
            .sessions
            .update(session_id, |session| {
                if matches!(
                    session.status,
                    SessionStatus::Applying | SessionStatus::Cancelled | SessionStatus::Reverted
                ) {
                    return Err(EngineError::InvalidSessionState {
                        id: session.id.clone(),
                        status: session.status,
                        action: "apply",
                    });
                }
                session.status = SessionStatus::Applying;
                Ok(session.clone())
            })
            .ok_or_else(|| EngineError::SessionNotFound(session_id.clone()))??;
        self.events
            .emit(&session, SessionChangeKind::Updated, None);

        if options.create_backup {
            self.backups
                .capture(session_id, self.store.as_ref(), &session.operations)
                .await;
        }

        let mut result = ApplyResult::default();
        let mut written = Vec::new();

        for op in &session.operations {
            match op.status {
                OperationStatus::Pending => {}
                OperationStatus::Rejected => {
                    result.skipped_count += 1;
                    continue;
                }
                _ => continue,
            }

            let outcome = self.apply_change(&op.change).await;
            let message = outcome.as_ref().err().map(ToString::to_string);
            self.mutate_operation(session_id, &op.id, |target| {
                match &message {
                    None => {
                        target.status = OperationStatus::Applied;
                        target.applied_at = Some(Utc::now());
                        target.error = None;
                    }
                    Some(message) => {
                        target.status = OperationStatus::Failed;
                        target.error = Some(message.clone());
                    }
                }
                true
            });

            match outcome {
                Ok(path) => {
                    debug!(operation_id = %op.id, path = %op.change.file_path, "Operation applied");
                    result.success_count += 1;
                    written.extend(path);
                }
                Err(e) => {
                    warn!(operation_id = %op.id, path = %op.change.file_path, error = %e, "Operation failed");
                    result.failed_count += 1;
                    result.errors.push(OperationError {
                        operation_id: op.id.clone(),
                        file_path: op.change.file_path.clone(),
                        message: e.to_string(),
                    });
                    if options.stop_on_error {
                        break;
                    }
                }
            }
        }

        if options.save_after_apply {
            for path in &written {
                if let Err(e) = self.store.flush(path).await {
                    warn!(path = %path, error = %e, "Flush after apply failed");
                }
            }
        }

        result.success = result.failed_count == 0;

        let session = self
            .sessions
            .update(session_id, |session| {
                session.status = final_status(session);
                session.completed_at = Some(Utc::now());
                session.clone()
            })
            .ok_or_else(|| EngineError::SessionNotFound(session_id.clone()))?;
        let status = session.status;

        let change = if status == SessionStatus::Cancelled {
            SessionChangeKind::Cancelled
        } else {
            SessionChangeKind::Completed
        };
        self.events.emit(&session, change, None);

        info!(
            status = %status,
            applied = result.success_count,
            failed = result.failed_count,
            skipped = result.skipped_count,
            "Session applied"
        );
        audit::log_audit(&AuditEvent::SessionApplied {
            session_id: session_id.to_string(),
            source: session.source.clone(),
            applied: result.success_count,
            failed: result.failed_count,
            skipped: result.skipped_count,
        });

        Ok(result)
    }

    /// Performs the store call for one change and returns the path that now
    /// holds written content, if any.
    async fn apply_change(&self, change: &Change) -> Result<Option<String>, StoreError> {
        let path = change.file_path.as_str();
        match change.kind {
            ChangeKind::Create => {
                let content = required(change.new_content.as_deref(), change.kind, "newContent")?;
                self.store.write(path, content).await?;
                Ok(Some(path.to_string()))
            }
            ChangeKind::Modify => {
                let content = match change.hunks.as_deref() {
                    Some(hunks) => {
                        let original =
                            required(change.original_content.as_deref(), change.kind, "originalContent")?;
                        merge_hunks(original, hunks)
                    }
                    None => required(change.new_content.as_deref(), change.kind, "newContent")?
                        .to_string(),
                };
                self.store.write(path, &content).await?;
                Ok(Some(path.to_string()))
            }
            ChangeKind::Delete => {
                self.store.delete(path).await?;
                Ok(None)
            }
            ChangeKind::Rename => {
                let new_path = required(change.new_file_path.as_deref(), change.kind, "newFilePath")?;
                self.store.rename(path, new_path).await?;
                Ok(Some(new_path.to_string()))
            }
        }
    }
}

/// Status of a session once an apply finishes, from all of its operations.
fn final_status(session: &Session) -> SessionStatus {
    let stats = session.stats();
    if stats.failed == 0 && stats.rejected == 0 {
        SessionStatus::Completed
    } else if stats.applied > 0 {
        SessionStatus::PartiallyCompleted
    } else {
        SessionStatus::Cancelled
    }
}

pub(super) fn required<'a>(
    value: Option<&'a str>,
    kind: ChangeKind,
    field: &str,
) -> Result<&'a str, StoreError> {
    value.ok_or_else(|| StoreError::Other(format!("{kind} change has no {field}")))
}
