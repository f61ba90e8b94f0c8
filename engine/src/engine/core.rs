//! Core session engine.
//!
//! This module provides the [`SessionEngine`] together with operation
//! admission, review toggles, read accessors and cancellation. Apply, revert
//! and conflict handling live in sibling modules.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::storage::SessionStorage;
use super::types::{ApplyOptions, EngineError};
use crate::backup::BackupManager;
use crate::diff::{DiffOptions, generate_diff};
use crate::events::{EventBroadcaster, EventReceiver, SessionChangeKind};
use crate::infrastructure::audit::{self, AuditEvent};
use crate::infrastructure::config::EngineSettings;
use crate::merge::{HunkStrategy, derive_hunks};
use crate::model::{
    Change, ChangeKind, HunkId, Operation, OperationId, OperationStatus, Session, SessionId,
    SessionStatus,
};
use crate::store::ContentStore;

/// Orchestrates sessions against a content store.
///
/// All state lives in the injected [`SessionStorage`] and the engine's
/// [`BackupManager`]; accessors hand out snapshots and every mutation goes
/// through an engine method.
pub struct SessionEngine {
    pub(super) store: Arc<dyn ContentStore>,
    pub(super) sessions: Arc<SessionStorage>,
    pub(super) backups: BackupManager,
    pub(super) events: EventBroadcaster,
    pub(super) hunk_strategy: HunkStrategy,
    pub(super) default_apply: ApplyOptions,
    /// Serializes apply and revert across sessions so overlapping paths are
    /// never written concurrently.
    pub(super) write_gate: Mutex<()>,
}

/// Builder for [`SessionEngine`].
pub struct SessionEngineBuilder {
    store: Arc<dyn ContentStore>,
    sessions: Option<Arc<SessionStorage>>,
    settings: EngineSettings,
}

impl SessionEngineBuilder {
    /// Uses the given settings instead of the defaults.
    #[must_use]
    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Uses an existing session storage (dependency injection).
    #[must_use]
    pub fn storage(mut self, sessions: Arc<SessionStorage>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Builds the engine.
    #[must_use]
    pub fn build(self) -> SessionEngine {
        SessionEngine {
            store: self.store,
            sessions: self.sessions.unwrap_or_default(),
            backups: BackupManager::new(),
            events: EventBroadcaster::new(self.settings.event_capacity),
            hunk_strategy: self.settings.strategy(),
            default_apply: ApplyOptions::from(&self.settings.default_apply),
            write_gate: Mutex::new(()),
        }
    }
}

impl SessionEngine {
    /// Creates an engine with default settings and fresh storage.
    #[must_use]
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self::builder(store).build()
    }

    /// Creates an engine over explicit session storage.
    #[must_use]
    pub fn with_storage(store: Arc<dyn ContentStore>, sessions: Arc<SessionStorage>) -> Self {
        Self::builder(store).storage(sessions).build()
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder(store: Arc<dyn ContentStore>) -> SessionEngineBuilder {
        SessionEngineBuilder {
            store,
            sessions: None,
            settings: EngineSettings::default(),
        }
    }

    /// The content store this engine writes through.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Apply options used by [`Self::apply_with_defaults`].
    #[must_use]
    pub fn default_apply_options(&self) -> ApplyOptions {
        self.default_apply
    }

    /// Subscribes to session-change events.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    // =========================================================================
    // Admission
    // =========================================================================

    /// Creates an empty session in [`SessionStatus::Building`].
    #[instrument(skip(self, description))]
    pub fn create_session(
        &self,
        title: &str,
        source: &str,
        description: Option<String>,
    ) -> Session {
        let session = Session::new(title, source, description);
        info!(session_id = %session.id, "Session created");
        self.sessions.insert(session.clone());
        self.events.emit(&session, SessionChangeKind::Created, None);
        session
    }

    /// Adds a change to a session as a new pending operation.
    ///
    /// Modify changes without hunks get hunks derived with the configured
    /// strategy. The session moves to [`SessionStatus::PendingReview`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotFound`] for an unknown session,
    /// [`EngineError::InvalidSessionState`] unless the session is Building or
    /// PendingReview, and [`EngineError::InvalidChange`] for a malformed
    /// change.
    #[instrument(skip(self, change, description), fields(path = %change.file_path, kind = %change.kind))]
    pub fn add_operation(
        &self,
        session_id: &SessionId,
        mut change: Change,
        description: Option<String>,
    ) -> Result<Operation, EngineError> {
        change.validate()?;
        if change.kind == ChangeKind::Modify && change.hunks.is_none() {
            let original = change.original_content.as_deref().unwrap_or_default();
            let modified = change.new_content.as_deref().unwrap_or_default();
            change.hunks = Some(derive_hunks(original, modified, self.hunk_strategy));
        }

        let (session, operation) = self
            .sessions
            .update(session_id, |session| {
                if !session.status.is_editable() {
                    return Err(EngineError::InvalidSessionState {
                        id: session.id.clone(),
                        status: session.status,
                        action: "add an operation to",
                    });
                }
                let operation = Operation::new(change, session.source.clone(), description);
                session.operations.push(operation.clone());
                session.status = SessionStatus::PendingReview;
                Ok((session.clone(), operation))
            })
            .ok_or_else(|| EngineError::SessionNotFound(session_id.clone()))??;

        debug!(operation_id = %operation.id, "Operation added");
        self.events
            .emit(&session, SessionChangeKind::OperationAdded, Some(&operation));
        Ok(operation)
    }

    /// Removes an operation. Unknown IDs are ignored.
    ///
    /// Returns whether an operation was removed. Operations of a session that
    /// has already been applied are kept so revert stays possible.
    #[instrument(skip(self))]
    pub fn remove_operation(&self, session_id: &SessionId, operation_id: &OperationId) -> bool {
        let removed = self
            .sessions
            .update(session_id, |session| {
                if !session.status.is_editable() {
                    warn!(status = %session.status, "Ignoring removal from a non-editable session");
                    return None;
                }
                let index = session.operations.iter().position(|op| &op.id == operation_id)?;
                let operation = session.operations.remove(index);
                if session.operations.is_empty() {
                    session.status = SessionStatus::Building;
                }
                Some((session.clone(), operation))
            })
            .flatten();

        match removed {
            Some((session, operation)) => {
                self.events
                    .emit(&session, SessionChangeKind::Updated, Some(&operation));
                true
            }
            None => false,
        }
    }

    /// Sets an operation's status. Unknown IDs are ignored.
    #[instrument(skip(self))]
    pub fn update_operation_status(
        &self,
        session_id: &SessionId,
        operation_id: &OperationId,
        status: OperationStatus,
    ) -> bool {
        self.mutate_operation(session_id, operation_id, |op| {
            if op.status == status {
                return false;
            }
            op.status = status;
            true
        })
    }

    /// Marks an operation Rejected so apply skips it.
    pub fn reject_operation(&self, session_id: &SessionId, operation_id: &OperationId) -> bool {
        self.update_operation_status(session_id, operation_id, OperationStatus::Rejected)
    }

    /// Marks an operation Pending again.
    pub fn accept_operation(&self, session_id: &SessionId, operation_id: &OperationId) -> bool {
        self.update_operation_status(session_id, operation_id, OperationStatus::Pending)
    }

    /// Accepts or rejects one hunk. Unknown IDs are ignored.
    #[instrument(skip(self))]
    pub fn set_hunk_accepted(
        &self,
        session_id: &SessionId,
        operation_id: &OperationId,
        hunk_id: &HunkId,
        accepted: bool,
    ) -> bool {
        self.mutate_operation(session_id, operation_id, |op| {
            let Some(hunk) = op
                .change
                .hunks
                .iter_mut()
                .flatten()
                .find(|h| &h.id == hunk_id)
            else {
                return false;
            };
            if hunk.accepted == accepted {
                return false;
            }
            hunk.accepted = accepted;
            true
        })
    }

    /// Accepts or rejects every hunk of an operation.
    #[instrument(skip(self))]
    pub fn set_all_hunks_accepted(
        &self,
        session_id: &SessionId,
        operation_id: &OperationId,
        accepted: bool,
    ) -> bool {
        self.mutate_operation(session_id, operation_id, |op| {
            let mut changed = false;
            for hunk in op.change.hunks.iter_mut().flatten() {
                changed |= hunk.accepted != accepted;
                hunk.accepted = accepted;
            }
            changed
        })
    }

    /// Applies `f` to an operation and publishes an update when it reports a
    /// change.
    pub(super) fn mutate_operation(
        &self,
        session_id: &SessionId,
        operation_id: &OperationId,
        f: impl FnOnce(&mut Operation) -> bool,
    ) -> bool {
        let updated = self
            .sessions
            .update(session_id, |session| {
                let operation = session.operation_mut(operation_id)?;
                if !f(operation) {
                    return None;
                }
                let operation = operation.clone();
                Some((session.clone(), operation))
            })
            .flatten();

        match updated {
            Some((session, operation)) => {
                self.events
                    .emit(&session, SessionChangeKind::OperationUpdated, Some(&operation));
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Snapshot of a session.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotFound`] for an unknown session.
    pub fn get_session(&self, session_id: &SessionId) -> Result<Session, EngineError> {
        self.sessions
            .get(session_id)
            .ok_or_else(|| EngineError::SessionNotFound(session_id.clone()))
    }

    /// Snapshot of one operation, if both IDs resolve.
    #[must_use]
    pub fn get_operation(
        &self,
        session_id: &SessionId,
        operation_id: &OperationId,
    ) -> Option<Operation> {
        self.sessions
            .get(session_id)?
            .operation(operation_id)
            .cloned()
    }

    /// Snapshots of every session, newest first.
    #[must_use]
    pub fn list_sessions(&self) -> Vec<Session> {
        let mut sessions = self.sessions.all();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions
    }

    /// Number of sessions held by the engine.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Paths with a pre-apply backup for a session.
    #[must_use]
    pub fn backup_paths(&self, session_id: &SessionId) -> Vec<String> {
        self.backups.paths(session_id)
    }

    /// Removes a session and its backups.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotFound`] for an unknown session.
    #[instrument(skip(self))]
    pub fn delete_session(&self, session_id: &SessionId) -> Result<Session, EngineError> {
        let session = self
            .sessions
            .remove(session_id)
            .ok_or_else(|| EngineError::SessionNotFound(session_id.clone()))?;
        self.backups.discard(session_id);
        info!("Session deleted");
        Ok(session)
    }

    // =========================================================================
    // Cancel
    // =========================================================================

    /// Cancels a session without touching the store or its operations.
    ///
    /// Cancelling a session that is applying or already finished is a no-op
    /// and returns the unchanged session.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotFound`] for an unknown session.
    #[instrument(skip(self))]
    pub fn cancel(&self, session_id: &SessionId) -> Result<Session, EngineError> {
        let (session, changed) = self
            .sessions
            .update(session_id, |session| {
                if !session.status.is_editable() {
                    warn!(status = %session.status, "Ignoring cancel of a session past review");
                    return (session.clone(), false);
                }
                session.status = SessionStatus::Cancelled;
                session.completed_at = Some(Utc::now());
                (session.clone(), true)
            })
            .ok_or_else(|| EngineError::SessionNotFound(session_id.clone()))?;

        if changed {
            info!("Session cancelled");
            audit::log_audit(&AuditEvent::SessionCancelled {
                session_id: session_id.to_string(),
            });
            self.events
                .emit(&session, SessionChangeKind::Cancelled, None);
        }
        Ok(session)
    }

    // =========================================================================
    // Diff rendering
    // =========================================================================

    /// Renders one operation as a unified diff.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotFound`] for an unknown session and
    /// [`EngineError::Internal`] for an unknown operation.
    pub fn generate_operation_diff(
        &self,
        session_id: &SessionId,
        operation_id: &OperationId,
        options: &DiffOptions,
    ) -> Result<String, EngineError> {
        let session = self.get_session(session_id)?;
        let operation = session.operation(operation_id).ok_or_else(|| {
            EngineError::Internal(format!(
                "operation {operation_id} not found in session {session_id}"
            ))
        })?;
        Ok(generate_diff(operation, options))
    }

    /// Renders every operation of a session, in order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotFound`] for an unknown session.
    pub fn generate_session_diff(
        &self,
        session_id: &SessionId,
        options: &DiffOptions,
    ) -> Result<String, EngineError> {
        let session = self.get_session(session_id)?;
        Ok(session
            .operations
            .iter()
            .map(|op| generate_diff(op, options))
            .collect::<String>())
    }
}
