use serde::Serialize;
use tracing::{info, info_span};

/// Domain event for audit logging.
/// Structured for JSON serialization to enable machine-readable audit trails.
#[derive(Debug, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A session was applied to the content store.
    SessionApplied {
        /// Session ID.
        session_id: String,
        /// Who initiated the session.
        source: String,
        /// Operations applied.
        applied: usize,
        /// Operations that failed.
        failed: usize,
        /// Rejected operations skipped.
        skipped: usize,
    },
    /// Applied operations were undone.
    SessionReverted {
        /// Session ID.
        session_id: String,
        /// Operations reverted.
        reverted: usize,
        /// Operations whose revert failed.
        failed: usize,
    },
    /// A session was cancelled before apply.
    SessionCancelled {
        /// Session ID.
        session_id: String,
    },
    /// Store content diverged from a recorded original.
    ConflictDetected {
        /// Session ID.
        session_id: String,
        /// Conflicting path.
        path: String,
    },
}

/// Logs an audit event to the dedicated audit channel as structured JSON.
/// This uses a specific `target` which can be filtered by the subscriber to redirect to a secure file.
pub fn log_audit(event: &AuditEvent) {
    let span = info_span!(target: "audit", "audit_event");
    let _enter = span.enter();

    let json = serde_json::to_string(event).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"));
    info!(target: "audit", audit_json = %json, "Audit event");
}
