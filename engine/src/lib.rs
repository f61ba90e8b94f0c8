//! Changeset Engine - multi-file edit sessions with hunk-level review.
//!
//! This crate groups proposed file changes into sessions, lets a reviewer
//! accept or reject individual hunks, detects when files changed underneath a
//! session, applies the accepted result through a pluggable content store,
//! and reverts applied sessions from pre-apply backups.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use changeset_engine::engine::{ApplyOptions, SessionEngine};
//! use changeset_engine::model::Change;
//! use changeset_engine::store::MemoryContentStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryContentStore::new());
//! let engine = SessionEngine::new(store.clone());
//!
//! let session = engine.create_session("Add greeting", "agent", None);
//! engine.add_operation(&session.id, Change::create("a.txt", "hello"), None)?;
//! let result = engine.apply(&session.id, ApplyOptions::default()).await?;
//!
//! assert_eq!(result.success_count, 1);
//! assert_eq!(store.get("a.txt").as_deref(), Some("hello"));
//! # Ok(())
//! # }
//! ```

/// Pre-apply snapshots used by revert.
pub mod backup;
/// Conflict detection against the content store.
pub mod conflict;
/// Unified-diff rendering of operations.
pub mod diff;
/// Session engine: admission, apply, revert and cancel.
pub mod engine;
/// Session-change notifications.
pub mod events;
/// Infrastructure components (audit, config, telemetry).
pub mod infrastructure;
/// Hunk merging and derivation.
pub mod merge;
/// Session, operation, change and hunk data model.
pub mod model;
/// Content store port and in-memory implementation.
pub mod store;
