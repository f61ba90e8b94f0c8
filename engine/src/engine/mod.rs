//! Session engine.
//!
//! This module provides the [`SessionEngine`], which owns sessions, admits
//! operations, and applies or reverts them against a
//! [`ContentStore`](crate::store::ContentStore).

mod apply;
mod conflicts;
pub mod core;
mod revert;
pub mod storage;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export primary types for convenience
pub use core::{SessionEngine, SessionEngineBuilder};
pub use storage::SessionStorage;
pub use types::{ApplyOptions, ApplyResult, EngineError, OperationError, RevertResult};
