//! Content store port.
//!
//! The engine never touches storage directly. Everything it reads or writes
//! goes through a [`ContentStore`], which the host supplies. A
//! [`MemoryContentStore`] is provided for tests and embedders that keep
//! buffers in memory.

pub mod memory;

pub use memory::MemoryContentStore;

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a content store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The path does not exist.
    #[error("File not found: {0}")]
    NotFound(String),
    /// The destination path already exists.
    #[error("File already exists: {0}")]
    AlreadyExists(String),
    /// An I/O error from the backing storage.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// Path being accessed.
        path: String,
        /// Source error.
        #[source]
        source: std::io::Error,
    },
    /// A failure injected by a test double.
    #[error("Injected failure on '{0}'")]
    Injected(String),
    /// Any other backend failure.
    #[error("Store error: {0}")]
    Other(String),
}

/// Storage operations consumed by the engine.
///
/// Paths are opaque strings; resolving them to storage locations is the
/// implementation's concern.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Reads the content of `path`, or `None` if it does not exist.
    async fn read(&self, path: &str) -> Result<Option<String>, StoreError>;

    /// Writes `content` to `path`, creating parent containers as needed.
    async fn write(&self, path: &str, content: &str) -> Result<(), StoreError>;

    /// Deletes `path`.
    async fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// Moves `old_path` to `new_path`.
    async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), StoreError>;

    /// Whether `path` exists.
    async fn exists(&self, path: &str) -> Result<bool, StoreError>;

    /// Persists any buffered state for `path`. Defaults to a no-op.
    async fn flush(&self, _path: &str) -> Result<(), StoreError> {
        Ok(())
    }
}
