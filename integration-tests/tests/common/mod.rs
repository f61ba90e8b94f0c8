//! Shared test utilities for integration tests.
//!
//! Provides a disk-backed content store rooted in a temporary directory and a
//! context bundling it with a session engine.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use changeset_engine::engine::SessionEngine;
use changeset_engine::infrastructure::config::EngineSettings;
use changeset_engine::store::{ContentStore, StoreError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Content store writing through to a directory on disk.
pub struct DiskContentStore {
    root: PathBuf,
}

impl DiskContentStore {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

fn io_error(path: &str, source: std::io::Error) -> StoreError {
    match source.kind() {
        ErrorKind::NotFound => StoreError::NotFound(path.to_string()),
        _ => StoreError::Io {
            path: path.to_string(),
            source,
        },
    }
}

async fn ensure_parent(target: &Path, path: &str) -> Result<(), StoreError> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error(path, e))?;
    }
    Ok(())
}

#[async_trait]
impl ContentStore for DiskContentStore {
    async fn read(&self, path: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.resolve(path)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(path, e)),
        }
    }

    async fn write(&self, path: &str, content: &str) -> Result<(), StoreError> {
        let target = self.resolve(path);
        ensure_parent(&target, path).await?;
        tokio::fs::write(&target, content)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        tokio::fs::remove_file(self.resolve(path))
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), StoreError> {
        let target = self.resolve(new_path);
        if tokio::fs::try_exists(&target)
            .await
            .map_err(|e| io_error(new_path, e))?
        {
            return Err(StoreError::AlreadyExists(new_path.to_string()));
        }
        ensure_parent(&target, new_path).await?;
        tokio::fs::rename(self.resolve(old_path), &target)
            .await
            .map_err(|e| io_error(old_path, e))
    }

    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        tokio::fs::try_exists(self.resolve(path))
            .await
            .map_err(|e| io_error(path, e))
    }
}

/// Integration test context providing shared resources.
pub struct IntegrationTestContext {
    /// Temporary directory backing the store
    pub temp_dir: TempDir,
    /// Disk store rooted at the temporary directory
    pub store: Arc<DiskContentStore>,
    /// Engine under test
    pub engine: SessionEngine,
}

impl IntegrationTestContext {
    /// Creates a new test context with default engine settings.
    pub fn new() -> Result<Self> {
        Self::with_settings(EngineSettings::default())
    }

    /// Creates a test context with custom engine settings.
    pub fn with_settings(settings: EngineSettings) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let store = Arc::new(DiskContentStore::new(temp_dir.path()));
        let engine = SessionEngine::builder(store.clone()).settings(settings).build();

        Ok(Self {
            temp_dir,
            store,
            engine,
        })
    }

    /// Gets the absolute path of a file in the store.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.temp_dir.path().join(relative)
    }

    /// Writes a file directly, bypassing the engine.
    pub fn write_file(&self, relative: &str, content: &str) -> Result<()> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reads a file directly, returning `None` if it does not exist.
    pub fn read_file(&self, relative: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path(relative)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
