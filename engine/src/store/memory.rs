//! In-memory content store.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};

use super::{ContentStore, StoreError};

/// A content store backed by an ordered map.
///
/// Paths registered with [`MemoryContentStore::fail_on`] make every mutating
/// call touching them fail, which lets tests exercise apply and revert
/// failure paths.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    files: RwLock<BTreeMap<String, String>>,
    failing: RwLock<BTreeSet<String>>,
    flushed: RwLock<Vec<String>>,
}

impl MemoryContentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `files`.
    #[must_use]
    pub fn with_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        let store = Self::new();
        store.files.write().extend(
            files
                .into_iter()
                .map(|(path, content)| (path.into(), content.into())),
        );
        store
    }

    /// Makes writes, deletes and renames touching `path` fail.
    pub fn fail_on(&self, path: impl Into<String>) {
        self.failing.write().insert(path.into());
    }

    /// Clears a failure registered with [`Self::fail_on`].
    pub fn clear_failure(&self, path: &str) {
        self.failing.write().remove(path);
    }

    /// Synchronous read for assertions.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<String> {
        self.files.read().get(path).cloned()
    }

    /// Synchronous write that bypasses failure injection.
    pub fn put(&self, path: impl Into<String>, content: impl Into<String>) {
        self.files.write().insert(path.into(), content.into());
    }

    /// A copy of every file in the store.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.files.read().clone()
    }

    /// Paths flushed so far, in call order.
    #[must_use]
    pub fn flushed(&self) -> Vec<String> {
        self.flushed.read().clone()
    }

    fn check(&self, path: &str) -> Result<(), StoreError> {
        if self.failing.read().contains(path) {
            return Err(StoreError::Injected(path.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn read(&self, path: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get(path))
    }

    async fn write(&self, path: &str, content: &str) -> Result<(), StoreError> {
        self.check(path)?;
        self.put(path, content);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.check(path)?;
        self.files
            .write()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), StoreError> {
        self.check(old_path)?;
        self.check(new_path)?;
        let mut files = self.files.write();
        if files.contains_key(new_path) {
            return Err(StoreError::AlreadyExists(new_path.to_string()));
        }
        let content = files
            .remove(old_path)
            .ok_or_else(|| StoreError::NotFound(old_path.to_string()))?;
        files.insert(new_path.to_string(), content);
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.files.read().contains_key(path))
    }

    async fn flush(&self, path: &str) -> Result<(), StoreError> {
        self.flushed.write().push(path.to_string());
        Ok(())
    }
}
