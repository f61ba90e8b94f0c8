//! Session storage for the engine.
//!
//! This module provides the in-memory arena of sessions that the engine owns.
//! Storage is injected at construction so every engine, and every test, has
//! its own isolated set of sessions.

use parking_lot::{MappedRwLockWriteGuard, RwLock, RwLockWriteGuard};
use std::collections::HashMap;

use crate::model::{Session, SessionId};

/// Arena of sessions indexed by ID.
#[derive(Debug, Default)]
pub struct SessionStorage {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl SessionStorage {
    /// Create new storage instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session into storage, replacing one with the same ID.
    pub fn insert(&self, session: Session) {
        self.sessions.write().insert(session.id.clone(), session);
    }

    /// Get a snapshot of a session by ID.
    #[must_use]
    pub fn get(&self, id: &SessionId) -> Option<Session> {
        self.sessions.read().get(id).cloned()
    }

    /// Get a write guard on a session. Never hold it across an `.await`.
    #[must_use]
    pub fn get_mut(&self, id: &SessionId) -> Option<MappedRwLockWriteGuard<'_, Session>> {
        let sessions = self.sessions.write();
        RwLockWriteGuard::try_map(sessions, |sessions| sessions.get_mut(id)).ok()
    }

    /// Runs `f` against a session under the write lock and returns its
    /// result, or `None` if the session does not exist.
    pub fn update<R>(&self, id: &SessionId, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        self.get_mut(id).map(|mut session| f(&mut session))
    }

    /// Check if a session exists.
    #[must_use]
    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.read().contains_key(id)
    }

    /// Remove a session from storage.
    pub fn remove(&self, id: &SessionId) -> Option<Session> {
        self.sessions.write().remove(id)
    }

    /// Snapshots of every session.
    #[must_use]
    pub fn all(&self) -> Vec<Session> {
        self.sessions.read().values().cloned().collect()
    }

    /// Number of stored sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether no sessions are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
