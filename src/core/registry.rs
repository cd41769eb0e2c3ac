//! Registry of live sessions.
//!
//! Tracks every in-flight [`Session`] so operational surfaces can report on
//! them. Uses DashMap for O(1) concurrent access; sessions never reach into
//! each other through it.

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use super::session::Session;

/// Thread-safe collection of live sessions, keyed by bridge session id.
pub struct SessionRegistry {
    sessions: DashMap<Uuid, Session>,
}

impl SessionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Track a session for its lifetime.
    pub fn insert(&self, session: Session) {
        debug!(session_id = %session.id(), "Registering session");
        self.sessions.insert(session.id(), session);
    }

    /// Look up a session by id.
    pub fn get(&self, id: &Uuid) -> Option<Session> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Stop tracking a session. Called exactly once during teardown.
    pub fn remove(&self, id: &Uuid) -> Option<Session> {
        debug!(session_id = %id, "Removing session");
        self.sessions.remove(id).map(|(_, session)| session)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether any session is live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
