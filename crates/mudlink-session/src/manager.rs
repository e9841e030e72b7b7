//! The session manager: an explicit registry of open sessions.
//!
//! A client that talks to several MUDs at once (or several characters on
//! one) keeps its sessions here instead of in globals. The manager owns
//! the sessions; callers borrow them by [`SessionId`].
//!
//! # Concurrency note
//!
//! `SessionManager` is not thread-safe by itself. It is owned by a single
//! task and shared through a mutex or a channel at a higher level if
//! needed.

use std::collections::BTreeMap;
use std::fmt;

use mudlink_transport::Connection;

use crate::{MudSession, SessionError};

/// Identifies a session within one [`SessionManager`].
///
/// Ids are handed out in increasing order and never reused by the same
/// manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Owns a set of sessions keyed by [`SessionId`].
///
/// ## Lifecycle
///
/// ```text
/// create() ──→ get() / get_mut() ──→ teardown()
///                      │
///                      └──(connection lost)──→ prune_disconnected()
/// ```
pub struct SessionManager<S> {
    /// `BTreeMap` so `ids()` comes out in creation order.
    sessions: BTreeMap<SessionId, S>,
    next_id: u64,
}

impl<S> SessionManager<S> {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self {
            sessions: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Registers a session and returns its id.
    pub fn create(&mut self, session: S) -> SessionId {
        let id = SessionId(self.next_id);
        self.next_id += 1;
        self.sessions.insert(id, session);
        tracing::info!(%id, "session registered");
        id
    }

    /// Looks up a session.
    pub fn get(&self, id: SessionId) -> Option<&S> {
        self.sessions.get(&id)
    }

    /// Looks up a session mutably.
    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut S> {
        self.sessions.get_mut(&id)
    }

    /// Removes a session and hands it back to the caller.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if `id` is not registered.
    pub fn teardown(&mut self, id: SessionId) -> Result<S, SessionError> {
        let session = self
            .sessions
            .remove(&id)
            .ok_or(SessionError::NotFound(id))?;
        tracing::info!(%id, "session removed");
        Ok(session)
    }

    /// Registered ids, oldest first.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }

    /// Returns the number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl<S> Default for SessionManager<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connection> SessionManager<MudSession<C>> {
    /// Removes every session whose connection has gone away and returns
    /// their ids.
    pub fn prune_disconnected(&mut self) -> Vec<SessionId> {
        let dead: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, s)| !s.is_connected())
            .map(|(id, _)| *id)
            .collect();
        for id in &dead {
            self.sessions.remove(id);
            tracing::info!(%id, "disconnected session pruned");
        }
        dead
    }
}

// =========================================================================
// Tests
// =========================================================================
