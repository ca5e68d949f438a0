//! The session manager: the connection table plus the nickname registry.
//!
//! # Concurrency note
//!
//! `SessionManager` is NOT thread-safe by itself: it uses plain
//! `HashMap`s. It is owned by the single reactor task, and nothing else
//! ever touches it, so no locking is needed.

use std::collections::HashMap;

use parley_transport::ConnectionId;

use crate::{PeerSender, Session, SessionError};

/// Tracks every connected session and which nickname belongs to whom.
///
/// Two maps, kept in sync:
///
/// ```text
/// sessions:  ConnectionId → Session        (every live connection)
/// nicknames: "alice"      → ConnectionId   (every named connection)
/// ```
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<ConnectionId, Session>,
    nicknames: HashMap<String, ConnectionId>,
}

impl SessionManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection with a fresh `Init` session.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyRegistered`] if the connection
    /// already has a session.
    pub fn create(
        &mut self,
        id: ConnectionId,
        outbound: PeerSender,
    ) -> Result<&mut Session, SessionError> {
        if self.sessions.contains_key(&id) {
            return Err(SessionError::AlreadyRegistered(id));
        }
        tracing::debug!(conn_id = %id, "session created");
        Ok(self
            .sessions
            .entry(id)
            .or_insert_with(|| Session::new(id, outbound)))
    }

    /// Looks up a session by connection.
    pub fn get(&self, id: ConnectionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Looks up a session by connection, mutably.
    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    /// Returns the connection currently holding `nickname`.
    pub fn find_by_nickname(&self, nickname: &str) -> Option<ConnectionId> {
        self.nicknames.get(nickname).copied()
    }

    /// Gives session `id` the nickname `nickname`.
    ///
    /// Succeeds when nobody holds the name, or when `id` already holds it.
    /// The old name (if any) is released. Returns the previous nickname.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`]: no such session
    /// - [`SessionError::NicknameTaken`]: another session holds the name
    pub fn rename(
        &mut self,
        id: ConnectionId,
        nickname: &str,
    ) -> Result<Option<String>, SessionError> {
        if let Some(holder) = self.nicknames.get(nickname) {
            if *holder != id {
                return Err(SessionError::NicknameTaken(nickname.to_string()));
            }
        }

        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(SessionError::NotFound(id))?;

        let old = session.nickname().map(str::to_owned);
        if let Some(old) = &old {
            self.nicknames.remove(old);
        }
        self.nicknames.insert(nickname.to_string(), id);
        session.set_nickname(Some(nickname.to_string()));
        Ok(old)
    }

    /// Removes a session and releases its nickname.
    ///
    /// Returns `None` if the session was already removed, which makes
    /// teardown safe to attempt more than once.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Session> {
        let session = self.sessions.remove(&id)?;
        if let Some(nickname) = session.nickname() {
            // Only release the name if it still points at this session.
            if self.nicknames.get(nickname) == Some(&id) {
                self.nicknames.remove(nickname);
            }
        }
        tracing::debug!(conn_id = %id, "session removed");
        Some(session)
    }

    /// Returns the number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Returns the number of sessions that have a nickname.
    pub fn named_count(&self) -> usize {
        self.nicknames.len()
    }
}

// =========================================================================
// Tests
// =========================================================================
