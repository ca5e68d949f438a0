//! Error types for the session layer.

use parley_transport::ConnectionId;

/// Errors that can occur during session management.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Another active session already holds this nickname.
    #[error("nickname {0} is already in use")]
    NicknameTaken(String),

    /// No session exists for the given connection.
    /// Happens when a connection is looked up after its teardown.
    #[error("session not found for {0}")]
    NotFound(ConnectionId),

    /// A session for this connection is already registered.
    #[error("{0} already has a session")]
    AlreadyRegistered(ConnectionId),

    /// The connection's writer is gone, so nothing more can be delivered.
    #[error("{0} is no longer accepting messages")]
    Closed(ConnectionId),

    /// The connection's outbound queue is full; the peer isn't reading.
    #[error("{0} has too many undelivered messages")]
    Backlogged(ConnectionId),
}
