//! Unified error type for Parley.

use parley_protocol::ProtocolError;
use parley_room::RoomError;
use parley_session::SessionError;
use parley_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates `From` impls, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ParleyError {
    /// A transport-level error (bind, connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, malformed line).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (unknown connection, nickname taken).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (unknown room, not a member).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Local I/O, such as reading the client's input.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
