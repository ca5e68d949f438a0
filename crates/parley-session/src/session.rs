//! Session types: the server's record of one connected chat client.
//!
//! A session tracks:
//! - WHO the client is (its nickname, once it picks one)
//! - WHERE it is in the lifecycle (`Init`, `Outside`, `Inside` a room)
//! - WHAT it has sent that doesn't form a full line yet
//! - HOW to reach it (the outbound half of its connection)
//!
//! Sessions hold no policy. Deciding whether a transition is allowed is the
//! dispatcher's job; a session only stores the result.

use parley_protocol::{LineBuffer, ProtocolError, ServerMessage};
use parley_transport::ConnectionId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::SessionError;

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// An instruction for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Encode and send this message.
    Message(ServerMessage),
    /// Flush what was queued before, then close the connection.
    Close,
}

/// Channel sender for delivering outbound instructions to a connection.
///
/// Bounded, and only ever written with `try_send`: the reactor never waits
/// on a slow peer, and a peer that stops reading can't pile up messages.
pub type PeerSender = mpsc::Sender<Outbound>;

/// Default number of messages that may wait for one connection's writer.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 1024;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where a session is in the chat lifecycle.
///
/// ```text
///   Init ──(nick)──→ Outside ──(join)──→ Inside { room }
///                       ↑                    │
///                       └──────(leave)───────┘
/// ```
///
/// The room lives inside the `Inside` variant, so a session can't have a
/// room without being inside one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Freshly connected, no nickname yet.
    #[default]
    Init,

    /// Has a nickname, not in a room.
    Outside,

    /// Has a nickname and is a member of `room`.
    Inside { room: String },
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One connected client.
#[derive(Debug)]
pub struct Session {
    id: ConnectionId,
    nickname: Option<String>,
    state: SessionState,
    inbound: LineBuffer,
    outbound: PeerSender,
}

impl Session {
    /// Creates a session in [`SessionState::Init`] for a new connection.
    pub fn new(id: ConnectionId, outbound: PeerSender) -> Self {
        Self {
            id,
            nickname: None,
            state: SessionState::Init,
            inbound: LineBuffer::new(),
            outbound,
        }
    }

    /// The connection this session belongs to.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The current nickname, if one has been set.
    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    /// Sets the nickname.
    ///
    /// This does not touch the nickname registry; go through
    /// [`SessionManager::rename`](crate::SessionManager::rename) to keep
    /// the two in sync.
    pub fn set_nickname(&mut self, nickname: Option<String>) {
        self.nickname = nickname;
    }

    /// The current lifecycle state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Replaces the lifecycle state.
    pub fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    /// The room the session is in, if it is `Inside` one.
    pub fn room(&self) -> Option<&str> {
        match &self.state {
            SessionState::Inside { room } => Some(room),
            _ => None,
        }
    }

    /// Moves the session into `room`, or out of any room with `None`.
    pub fn set_room(&mut self, room: Option<String>) {
        self.state = match room {
            Some(room) => SessionState::Inside { room },
            None => SessionState::Outside,
        };
    }

    /// Appends bytes read from the connection.
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.inbound.push(data);
    }

    /// Takes the next complete input line, if one has arrived.
    ///
    /// An over-long line comes back as [`ProtocolError::LineTooLong`]
    /// and its bytes are dropped.
    pub fn take_line(&mut self) -> Option<Result<String, ProtocolError>> {
        self.inbound.next_line()
    }

    /// Queues a message for this client.
    ///
    /// # Errors
    /// - [`SessionError::Closed`]: the connection's writer has gone away
    /// - [`SessionError::Backlogged`]: its queue is full because the peer
    ///   stopped reading
    pub fn send(&self, message: ServerMessage) -> Result<(), SessionError> {
        self.outbound
            .try_send(Outbound::Message(message))
            .map_err(|e| match e {
                TrySendError::Full(_) => SessionError::Backlogged(self.id),
                TrySendError::Closed(_) => SessionError::Closed(self.id),
            })
    }

    /// Asks the writer to close the connection, consuming the session.
    ///
    /// Anything queued earlier is still delivered first. With a full queue
    /// the close instruction is dropped, but dropping the sender here ends
    /// the channel and the writer closes once it has drained.
    pub fn close(self) {
        let _ = self.outbound.try_send(Outbound::Close);
    }
}
