//! Error types for the room layer.

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoomError {
    /// The room does not exist (it was never created, or it emptied out).
    #[error("room {0} not found")]
    NotFound(String),

    /// The nickname is not a member of this room.
    #[error("{nickname} is not in room {room}")]
    NotMember { room: String, nickname: String },

    /// The nickname is already a member of this room.
    #[error("{nickname} is already in room {room}")]
    AlreadyMember { room: String, nickname: String },
}
