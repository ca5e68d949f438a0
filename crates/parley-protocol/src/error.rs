//! Error types for the protocol layer.
//!
//! Each Parley crate defines its own error enum. A `ProtocolError` always
//! means a line could not be turned into a message (or back), never a
//! network or room problem.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing a message to JSON failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// A JSON line could not be parsed back into a message.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The line does not match any message in the wire grammar.
    ///
    /// Carries the offending line so it can be logged as-is.
    #[error("invalid message: {0:?}")]
    InvalidMessage(String),

    /// An input line grew past the length limit and was thrown away.
    #[error("line too long: {len} bytes (limit {limit})")]
    LineTooLong { len: usize, limit: usize },
}
