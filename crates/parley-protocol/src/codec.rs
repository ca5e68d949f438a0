//! Codec trait and implementations for turning server messages into bytes.
//!
//! The server never writes a [`ServerMessage`] to a socket directly; it hands
//! it to a [`Codec`]. [`LineCodec`] produces the text wire form every client
//! speaks. [`JsonCodec`] emits one JSON object per line, which is what the
//! client's machine-readable output mode uses.

use crate::{ProtocolError, ServerMessage};

/// Converts server messages to and from newline-terminated lines.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection's writer task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a message into one line, including the trailing `\n`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the format cannot represent the
    /// message.
    fn encode(&self, message: &ServerMessage) -> Result<Vec<u8>, ProtocolError>;

    /// Parses one line (with or without its `\n`) back into a message.
    ///
    /// # Errors
    /// Returns an error if the line is not a message in this format.
    fn decode(&self, line: &str) -> Result<ServerMessage, ProtocolError>;
}

// ---------------------------------------------------------------------------
// LineCodec
// ---------------------------------------------------------------------------

/// The plain-text wire format: `OK`, `JOINED bob`, `MESSAGE alice hi`, ...
///
/// ```rust
/// use parley_protocol::{Codec, LineCodec, ServerMessage};
///
/// let bytes = LineCodec.encode(&ServerMessage::Left { who: "bob".into() }).unwrap();
/// assert_eq!(bytes, b"LEFT bob\n");
///
/// let decoded = LineCodec.decode("LEFT bob\n").unwrap();
/// assert_eq!(decoded, ServerMessage::Left { who: "bob".into() });
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LineCodec;

impl Codec for LineCodec {
    fn encode(&self, message: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
        Ok(format!("{message}\n").into_bytes())
    }

    fn decode(&self, line: &str) -> Result<ServerMessage, ProtocolError> {
        line.parse()
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that writes each message as a single-line JSON object.
///
/// This is behind the `json` feature flag (enabled by default).
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode(&self, message: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
        // `to_vec` never emits raw newlines, so the object stays on one line.
        let mut bytes =
            serde_json::to_vec(message).map_err(ProtocolError::Encode)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    fn decode(&self, line: &str) -> Result<ServerMessage, ProtocolError> {
        serde_json::from_str(line.trim_end()).map_err(ProtocolError::Decode)
    }
}
