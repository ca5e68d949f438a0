//! Wire protocol for Parley.
//!
//! This crate defines the "language" that chat clients and the server
//! speak:
//!
//! - **Types** ([`Command`], [`ServerMessage`]): what travels on the wire,
//!   one line per instruction or message.
//! - **Codec** ([`Codec`] trait, [`LineCodec`], [`JsonCodec`]): how server
//!   messages become bytes.
//! - **Framing** ([`LineBuffer`]): cutting a byte stream into lines.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and session
//! (who is talking). It doesn't know about connections or rooms.
//!
//! ```text
//! Transport (bytes) → LineBuffer (lines) → Command → Dispatcher
//! Dispatcher → ServerMessage → Codec (bytes) → Transport
//! ```

mod codec;
mod error;
mod framing;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use codec::LineCodec;
pub use error::ProtocolError;
pub use framing::{LineBuffer, MAX_LINE_LEN};
pub use types::{Command, DisplayText, ServerMessage, is_valid_name};
