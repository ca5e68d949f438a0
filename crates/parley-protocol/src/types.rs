//! Core protocol types for Parley's wire format.
//!
//! Two directions, two sum types:
//!
//! - [`Command`]: what a client asks for. Clients type plain lines; a line
//!   starting with `/` is a command, anything else is chat text.
//! - [`ServerMessage`]: what the server tells a client. Each one is a
//!   single line starting with an upper-case keyword (`OK`, `JOINED bob`).
//!
//! Every variant carries exactly the fields it needs, so there are no
//! "unused slot" strings floating around.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Returns `true` if `s` is a valid nickname or room name.
///
/// The grammar calls this a *token*: one or more characters, none of which
/// is a space or a dot. Names are case-sensitive.
pub fn is_valid_name(s: &str) -> bool {
    !s.is_empty() && !s.contains([' ', '.'])
}

// ---------------------------------------------------------------------------
// Command: client → server
// ---------------------------------------------------------------------------

/// A decoded client instruction.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON, e.g.
/// `{ "type": "Join", "room": "lobby" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    /// `/nick <name>`: claim or change a nickname.
    SetNickname { name: String },

    /// `/join <room>`: enter a room, leaving the current one first.
    Join { room: String },

    /// `/leave`: leave the current room.
    Leave,

    /// `/bye`: disconnect.
    Bye,

    /// `/priv <target> <text>`: direct message to one nickname.
    PrivateMessage { target: String, text: String },

    /// A plain line of chat for the current room.
    PublicText { text: String },

    /// A `/` line that matched none of the commands.
    ///
    /// `body` is the trimmed text after the slash, kept for logging.
    Unrecognized { body: String },
}

impl Command {
    /// Decodes one line of client input.
    ///
    /// A trailing newline is ignored. Returns `None` for a line that is
    /// blank after trimming, which carries no instruction at all.
    ///
    /// ```rust
    /// use parley_protocol::Command;
    ///
    /// assert_eq!(
    ///     Command::parse("/join lobby"),
    ///     Some(Command::Join { room: "lobby".into() })
    /// );
    /// // A doubled slash escapes the command prefix.
    /// assert_eq!(
    ///     Command::parse("//shrug"),
    ///     Some(Command::PublicText { text: "/shrug".into() })
    /// );
    /// assert_eq!(Command::parse("   "), None);
    /// ```
    pub fn parse(line: &str) -> Option<Command> {
        let line = line.strip_suffix('\n').unwrap_or(line);

        if let Some(body) = line.strip_prefix('/') {
            return Some(parse_command_body(body.trim()));
        }

        let text = line.trim();
        if text.is_empty() {
            None
        } else {
            Some(Command::PublicText {
                text: text.to_string(),
            })
        }
    }

    /// Encodes the command as the line a client would type, without the
    /// trailing newline.
    ///
    /// Public text that itself starts with `/` gets the escaping slash
    /// back, so [`Command::parse`] reads it as text again.
    pub fn to_line(&self) -> String {
        match self {
            Command::SetNickname { name } => format!("/nick {name}"),
            Command::Join { room } => format!("/join {room}"),
            Command::Leave => "/leave".to_string(),
            Command::Bye => "/bye".to_string(),
            Command::PrivateMessage { target, text } => {
                format!("/priv {target} {text}")
            }
            Command::PublicText { text } if text.starts_with('/') => {
                format!("/{text}")
            }
            Command::PublicText { text } => text.clone(),
            Command::Unrecognized { body } => format!("/{body}"),
        }
    }
}

/// Matches the text after the leading `/`, in grammar order.
fn parse_command_body(body: &str) -> Command {
    if let Some(name) = body.strip_prefix("nick ") {
        if is_valid_name(name) {
            return Command::SetNickname {
                name: name.to_string(),
            };
        }
    }

    if let Some(room) = body.strip_prefix("join ") {
        if is_valid_name(room) {
            return Command::Join {
                room: room.to_string(),
            };
        }
    }

    match body {
        "leave" => return Command::Leave,
        "bye" => return Command::Bye,
        _ => {}
    }

    if let Some((target, text)) =
        body.strip_prefix("priv ").and_then(|rest| rest.split_once(' '))
    {
        if is_valid_name(target) {
            return Command::PrivateMessage {
                target: target.to_string(),
                text: text.to_string(),
            };
        }
    }

    // "//text": the first slash was the command prefix, the second one
    // belongs to the message.
    if body.starts_with('/') {
        return Command::PublicText {
            text: body.to_string(),
        };
    }

    Command::Unrecognized {
        body: body.to_string(),
    }
}

// ---------------------------------------------------------------------------
// ServerMessage: server → client
// ---------------------------------------------------------------------------

/// A message the server sends to a client.
///
/// The `Display` impl writes the wire form (without the newline):
///
/// | variant | wire |
/// |---|---|
/// | `Ok` | `OK` |
/// | `Error` | `ERROR <text>` |
/// | `Message` | `MESSAGE <from> <text>` |
/// | `NewNick` | `NEWNICK <old> <new>` |
/// | `Joined` | `JOINED <who>` |
/// | `Left` | `LEFT <who>` |
/// | `Bye` | `BYE` |
/// | `Private` | `PRIVATE <from> <text>` |
///
/// [`ServerMessage::display`] gives the prose a person reads instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// The last command succeeded.
    Ok,

    /// The last command was refused; `text` says why.
    Error { text: String },

    /// Public chat text from `from`, relayed to the whole room.
    Message { from: String, text: String },

    /// A room member changed nickname.
    NewNick { old: String, new: String },

    /// Someone entered the room.
    Joined { who: String },

    /// Someone left the room (or disconnected).
    Left { who: String },

    /// The server is closing this connection at the client's request.
    Bye,

    /// A direct message from `from`.
    Private { from: String, text: String },
}

impl ServerMessage {
    /// Shorthand for an `Error` with the given text.
    pub fn error(text: impl Into<String>) -> Self {
        ServerMessage::Error { text: text.into() }
    }

    /// Returns a value whose `Display` impl renders this message as a
    /// human-readable sentence, for chat windows.
    ///
    /// ```rust
    /// use parley_protocol::ServerMessage;
    ///
    /// let msg = ServerMessage::Joined { who: "bob".into() };
    /// assert_eq!(msg.to_string(), "JOINED bob");
    /// assert_eq!(msg.display().to_string(), "bob has joined the room.");
    /// ```
    pub fn display(&self) -> DisplayText<'_> {
        DisplayText(self)
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Ok => f.write_str("OK"),
            ServerMessage::Error { text } if text.is_empty() => {
                f.write_str("ERROR")
            }
            ServerMessage::Error { text } => write!(f, "ERROR {text}"),
            ServerMessage::Message { from, text } => {
                write!(f, "MESSAGE {from} {text}")
            }
            ServerMessage::NewNick { old, new } => {
                write!(f, "NEWNICK {old} {new}")
            }
            ServerMessage::Joined { who } => write!(f, "JOINED {who}"),
            ServerMessage::Left { who } => write!(f, "LEFT {who}"),
            ServerMessage::Bye => f.write_str("BYE"),
            ServerMessage::Private { from, text } => {
                write!(f, "PRIVATE {from} {text}")
            }
        }
    }
}

impl FromStr for ServerMessage {
    type Err = ProtocolError;

    /// Parses one wire line. A trailing `\n` (or `\r\n`) is ignored.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line
            .strip_suffix('\n')
            .unwrap_or(line)
            .trim_end_matches('\r');
        let invalid = || ProtocolError::InvalidMessage(line.to_string());

        match line {
            "OK" => return Ok(ServerMessage::Ok),
            "ERROR" => return Ok(ServerMessage::error("")),
            "BYE" => return Ok(ServerMessage::Bye),
            _ => {}
        }

        let (keyword, rest) = line.split_once(' ').ok_or_else(invalid)?;
        let name = |s: &str| {
            if is_valid_name(s) {
                Ok(s.to_string())
            } else {
                Err(invalid())
            }
        };
        // "<name> <text>", where text may be empty or contain spaces.
        let name_and_text = |s: &str| {
            let (from, text) = s.split_once(' ').ok_or_else(invalid)?;
            Ok::<_, ProtocolError>((name(from)?, text.to_string()))
        };

        match keyword {
            "ERROR" => Ok(ServerMessage::error(rest)),
            "MESSAGE" => {
                let (from, text) = name_and_text(rest)?;
                Ok(ServerMessage::Message { from, text })
            }
            "PRIVATE" => {
                let (from, text) = name_and_text(rest)?;
                Ok(ServerMessage::Private { from, text })
            }
            "NEWNICK" => {
                let (old, new) = rest.split_once(' ').ok_or_else(invalid)?;
                Ok(ServerMessage::NewNick {
                    old: name(old)?,
                    new: name(new)?,
                })
            }
            "JOINED" => Ok(ServerMessage::Joined { who: name(rest)? }),
            "LEFT" => Ok(ServerMessage::Left { who: name(rest)? }),
            _ => Err(invalid()),
        }
    }
}

/// Human-readable rendering of a [`ServerMessage`].
///
/// Created by [`ServerMessage::display`].
#[derive(Debug, Clone, Copy)]
pub struct DisplayText<'a>(&'a ServerMessage);

impl fmt::Display for DisplayText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            ServerMessage::Ok => f.write_str("Command successful."),
            ServerMessage::Error { text } => write!(f, "Error. {text}"),
            ServerMessage::Message { from, text } => {
                write!(f, "{from}: {text}")
            }
            ServerMessage::NewNick { old, new } => {
                write!(f, "{old} is now known as {new}")
            }
            ServerMessage::Joined { who } => {
                write!(f, "{who} has joined the room.")
            }
            ServerMessage::Left { who } => write!(f, "{who} left the room."),
            ServerMessage::Bye => f.write_str("Disconnected..."),
            ServerMessage::Private { from, text } => {
                write!(f, "<{from}>: {text}")
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
