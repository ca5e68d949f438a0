//! The chat client: sends what the user types, shows what the server says.
//!
//! The client doesn't interpret user input. Every line goes to the server
//! as typed and the server decides what it means. Server messages come
//! back as [`ServerMessage`]s and go to a [`DisplaySink`].

use std::io::Write;

use parley_protocol::{
    Codec, Command, JsonCodec, LineBuffer, LineCodec, MAX_LINE_LEN, ServerMessage,
};
use parley_transport::{Connection, TcpConnection, TransportError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::ParleyError;

// ---------------------------------------------------------------------------
// Display sinks
// ---------------------------------------------------------------------------

/// Where the client shows server messages.
pub trait DisplaySink {
    /// Shows one message.
    fn show(&mut self, message: &ServerMessage) -> Result<(), ParleyError>;
}

/// Writes each message as a prose sentence, one per line.
///
/// `JOINED bob` becomes `bob has joined the room.`
#[derive(Debug)]
pub struct TextSink<W> {
    out: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DisplaySink for TextSink<W> {
    fn show(&mut self, message: &ServerMessage) -> Result<(), ParleyError> {
        writeln!(self.out, "{}", message.display())?;
        self.out.flush()?;
        Ok(())
    }
}

/// Writes each message as a single-line JSON object, for scripts.
#[derive(Debug)]
pub struct JsonSink<W> {
    out: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DisplaySink for JsonSink<W> {
    fn show(&mut self, message: &ServerMessage) -> Result<(), ParleyError> {
        let bytes = JsonCodec.encode(message)?;
        self.out.write_all(&bytes)?;
        self.out.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ChatClient
// ---------------------------------------------------------------------------

/// Longest server line the client accepts. A server line carries at most
/// two fields that came from client input, each within [`MAX_LINE_LEN`].
const MAX_SERVER_LINE_LEN: usize = 2 * MAX_LINE_LEN + 64;

/// A connection to a Parley server.
pub struct ChatClient<C: Connection> {
    conn: C,
    inbound: LineBuffer,
}

impl ChatClient<TcpConnection> {
    /// Connects to a server over TCP.
    pub async fn connect(addr: &str) -> Result<Self, ParleyError> {
        let conn = TcpConnection::connect(addr).await?;
        tracing::info!(%addr, "connected");
        Ok(Self::new(conn))
    }
}

impl<C> ChatClient<C>
where
    C: Connection<Error = TransportError>,
{
    /// Wraps an established connection.
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            inbound: LineBuffer::with_max_line_len(MAX_SERVER_LINE_LEN),
        }
    }

    /// Sends one line of user input, exactly as typed.
    pub async fn send_line(&self, line: &str) -> Result<(), ParleyError> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        self.conn.send(&bytes).await?;
        Ok(())
    }

    /// Sends a typed command.
    pub async fn send(&self, command: &Command) -> Result<(), ParleyError> {
        self.send_line(&command.to_line()).await
    }

    /// Waits for the next message from the server.
    ///
    /// Returns `Ok(None)` once the server has closed the connection.
    ///
    /// # Errors
    /// A line that isn't a valid server message, or is too long, is
    /// consumed and reported as [`ParleyError::Protocol`]; the next call
    /// carries on after it.
    pub async fn next_message(&mut self) -> Result<Option<ServerMessage>, ParleyError> {
        loop {
            if let Some(line) = self.inbound.next_line() {
                return Ok(Some(LineCodec.decode(&line?)?));
            }
            match self.conn.recv().await? {
                Some(data) => self.inbound.push(&data),
                None => return Ok(None),
            }
        }
    }

    /// Pumps `input` lines to the server and server messages to `sink`.
    ///
    /// Stops after showing `BYE` or when the server closes the connection.
    /// When `input` runs out the client says `/bye` itself and keeps
    /// showing messages until the server answers.
    pub async fn run<R, S>(mut self, input: R, sink: &mut S) -> Result<(), ParleyError>
    where
        R: AsyncBufRead + Unpin,
        S: DisplaySink,
    {
        let mut lines = input.lines();
        let mut input_open = true;

        loop {
            tokio::select! {
                message = self.next_message() => match message {
                    Ok(Some(message)) => {
                        sink.show(&message)?;
                        if message == ServerMessage::Bye {
                            break;
                        }
                    }
                    Ok(None) => {
                        tracing::info!("server closed the connection");
                        break;
                    }
                    Err(ParleyError::Protocol(e)) => {
                        tracing::warn!(error = %e, "skipping unreadable server line");
                    }
                    Err(e) => return Err(e),
                },
                line = lines.next_line(), if input_open => match line? {
                    Some(line) => self.send_line(&line).await?,
                    None => {
                        tracing::debug!("end of input, saying goodbye");
                        input_open = false;
                        if let Err(e) = self.send(&Command::Bye).await {
                            tracing::debug!(error = %e, "goodbye not sent");
                            break;
                        }
                    }
                },
            }
        }

        if let Err(e) = self.conn.close().await {
            tracing::debug!(error = %e, "close error");
        }
        Ok(())
    }
}
