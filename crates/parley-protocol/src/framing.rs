//! Newline framing for byte streams.
//!
//! A socket read can return half a line, or several lines at once. The
//! [`LineBuffer`] sits between the two: bytes go in as they arrive, complete
//! lines come out in order, and an unfinished tail waits for the rest.

use bytes::BytesMut;

use crate::ProtocolError;

/// Longest input line accepted, not counting the `\n`.
pub const MAX_LINE_LEN: usize = 16 * 1024;

/// Position of the next `\n` in `buffer`.
fn find_newline(buffer: &[u8]) -> Option<usize> {
    buffer.iter().position(|&b| b == b'\n')
}

/// Accumulates raw bytes and hands back complete `\n`-terminated lines.
///
/// Each line is split off the front of a [`BytesMut`], so consumed input
/// is released without shifting what is left. A line longer than the
/// limit is reported once as [`ProtocolError::LineTooLong`] and dropped,
/// including any of its bytes that arrive later; the line after it is
/// read normally.
///
/// ```rust
/// use parley_protocol::LineBuffer;
///
/// let mut buf = LineBuffer::new();
/// buf.push(b"/join ro");
/// assert!(buf.next_line().is_none());
/// buf.push(b"omA\nhel");
/// assert_eq!(buf.next_line().unwrap().unwrap(), "/join roomA");
/// assert!(buf.next_line().is_none());
/// assert_eq!(buf.pending(), b"hel");
/// ```
#[derive(Debug)]
pub struct LineBuffer {
    buffer: BytesMut,
    /// `buffer[..scanned]` is known to hold no `\n`.
    scanned: usize,
    max_line_len: usize,
    /// Dropping input until the end of an over-long line.
    skipping_overflow: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_max_line_len(MAX_LINE_LEN)
    }
}

impl LineBuffer {
    /// Creates an empty buffer with the default [`MAX_LINE_LEN`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer that rejects lines over `max_len` bytes.
    pub fn with_max_line_len(max_len: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            scanned: 0,
            max_line_len: max_len,
            skipping_overflow: false,
        }
    }

    /// The longest line this buffer accepts.
    pub fn max_line_len(&self) -> usize {
        self.max_line_len
    }

    /// Appends bytes received from the peer.
    pub fn push(&mut self, mut data: &[u8]) {
        if self.skipping_overflow {
            match find_newline(data) {
                Some(pos) => {
                    self.skipping_overflow = false;
                    data = &data[pos + 1..];
                }
                None => return,
            }
        }
        self.buffer.extend_from_slice(data);
    }

    /// Removes and returns the next complete line.
    ///
    /// The line is consumed through its `\n`; the returned text has the
    /// `\n` (and a `\r` right before it) stripped. Returns `None` while no
    /// newline has arrived yet, keeping the partial content for later.
    /// Bytes that are not valid UTF-8 are replaced with U+FFFD.
    ///
    /// # Errors
    /// [`ProtocolError::LineTooLong`] when a line, finished or not, passes
    /// the limit. Its bytes are discarded up to and including its `\n`.
    pub fn next_line(&mut self) -> Option<Result<String, ProtocolError>> {
        let Some(offset) = find_newline(&self.buffer[self.scanned..]) else {
            self.scanned = self.buffer.len();
            if self.buffer.len() > self.max_line_len {
                let len = self.buffer.len();
                self.buffer.clear();
                self.scanned = 0;
                self.skipping_overflow = true;
                return Some(Err(self.too_long(len)));
            }
            return None;
        };

        let end = self.scanned + offset;
        let line = self.buffer.split_to(end + 1);
        self.scanned = 0;
        if end > self.max_line_len {
            return Some(Err(self.too_long(end)));
        }

        let raw = &line[..end];
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        Some(Ok(String::from_utf8_lossy(raw).into_owned()))
    }

    /// Returns the bytes received but not yet part of a complete line.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Returns `true` if no unconsumed bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn too_long(&self, len: usize) -> ProtocolError {
        ProtocolError::LineTooLong {
            len,
            limit: self.max_line_len,
        }
    }
}
