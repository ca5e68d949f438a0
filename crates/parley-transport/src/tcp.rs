//! Plain TCP transport using `tokio::net`.

use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Room made in the read buffer before each read from the socket.
const READ_BUFFER_SIZE: usize = 16 * 1024;

/// The read half plus the buffer it reads into, reused across reads.
struct ReadState {
    half: OwnedReadHalf,
    buffer: BytesMut,
}

/// A TCP [`Transport`] that listens for incoming connections.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Binds a new TCP transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self { listener })
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let conn = TcpConnection::from_stream(stream, addr);
        tracing::debug!(id = %conn.id, %addr, "accepted TCP connection");
        Ok(conn)
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// A single TCP connection.
///
/// The stream is split so that reading and writing never wait on each
/// other's lock.
pub struct TcpConnection {
    id: ConnectionId,
    peer: SocketAddr,
    reader: Mutex<ReadState>,
    writer: Mutex<OwnedWriteHalf>,
}

impl TcpConnection {
    /// Dials a server, for the client side of the protocol.
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        let connect_failed = |source: std::io::Error| TransportError::ConnectFailed {
            addr: addr.to_string(),
            source,
        };
        let stream =
            TcpStream::connect(addr).await.map_err(connect_failed)?;
        let peer = stream.peer_addr().map_err(connect_failed)?;
        Ok(Self::from_stream(stream, peer))
    }

    fn from_stream(stream: TcpStream, peer: SocketAddr) -> Self {
        // Chat lines are tiny; don't let Nagle hold them back.
        let _ = stream.set_nodelay(true);
        let (reader, writer) = stream.into_split();
        Self {
            id: ConnectionId::next(),
            peer,
            reader: Mutex::new(ReadState {
                half: reader,
                buffer: BytesMut::with_capacity(READ_BUFFER_SIZE),
            }),
            writer: Mutex::new(writer),
        }
    }

    /// Returns the remote address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Connection for TcpConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        self.writer
            .lock()
            .await
            .write_all(data)
            .await
            .map_err(TransportError::SendFailed)
    }

    async fn recv(&self) -> Result<Option<Bytes>, Self::Error> {
        let mut reader = self.reader.lock().await;
        let ReadState { half, buffer } = &mut *reader;
        buffer.reserve(READ_BUFFER_SIZE);
        let n = half
            .read_buf(buffer)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(buffer.split().freeze()))
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
