//! `ParleyServer` builder and accept loop.
//!
//! This is the entry point for running a chat server. It ties together
//! all the layers: transport → reactor (sessions, rooms, dispatch) →
//! codec → transport.

use std::sync::Arc;

use parley_protocol::{Codec, LineCodec};
use parley_session::DEFAULT_OUTBOUND_CAPACITY;
use parley_transport::{TcpTransport, Transport};

use crate::handler::handle_connection;
use crate::{ParleyError, Reactor};

/// Address used when none is given.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

/// Server tuning knobs.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// How many connection events may queue up in front of the reactor
    /// before readers have to wait.
    pub event_channel_capacity: usize,

    /// How many messages may wait for one client's writer. A client that
    /// lets its queue fill up is disconnected.
    pub outbound_channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: 256,
            outbound_channel_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }
}

/// Builder for configuring and starting a Parley server.
///
/// # Example
///
/// ```rust,no_run
/// use parley::prelude::*;
///
/// # async fn start() -> Result<(), ParleyError> {
/// let server = ParleyServer::builder()
///     .bind("0.0.0.0:8000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ParleyServerBuilder {
    bind_addr: String,
    config: ServerConfig,
}

impl ParleyServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the server configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds a TCP listener and returns a server speaking the plain line
    /// protocol.
    pub async fn build(self) -> Result<ParleyServer<TcpTransport, LineCodec>, ParleyError> {
        let transport = TcpTransport::bind(&self.bind_addr).await?;
        Ok(ParleyServer::new(transport, LineCodec, self.config))
    }

    /// Like [`build`](Self::build), but clients connect over WebSocket.
    #[cfg(feature = "websocket")]
    pub async fn build_websocket(
        self,
    ) -> Result<ParleyServer<parley_transport::WebSocketTransport, LineCodec>, ParleyError> {
        let transport = parley_transport::WebSocketTransport::bind(&self.bind_addr).await?;
        Ok(ParleyServer::new(transport, LineCodec, self.config))
    }
}

impl Default for ParleyServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A chat server bound to a transport.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ParleyServer<T: Transport, C: Codec> {
    transport: T,
    codec: Arc<C>,
    config: ServerConfig,
}

impl ParleyServer<TcpTransport, LineCodec> {
    /// Creates a new builder.
    pub fn builder() -> ParleyServerBuilder {
        ParleyServerBuilder::new()
    }
}

impl<T, C> ParleyServer<T, C>
where
    T: Transport,
    C: Codec,
{
    /// Wraps an already bound transport.
    pub fn new(transport: T, codec: C, config: ServerConfig) -> Self {
        Self {
            transport,
            codec: Arc::new(codec),
            config,
        }
    }

    /// Replaces the codec used for outbound messages.
    pub fn with_codec<C2: Codec>(self, codec: C2) -> ParleyServer<T, C2> {
        ParleyServer {
            transport: self.transport,
            codec: Arc::new(codec),
            config: self.config,
        }
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop.
    ///
    /// Spawns the reactor, then hands every accepted connection to its
    /// own reader and writer tasks. A failed accept is logged and the loop
    /// keeps going; it only ends when the process is terminated.
    pub async fn run(mut self) -> Result<(), ParleyError> {
        let (reactor, events) = Reactor::new(self.config.event_channel_capacity);
        tokio::spawn(reactor.run());

        match self.transport.local_addr() {
            Ok(addr) => tracing::info!(%addr, "Parley server running"),
            Err(_) => tracing::info!("Parley server running"),
        }

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let codec = Arc::clone(&self.codec);
                    let events = events.clone();
                    tokio::spawn(handle_connection(
                        conn,
                        codec,
                        events,
                        self.config.outbound_channel_capacity,
                    ));
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
