//! # Parley
//!
//! A line-oriented, multi-room chat server and its client.
//!
//! Clients connect over TCP (or WebSocket, with the `websocket` feature),
//! pick a nickname with `/nick`, enter rooms with `/join`, and talk. One
//! reactor task owns every session and room; per-connection tasks only
//! move bytes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parley::prelude::*;
//!
//! # async fn start() -> Result<(), ParleyError> {
//! let server = ParleyServer::builder()
//!     .bind("0.0.0.0:8000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod client;
mod dispatch;
mod error;
mod handler;
mod reactor;
mod server;
mod telemetry;

pub use client::{ChatClient, DisplaySink, JsonSink, TextSink};
pub use dispatch::Dispatcher;
pub use error::ParleyError;
pub use reactor::{Reactor, ReactorEvent};
pub use server::{DEFAULT_BIND_ADDR, ParleyServer, ParleyServerBuilder, ServerConfig};
pub use telemetry::{LogTarget, init_tracing};

/// Re-exports of the types most programs need.
pub mod prelude {
    pub use parley_protocol::{Codec, Command, LineCodec, MAX_LINE_LEN, ServerMessage};
    pub use parley_session::{Outbound, SessionState};
    pub use parley_transport::{Connection, ConnectionId, TcpConnection, Transport};

    pub use crate::{
        ChatClient, DisplaySink, Dispatcher, JsonSink, ParleyError, ParleyServer,
        ParleyServerBuilder, ServerConfig, TextSink,
    };
}
