//! Chat session management for Parley.
//!
//! This crate tracks every connected client:
//!
//! 1. **Sessions**: one [`Session`] per connection, holding its nickname,
//!    lifecycle state, partial input and the channel to its writer task
//! 2. **Nickname registry**: [`SessionManager`] keeps nicknames unique
//!    across all live sessions
//!
//! # How it fits in the stack
//!
//! ```text
//! Dispatcher (above)  ← decides what each command does
//!     ↕
//! Session Layer (this crate)  ← who is connected, under which name
//!     ↕
//! Protocol Layer (below)  ← provides LineBuffer, ServerMessage
//! ```

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{DEFAULT_OUTBOUND_CAPACITY, Outbound, PeerSender, Session, SessionState};
