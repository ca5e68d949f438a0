//! Chat room bookkeeping for Parley.
//!
//! A room is nothing more than a name and a set of members. Rooms don't
//! own their members and members don't own their rooms; both sides refer
//! to each other by name and connection id.
//!
//! # Key types
//!
//! - [`Room`]: one room's membership, ordered by nickname
//! - [`RoomRegistry`]: every non-empty room, keyed by name
//! - [`RoomError`]: what can go wrong

mod error;
mod registry;
mod room;

pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::Room;
