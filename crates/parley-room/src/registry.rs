//! The room registry: every non-empty room, keyed by name.

use std::collections::HashMap;

use parley_transport::ConnectionId;

use crate::{Room, RoomError};

/// Maps room names to their membership.
///
/// An empty room is garbage: [`leave`](Self::leave) deletes a room the
/// moment its last member goes, so the registry only ever holds rooms
/// with at least one member (apart from a room fresh out of
/// [`get_or_create`](Self::get_or_create) that nobody has joined yet).
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the named room, creating an empty one if it doesn't exist.
    pub fn get_or_create(&mut self, name: &str) -> &mut Room {
        if !self.rooms.contains_key(name) {
            tracing::info!(room = name, "room created");
        }
        self.rooms
            .entry(name.to_string())
            .or_insert_with(|| Room::new(name))
    }

    /// Looks up a room by name.
    pub fn get(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    /// Adds `nickname` to `room`, creating the room if needed.
    ///
    /// # Errors
    /// Returns [`RoomError::AlreadyMember`] if the nickname is already in
    /// the room.
    pub fn join(
        &mut self,
        room: &str,
        nickname: &str,
        id: ConnectionId,
    ) -> Result<(), RoomError> {
        let entry = self.get_or_create(room);
        if !entry.insert(nickname, id) {
            return Err(RoomError::AlreadyMember {
                room: room.to_string(),
                nickname: nickname.to_string(),
            });
        }
        tracing::debug!(room, nickname, members = entry.len(), "member added");
        Ok(())
    }

    /// Removes `nickname` from `room` and returns the members that remain,
    /// in nickname order.
    ///
    /// The remaining members are read before the room is dropped, so a
    /// caller can still tell them about the departure. When the last
    /// member leaves the room is deleted.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`]: no such room
    /// - [`RoomError::NotMember`]: the nickname isn't in it
    pub fn leave(
        &mut self,
        room: &str,
        nickname: &str,
    ) -> Result<Vec<ConnectionId>, RoomError> {
        let entry = self
            .rooms
            .get_mut(room)
            .ok_or_else(|| RoomError::NotFound(room.to_string()))?;

        if entry.remove(nickname).is_none() {
            return Err(RoomError::NotMember {
                room: room.to_string(),
                nickname: nickname.to_string(),
            });
        }

        let remaining: Vec<ConnectionId> = entry.connections().collect();
        if remaining.is_empty() {
            self.rooms.remove(room);
            tracing::info!(room, "room removed");
        }
        Ok(remaining)
    }

    /// Re-keys a member after a nickname change, keeping its place in
    /// nickname order correct.
    ///
    /// # Errors
    /// Same as [`leave`](Self::leave), plus [`RoomError::AlreadyMember`]
    /// if `new` is somehow already present.
    pub fn rename_member(
        &mut self,
        room: &str,
        old: &str,
        new: &str,
    ) -> Result<(), RoomError> {
        let entry = self
            .rooms
            .get_mut(room)
            .ok_or_else(|| RoomError::NotFound(room.to_string()))?;

        if entry.contains(new) {
            return Err(RoomError::AlreadyMember {
                room: room.to_string(),
                nickname: new.to_string(),
            });
        }
        let id = entry.remove(old).ok_or_else(|| RoomError::NotMember {
            room: room.to_string(),
            nickname: old.to_string(),
        })?;
        entry.insert(new, id);
        Ok(())
    }

    /// Member connections of `room` in nickname order, or an empty list if
    /// the room doesn't exist.
    pub fn members(&self, room: &str) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|r| r.connections().collect())
            .unwrap_or_default()
    }

    /// Names of all rooms, sorted.
    pub fn room_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rooms.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Returns `true` if there are no rooms.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
