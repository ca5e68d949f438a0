//! A single chat room.

use std::collections::BTreeMap;

use parley_transport::ConnectionId;

/// A named set of members, iterated in nickname order.
///
/// Members are keyed by nickname so that every broadcast walks them in the
/// same order, which keeps fan-out reproducible in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    name: String,
    members: BTreeMap<String, ConnectionId>,
}

impl Room {
    /// Creates an empty room.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: BTreeMap::new(),
        }
    }

    /// The room's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if nobody is in the room.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns `true` if `nickname` is a member.
    pub fn contains(&self, nickname: &str) -> bool {
        self.members.contains_key(nickname)
    }

    /// Member connections, in nickname order.
    pub fn connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.members.values().copied()
    }

    /// Member nicknames, in order.
    pub fn nicknames(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    /// Adds a member. Returns `false` if the nickname was already present.
    pub(crate) fn insert(&mut self, nickname: &str, id: ConnectionId) -> bool {
        if self.members.contains_key(nickname) {
            return false;
        }
        self.members.insert(nickname.to_string(), id);
        true
    }

    /// Removes a member, returning its connection.
    pub(crate) fn remove(&mut self, nickname: &str) -> Option<ConnectionId> {
        self.members.remove(nickname)
    }
}
