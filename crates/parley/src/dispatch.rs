//! The protocol state machine.
//!
//! [`Dispatcher`] owns every session and room, and turns one decoded
//! [`Command`] at a time into state changes plus outbound messages. It
//! does no I/O of its own: messages go into each session's outbound
//! channel, and the connection's writer task puts them on the wire.
//!
//! A delivery that fails (the recipient's writer is gone) never stops a
//! broadcast. The recipient is only marked, and torn down once the
//! current command has finished.

use std::collections::VecDeque;

use parley_protocol::{Command, ServerMessage};
use parley_room::RoomRegistry;
use parley_session::{PeerSender, Session, SessionError, SessionManager, SessionState};
use parley_transport::ConnectionId;

/// Reply texts for refused commands.
mod reply {
    pub(super) const NO_NICKNAME: &str = "You don't have a nickname.";
    pub(super) const NOT_IN_ROOM: &str = "You are not in a room.";
    pub(super) const UNKNOWN_COMMAND: &str = "Unknown command.";
    pub(super) const LINE_TOO_LONG: &str = "Line too long.";

    pub(super) fn nickname_taken(nickname: &str) -> String {
        format!("There already is a user with nick {nickname}")
    }

    pub(super) fn no_such_nickname(target: &str) -> String {
        format!("{target}: No such nickname online.")
    }
}

/// Interprets client commands against the session table and room registry.
#[derive(Debug, Default)]
pub struct Dispatcher {
    sessions: SessionManager,
    rooms: RoomRegistry,
    /// Recipients whose delivery failed, waiting for teardown.
    doomed: VecDeque<ConnectionId>,
}

impl Dispatcher {
    /// Creates a dispatcher with empty registries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly accepted connection in `Init`.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyRegistered`] if `id` is already
    /// connected.
    pub fn connect(
        &mut self,
        id: ConnectionId,
        outbound: PeerSender,
    ) -> Result<(), SessionError> {
        self.sessions.create(id, outbound)?;
        tracing::info!(conn_id = %id, "client connected");
        Ok(())
    }

    /// Feeds bytes read from `id` and dispatches every line they complete,
    /// in order.
    ///
    /// A partial line stays buffered until its `\n` arrives. Lines after a
    /// `/bye` in the same read are dropped along with the session. A line
    /// over [`MAX_LINE_LEN`](parley_protocol::MAX_LINE_LEN) is answered
    /// with an error and skipped.
    pub fn receive(&mut self, id: ConnectionId, data: &[u8]) {
        let Some(session) = self.sessions.get_mut(id) else {
            tracing::debug!(conn_id = %id, "data for unknown connection");
            return;
        };
        session.push_bytes(data);

        while let Some(line) = self.sessions.get_mut(id).and_then(Session::take_line) {
            match line {
                Ok(line) => {
                    tracing::debug!(conn_id = %id, line = %line, "line received");
                    if let Some(command) = Command::parse(&line) {
                        self.dispatch(id, command);
                    }
                }
                Err(e) => {
                    tracing::warn!(conn_id = %id, error = %e, "input line dropped");
                    self.deliver(id, ServerMessage::error(reply::LINE_TOO_LONG));
                    self.reap();
                }
            }
        }
    }

    /// Runs one command for `id`, then tears down any recipient whose
    /// delivery failed along the way.
    pub fn dispatch(&mut self, id: ConnectionId, command: Command) {
        if self.sessions.get(id).is_none() {
            tracing::debug!(conn_id = %id, "command for unknown connection");
            return;
        }

        match command {
            Command::SetNickname { name } => self.set_nickname(id, name),
            Command::Join { room } => self.join(id, room),
            Command::Leave => self.leave(id),
            Command::Bye => {
                self.deliver(id, ServerMessage::Bye);
                self.teardown(id);
            }
            Command::PrivateMessage { target, text } => {
                self.private_message(id, &target, text)
            }
            Command::PublicText { text } => self.public_text(id, text),
            Command::Unrecognized { body } => {
                tracing::debug!(conn_id = %id, body = %body, "unrecognized command");
                self.deliver(id, ServerMessage::error(reply::UNKNOWN_COMMAND));
            }
        }

        self.reap();
    }

    /// Handles a connection that ended without `/bye`: peer closed, read
    /// error, or write error.
    ///
    /// Safe to call any number of times; only the first call has an effect.
    pub fn disconnect(&mut self, id: ConnectionId) {
        self.teardown(id);
        self.reap();
    }

    /// The session for `id`, if still connected.
    pub fn session(&self, id: ConnectionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// The session table.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// The room registry.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    // -----------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------

    fn set_nickname(&mut self, id: ConnectionId, name: String) {
        let old = match self.sessions.rename(id, &name) {
            Ok(old) => old,
            Err(SessionError::NicknameTaken(_)) => {
                self.deliver(id, ServerMessage::error(reply::nickname_taken(&name)));
                return;
            }
            Err(e) => {
                tracing::warn!(conn_id = %id, error = %e, "rename failed");
                return;
            }
        };

        if old.as_deref() == Some(name.as_str()) {
            self.deliver(id, ServerMessage::Ok);
            return;
        }

        let state = self.session_state(id);
        match (state, old) {
            (SessionState::Init, _) => self.set_state(id, SessionState::Outside),
            (SessionState::Inside { room }, Some(old)) => {
                if let Err(e) = self.rooms.rename_member(&room, &old, &name) {
                    tracing::warn!(conn_id = %id, %room, error = %e, "room out of sync");
                }
                let others: Vec<ConnectionId> = self
                    .rooms
                    .members(&room)
                    .into_iter()
                    .filter(|member| *member != id)
                    .collect();
                self.broadcast(&others, ServerMessage::NewNick { old, new: name.clone() });
            }
            _ => {}
        }

        tracing::info!(conn_id = %id, nickname = %name, "nickname set");
        self.deliver(id, ServerMessage::Ok);
    }

    fn join(&mut self, id: ConnectionId, room: String) {
        let Some(nickname) = self.nickname(id) else {
            self.deliver(id, ServerMessage::error(reply::NO_NICKNAME));
            return;
        };

        if self.session_room(id).is_some() {
            self.leave(id);
        }

        let existing = self.rooms.members(&room);
        self.broadcast(&existing, ServerMessage::Joined { who: nickname.clone() });

        if let Err(e) = self.rooms.join(&room, &nickname, id) {
            tracing::warn!(conn_id = %id, %room, error = %e, "join failed");
            return;
        }
        self.set_state(id, SessionState::Inside { room: room.clone() });
        tracing::info!(conn_id = %id, %nickname, %room, "joined room");
        self.deliver(id, ServerMessage::Ok);
    }

    fn leave(&mut self, id: ConnectionId) {
        if self.leave_room(id) {
            self.deliver(id, ServerMessage::Ok);
        } else {
            self.deliver(id, ServerMessage::error(reply::NOT_IN_ROOM));
        }
    }

    fn private_message(&mut self, id: ConnectionId, target: &str, text: String) {
        let Some(from) = self.nickname(id) else {
            self.deliver(id, ServerMessage::error(reply::NO_NICKNAME));
            return;
        };
        let Some(target_id) = self.sessions.find_by_nickname(target) else {
            self.deliver(id, ServerMessage::error(reply::no_such_nickname(target)));
            return;
        };

        self.deliver(id, ServerMessage::Ok);
        self.deliver(target_id, ServerMessage::Private { from, text });
    }

    fn public_text(&mut self, id: ConnectionId, text: String) {
        let (Some(from), Some(room)) = (self.nickname(id), self.session_room(id)) else {
            self.deliver(id, ServerMessage::error(reply::NOT_IN_ROOM));
            return;
        };

        let members = self.rooms.members(&room);
        self.broadcast(&members, ServerMessage::Message { from, text });
    }

    // -----------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------

    /// Takes `id` out of its room, telling the members that remain.
    /// Returns `false` if it wasn't in a room.
    fn leave_room(&mut self, id: ConnectionId) -> bool {
        let (Some(nickname), Some(room)) = (self.nickname(id), self.session_room(id)) else {
            return false;
        };

        match self.rooms.leave(&room, &nickname) {
            Ok(remaining) => {
                self.broadcast(&remaining, ServerMessage::Left { who: nickname.clone() });
            }
            Err(e) => {
                tracing::warn!(conn_id = %id, %room, error = %e, "room out of sync");
            }
        }
        self.set_state(id, SessionState::Outside);
        tracing::info!(conn_id = %id, %nickname, %room, "left room");
        true
    }

    /// Removes a session for good. A no-op if it is already gone.
    fn teardown(&mut self, id: ConnectionId) {
        if self.sessions.get(id).is_none() {
            return;
        }
        self.leave_room(id);
        if let Some(session) = self.sessions.remove(id) {
            tracing::info!(
                conn_id = %id,
                nickname = session.nickname().unwrap_or("-"),
                "client disconnected"
            );
            session.close();
        }
    }

    /// Tears down every recipient whose delivery failed. Each teardown may
    /// fail further deliveries, so this runs until nothing is left.
    fn reap(&mut self) {
        while let Some(id) = self.doomed.pop_front() {
            tracing::debug!(conn_id = %id, "delivery failed, tearing down");
            self.teardown(id);
        }
    }

    // -----------------------------------------------------------------
    // Delivery
    // -----------------------------------------------------------------

    fn deliver(&mut self, id: ConnectionId, message: ServerMessage) {
        let Some(session) = self.sessions.get(id) else {
            return;
        };
        if session.send(message).is_err() && !self.doomed.contains(&id) {
            self.doomed.push_back(id);
        }
    }

    fn broadcast(&mut self, recipients: &[ConnectionId], message: ServerMessage) {
        for &recipient in recipients {
            self.deliver(recipient, message.clone());
        }
    }

    // -----------------------------------------------------------------
    // Session helpers
    // -----------------------------------------------------------------

    fn nickname(&self, id: ConnectionId) -> Option<String> {
        self.sessions.get(id)?.nickname().map(str::to_owned)
    }

    fn session_room(&self, id: ConnectionId) -> Option<String> {
        self.sessions.get(id)?.room().map(str::to_owned)
    }

    fn session_state(&self, id: ConnectionId) -> SessionState {
        self.sessions
            .get(id)
            .map(|s| s.state().clone())
            .unwrap_or_default()
    }

    fn set_state(&mut self, id: ConnectionId, state: SessionState) {
        if let Some(session) = self.sessions.get_mut(id) {
            session.set_state(state);
        }
    }
}
