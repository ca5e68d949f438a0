//! Integration tests for the dispatcher: the chat protocol state machine
//! driven without sockets. Each client is an in-memory outbound channel.

use parley::Dispatcher;
use parley_protocol::{Command, MAX_LINE_LEN, ServerMessage};
use parley_session::{Outbound, SessionState};
use parley_transport::ConnectionId;
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

/// One fake client: its id plus everything the server queued for it.
struct Client {
    id: ConnectionId,
    rx: mpsc::Receiver<Outbound>,
}

impl Client {
    /// Drains everything queued so far.
    fn drain(&mut self) -> Vec<Outbound> {
        let mut out = Vec::new();
        while let Ok(item) = self.rx.try_recv() {
            out.push(item);
        }
        out
    }

    /// Drains queued messages as wire lines, for compact assertions.
    fn lines(&mut self) -> Vec<String> {
        self.drain()
            .into_iter()
            .map(|item| match item {
                Outbound::Message(msg) => msg.to_string(),
                Outbound::Close => "<close>".to_string(),
            })
            .collect()
    }
}

fn connect(dispatcher: &mut Dispatcher, id: u64) -> Client {
    connect_with_capacity(dispatcher, id, 64)
}

/// Connects a client whose outbound queue holds at most `capacity`
/// messages.
fn connect_with_capacity(dispatcher: &mut Dispatcher, id: u64, capacity: usize) -> Client {
    let (tx, rx) = mpsc::channel(capacity);
    let id = ConnectionId::new(id);
    dispatcher.connect(id, tx).expect("should connect");
    Client { id, rx }
}

fn send(dispatcher: &mut Dispatcher, client: &Client, line: &str) {
    dispatcher.receive(client.id, format!("{line}\n").as_bytes());
}

/// Connects a client and gives it a nickname.
fn named(dispatcher: &mut Dispatcher, id: u64, nick: &str) -> Client {
    let mut client = connect(dispatcher, id);
    send(dispatcher, &client, &format!("/nick {nick}"));
    assert_eq!(client.lines(), ["OK"]);
    client
}

/// Connects a named client and puts it in `room`, discarding replies.
fn in_room(dispatcher: &mut Dispatcher, id: u64, nick: &str, room: &str) -> Client {
    let mut client = named(dispatcher, id, nick);
    send(dispatcher, &client, &format!("/join {room}"));
    assert_eq!(client.lines(), ["OK"]);
    client
}

fn state(dispatcher: &Dispatcher, client: &Client) -> SessionState {
    dispatcher
        .session(client.id)
        .expect("session should exist")
        .state()
        .clone()
}

fn room_nicks(dispatcher: &Dispatcher, room: &str) -> Vec<String> {
    dispatcher
        .rooms()
        .get(room)
        .map(|r| r.nicknames().map(str::to_owned).collect())
        .unwrap_or_default()
}

// =========================================================================
// /nick
// =========================================================================

#[test]
fn test_nick_from_init_moves_to_outside() {
    let mut d = Dispatcher::new();
    let mut a = connect(&mut d, 1);
    assert_eq!(state(&d, &a), SessionState::Init);

    send(&mut d, &a, "/nick alice");

    assert_eq!(a.lines(), ["OK"]);
    assert_eq!(state(&d, &a), SessionState::Outside);
    assert_eq!(d.sessions().find_by_nickname("alice"), Some(a.id));
}

#[test]
fn test_nick_taken_by_other_session_returns_error_and_keeps_owner() {
    let mut d = Dispatcher::new();
    let _a = named(&mut d, 1, "alice");
    let mut b = named(&mut d, 2, "bob");

    send(&mut d, &b, "/nick alice");

    assert_eq!(b.lines(), ["ERROR There already is a user with nick alice"]);
    assert_eq!(d.sessions().find_by_nickname("alice"), Some(ConnectionId::new(1)));
    assert_eq!(d.session(b.id).unwrap().nickname(), Some("bob"));
}

#[test]
fn test_nick_taken_from_init_stays_in_init() {
    let mut d = Dispatcher::new();
    let _a = named(&mut d, 1, "alice");
    let mut b = connect(&mut d, 2);

    send(&mut d, &b, "/nick alice");

    assert_eq!(b.lines(), ["ERROR There already is a user with nick alice"]);
    assert_eq!(state(&d, &b), SessionState::Init);
}

#[test]
fn test_nick_same_name_replies_ok_without_broadcast() {
    let mut d = Dispatcher::new();
    let mut a = in_room(&mut d, 1, "alice", "lobby");
    let mut b = in_room(&mut d, 2, "bob", "lobby");
    a.drain();

    send(&mut d, &a, "/nick alice");

    assert_eq!(a.lines(), ["OK"]);
    assert!(b.lines().is_empty());
}

#[test]
fn test_nick_inside_room_broadcasts_newnick_to_others_only() {
    let mut d = Dispatcher::new();
    let mut a = in_room(&mut d, 1, "alice", "lobby");
    let mut b = in_room(&mut d, 2, "bob", "lobby");
    let mut c = in_room(&mut d, 3, "carol", "elsewhere");
    a.drain();

    send(&mut d, &a, "/nick alicia");

    assert_eq!(a.lines(), ["OK"]);
    assert_eq!(b.lines(), ["NEWNICK alice alicia"]);
    assert!(c.lines().is_empty());
    assert_eq!(room_nicks(&d, "lobby"), ["alicia", "bob"]);
    assert_eq!(d.sessions().find_by_nickname("alice"), None);
}

#[test]
fn test_nick_old_name_is_free_after_rename() {
    let mut d = Dispatcher::new();
    let mut a = named(&mut d, 1, "alice");
    send(&mut d, &a, "/nick alicia");
    assert_eq!(a.lines(), ["OK"]);

    let mut b = connect(&mut d, 2);
    send(&mut d, &b, "/nick alice");
    assert_eq!(b.lines(), ["OK"]);
}

// =========================================================================
// /join
// =========================================================================

#[test]
fn test_join_without_nickname_returns_error_and_stays_init() {
    let mut d = Dispatcher::new();
    let mut a = connect(&mut d, 1);

    send(&mut d, &a, "/join lobby");

    assert_eq!(a.lines(), ["ERROR You don't have a nickname."]);
    assert_eq!(state(&d, &a), SessionState::Init);
    assert!(d.rooms().is_empty());
}

#[test]
fn test_join_notifies_existing_members_but_not_joiner() {
    let mut d = Dispatcher::new();
    let mut a = in_room(&mut d, 1, "alice", "lobby");
    let mut b = named(&mut d, 2, "bob");

    send(&mut d, &b, "/join lobby");

    assert_eq!(b.lines(), ["OK"]);
    assert_eq!(a.lines(), ["JOINED bob"]);
    assert_eq!(
        state(&d, &b),
        SessionState::Inside {
            room: "lobby".into()
        }
    );
}

#[test]
fn test_join_other_room_leaves_old_room_first() {
    let mut d = Dispatcher::new();
    let mut a = in_room(&mut d, 1, "alice", "lobby");
    let mut b = in_room(&mut d, 2, "bob", "lobby");
    let mut c = in_room(&mut d, 3, "carol", "rust");
    a.drain();

    send(&mut d, &b, "/join rust");

    // Implicit leave replies too, so the joiner sees two OKs.
    assert_eq!(b.lines(), ["OK", "OK"]);
    assert_eq!(a.lines(), ["LEFT bob"]);
    assert_eq!(c.lines(), ["JOINED bob"]);
    assert_eq!(room_nicks(&d, "lobby"), ["alice"]);
    assert_eq!(room_nicks(&d, "rust"), ["bob", "carol"]);
}

#[test]
fn test_join_from_only_member_deletes_old_room() {
    let mut d = Dispatcher::new();
    let mut a = in_room(&mut d, 1, "alice", "lobby");

    send(&mut d, &a, "/join rust");

    assert_eq!(a.lines(), ["OK", "OK"]);
    assert!(d.rooms().get("lobby").is_none());
    assert_eq!(d.rooms().room_names(), ["rust"]);
}

#[test]
fn test_join_same_room_again_rejoins() {
    let mut d = Dispatcher::new();
    let mut a = in_room(&mut d, 1, "alice", "lobby");
    let mut b = in_room(&mut d, 2, "bob", "lobby");
    a.drain();

    send(&mut d, &b, "/join lobby");

    assert_eq!(b.lines(), ["OK", "OK"]);
    assert_eq!(a.lines(), ["LEFT bob", "JOINED bob"]);
    assert_eq!(room_nicks(&d, "lobby"), ["alice", "bob"]);
}

// =========================================================================
// /leave
// =========================================================================

#[test]
fn test_leave_outside_room_returns_error() {
    let mut d = Dispatcher::new();
    let mut a = named(&mut d, 1, "alice");

    send(&mut d, &a, "/leave");

    assert_eq!(a.lines(), ["ERROR You are not in a room."]);
    assert_eq!(state(&d, &a), SessionState::Outside);
}

#[test]
fn test_leave_from_init_returns_error() {
    let mut d = Dispatcher::new();
    let mut a = connect(&mut d, 1);

    send(&mut d, &a, "/leave");

    assert_eq!(a.lines(), ["ERROR You are not in a room."]);
    assert_eq!(state(&d, &a), SessionState::Init);
}

#[test]
fn test_leave_last_member_deletes_room() {
    let mut d = Dispatcher::new();
    let mut a = in_room(&mut d, 1, "alice", "lobby");

    send(&mut d, &a, "/leave");

    assert_eq!(a.lines(), ["OK"]);
    assert_eq!(state(&d, &a), SessionState::Outside);
    assert!(d.rooms().is_empty());
}

// =========================================================================
// /priv
// =========================================================================

#[test]
fn test_priv_delivers_only_to_target() {
    let mut d = Dispatcher::new();
    let mut a = named(&mut d, 1, "alice");
    let mut b = named(&mut d, 2, "bob");
    let mut c = named(&mut d, 3, "carol");

    send(&mut d, &a, "/priv bob are you there?");

    assert_eq!(a.lines(), ["OK"]);
    assert_eq!(b.lines(), ["PRIVATE alice are you there?"]);
    assert!(c.lines().is_empty());
}

#[test]
fn test_priv_unknown_target_returns_error_naming_target() {
    let mut d = Dispatcher::new();
    let mut a = named(&mut d, 1, "alice");

    send(&mut d, &a, "/priv carol hi");

    assert_eq!(a.lines(), ["ERROR carol: No such nickname online."]);
}

#[test]
fn test_priv_without_nickname_returns_error() {
    let mut d = Dispatcher::new();
    let mut a = connect(&mut d, 1);
    let mut b = named(&mut d, 2, "bob");

    send(&mut d, &a, "/priv bob hi");

    assert_eq!(a.lines(), ["ERROR You don't have a nickname."]);
    assert!(b.lines().is_empty());
}

#[test]
fn test_priv_works_across_rooms() {
    let mut d = Dispatcher::new();
    let mut a = in_room(&mut d, 1, "alice", "lobby");
    let mut b = in_room(&mut d, 2, "bob", "rust");

    send(&mut d, &a, "/priv bob hi");

    assert_eq!(a.lines(), ["OK"]);
    assert_eq!(b.lines(), ["PRIVATE alice hi"]);
}

// =========================================================================
// Public text
// =========================================================================

#[test]
fn test_public_text_reaches_every_member_including_sender() {
    let mut d = Dispatcher::new();
    let mut a = in_room(&mut d, 1, "alice", "lobby");
    let mut b = in_room(&mut d, 2, "bob", "lobby");
    let mut c = in_room(&mut d, 3, "carol", "rust");
    a.drain();

    send(&mut d, &a, "hello there");

    assert_eq!(a.lines(), ["MESSAGE alice hello there"]);
    assert_eq!(b.lines(), ["MESSAGE alice hello there"]);
    assert!(c.lines().is_empty());
}

#[test]
fn test_public_text_outside_room_returns_error() {
    let mut d = Dispatcher::new();
    let mut a = named(&mut d, 1, "alice");

    send(&mut d, &a, "anyone?");

    assert_eq!(a.lines(), ["ERROR You are not in a room."]);
}

#[test]
fn test_public_text_escaped_slash_is_sent_as_text() {
    let mut d = Dispatcher::new();
    let mut a = in_room(&mut d, 1, "alice", "lobby");

    send(&mut d, &a, "//nick is a command");

    assert_eq!(a.lines(), ["MESSAGE alice /nick is a command"]);
}

#[test]
fn test_blank_line_produces_no_reply() {
    let mut d = Dispatcher::new();
    let mut a = in_room(&mut d, 1, "alice", "lobby");

    send(&mut d, &a, "   ");

    assert!(a.lines().is_empty());
}

// =========================================================================
// Unrecognized commands
// =========================================================================

#[test]
fn test_unrecognized_command_returns_error_without_state_change() {
    let mut d = Dispatcher::new();
    let mut a = in_room(&mut d, 1, "alice", "lobby");

    send(&mut d, &a, "/dance");
    send(&mut d, &a, "/nick al.ice");

    assert_eq!(
        a.lines(),
        ["ERROR Unknown command.", "ERROR Unknown command."]
    );
    assert_eq!(
        state(&d, &a),
        SessionState::Inside {
            room: "lobby".into()
        }
    );
}

#[test]
fn test_nick_and_join_with_trailing_words_are_unknown_commands() {
    let mut d = Dispatcher::new();
    let mut a = connect(&mut d, 1);

    send(&mut d, &a, "/nick alice extra");
    assert_eq!(a.lines(), ["ERROR Unknown command."]);
    assert_eq!(state(&d, &a), SessionState::Init);
    assert_eq!(d.sessions().find_by_nickname("alice"), None);

    send(&mut d, &a, "/nick alice");
    send(&mut d, &a, "/join lobby now");
    assert_eq!(a.lines(), ["OK", "ERROR Unknown command."]);
    assert_eq!(state(&d, &a), SessionState::Outside);
    assert!(d.rooms().is_empty());
}

// =========================================================================
// /bye and teardown
// =========================================================================

#[test]
fn test_bye_sends_bye_then_closes_and_notifies_room() {
    let mut d = Dispatcher::new();
    let mut a = in_room(&mut d, 1, "alice", "lobby");
    let mut b = in_room(&mut d, 2, "bob", "lobby");
    a.drain();

    send(&mut d, &b, "/bye");

    assert_eq!(b.lines(), ["BYE", "<close>"]);
    assert_eq!(a.lines(), ["LEFT bob"]);
    assert!(d.session(b.id).is_none());
    assert_eq!(d.sessions().find_by_nickname("bob"), None);
    assert_eq!(room_nicks(&d, "lobby"), ["alice"]);
}

#[test]
fn test_bye_drops_lines_after_it_in_same_read() {
    let mut d = Dispatcher::new();
    let mut a = named(&mut d, 1, "alice");

    d.receive(a.id, b"/bye\n/join lobby\n");

    assert_eq!(a.lines(), ["BYE", "<close>"]);
    assert!(d.rooms().is_empty());
}

#[test]
fn test_disconnect_twice_sends_single_left() {
    let mut d = Dispatcher::new();
    let mut a = in_room(&mut d, 1, "alice", "lobby");
    let b = in_room(&mut d, 2, "bob", "lobby");
    a.drain();

    d.disconnect(b.id);
    d.disconnect(b.id);

    assert_eq!(a.lines(), ["LEFT bob"]);
    assert_eq!(d.sessions().len(), 1);
}

#[test]
fn test_disconnect_unnamed_session_just_removes_it() {
    let mut d = Dispatcher::new();
    let mut a = connect(&mut d, 1);

    d.disconnect(a.id);

    assert_eq!(a.lines(), ["<close>"]);
    assert!(d.sessions().is_empty());
}

#[test]
fn test_disconnect_last_member_deletes_room_and_frees_nickname() {
    let mut d = Dispatcher::new();
    let a = in_room(&mut d, 1, "alice", "lobby");

    d.disconnect(a.id);

    assert!(d.rooms().is_empty());
    let mut b = connect(&mut d, 2);
    send(&mut d, &b, "/nick alice");
    assert_eq!(b.lines(), ["OK"]);
}

#[test]
fn test_broadcast_failed_recipient_is_torn_down_and_others_still_served() {
    let mut d = Dispatcher::new();
    let mut a = in_room(&mut d, 1, "alice", "lobby");
    let b = in_room(&mut d, 2, "bob", "lobby");
    let mut c = in_room(&mut d, 3, "carol", "lobby");
    a.drain();

    // bob's writer is gone: his socket died but the reader hasn't noticed.
    let bob = b.id;
    drop(b);

    send(&mut d, &a, "hi all");

    // carol comes after bob in nickname order and still gets the message,
    // then hears that bob left.
    assert_eq!(a.lines(), ["MESSAGE alice hi all", "LEFT bob"]);
    assert_eq!(c.lines(), ["MESSAGE alice hi all", "LEFT bob"]);
    assert!(d.session(bob).is_none());
    assert_eq!(room_nicks(&d, "lobby"), ["alice", "carol"]);
}

#[test]
fn test_broadcast_to_backlogged_recipient_tears_it_down() {
    let mut d = Dispatcher::new();
    let mut a = in_room(&mut d, 1, "alice", "lobby");
    // bob never reads; his queue holds three messages.
    let mut b = connect_with_capacity(&mut d, 2, 3);
    send(&mut d, &b, "/nick bob");
    send(&mut d, &b, "/join lobby");
    a.drain();

    send(&mut d, &a, "one");
    send(&mut d, &a, "two");

    assert_eq!(
        a.lines(),
        ["MESSAGE alice one", "MESSAGE alice two", "LEFT bob"]
    );
    assert!(d.session(b.id).is_none());
    assert_eq!(d.sessions().find_by_nickname("bob"), None);
    assert_eq!(room_nicks(&d, "lobby"), ["alice"]);
    // What was already queued still drains, then the channel ends.
    assert_eq!(b.lines(), ["OK", "OK", "MESSAGE alice one"]);
}

// =========================================================================
// Framing
// =========================================================================

#[test]
fn test_receive_partial_line_waits_for_newline() {
    let mut d = Dispatcher::new();
    let mut a = named(&mut d, 1, "alice");

    d.receive(a.id, b"/join ro");
    d.receive(a.id, b"omA");
    assert!(a.lines().is_empty());
    assert_eq!(state(&d, &a), SessionState::Outside);

    d.receive(a.id, b"\n");
    assert_eq!(a.lines(), ["OK"]);
    assert_eq!(room_nicks(&d, "roomA"), ["alice"]);
}

#[test]
fn test_receive_several_commands_in_one_read_run_in_order() {
    let mut d = Dispatcher::new();
    let mut a = connect(&mut d, 1);

    d.receive(a.id, b"/nick alice\r\n/join lobby\nhello\n");

    assert_eq!(a.lines(), ["OK", "OK", "MESSAGE alice hello"]);
}

#[test]
fn test_receive_over_long_line_returns_error_and_keeps_session() {
    let mut d = Dispatcher::new();
    let mut a = named(&mut d, 1, "alice");

    d.receive(a.id, &vec![b'x'; MAX_LINE_LEN + 1]);
    assert_eq!(a.lines(), ["ERROR Line too long."]);

    // The rest of that line is dropped; the next one is read normally.
    d.receive(a.id, b"still the same line\n/join lobby\n");
    assert_eq!(a.lines(), ["OK"]);
    assert_eq!(room_nicks(&d, "lobby"), ["alice"]);
}

#[test]
fn test_receive_endless_input_is_dropped_not_buffered() {
    let mut d = Dispatcher::new();
    let mut a = connect(&mut d, 1);
    let chunk = vec![b'x'; 16 * 1024];

    for _ in 0..64 {
        d.receive(a.id, &chunk);
    }

    assert_eq!(a.lines(), ["ERROR Line too long."]);
    assert!(d.session(a.id).is_some());
}

#[test]
fn test_dispatch_typed_command_matches_parsed_line() {
    let mut d = Dispatcher::new();
    let mut a = connect(&mut d, 1);

    d.dispatch(
        a.id,
        Command::SetNickname {
            name: "alice".into(),
        },
    );

    assert_eq!(a.drain(), [Outbound::Message(ServerMessage::Ok)]);
}

#[test]
fn test_receive_unknown_connection_is_ignored() {
    let mut d = Dispatcher::new();
    d.receive(ConnectionId::new(99), b"/nick ghost\n");
    assert!(d.sessions().is_empty());
}

// =========================================================================
// Full scenario
// =========================================================================

#[test]
fn test_scenario_alice_and_bob_in_lobby() {
    let mut d = Dispatcher::new();
    let mut a = connect(&mut d, 1);
    let mut b = connect(&mut d, 2);

    send(&mut d, &a, "/nick alice");
    assert_eq!(a.lines(), ["OK"]);
    send(&mut d, &a, "/join lobby");
    assert_eq!(a.lines(), ["OK"]);
    assert_eq!(room_nicks(&d, "lobby"), ["alice"]);

    send(&mut d, &b, "/nick bob");
    send(&mut d, &b, "/join lobby");
    assert_eq!(b.lines(), ["OK", "OK"]);
    assert_eq!(a.lines(), ["JOINED bob"]);

    send(&mut d, &a, "hello");
    assert_eq!(a.lines(), ["MESSAGE alice hello"]);
    assert_eq!(b.lines(), ["MESSAGE alice hello"]);

    send(&mut d, &b, "/leave");
    assert_eq!(b.lines(), ["OK"]);
    assert_eq!(a.lines(), ["LEFT bob"]);
    assert_eq!(room_nicks(&d, "lobby"), ["alice"]);
}
