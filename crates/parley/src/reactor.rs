//! The reactor: the single task that owns all chat state.
//!
//! Connection tasks never touch sessions or rooms. They report what
//! happened on their socket as a [`ReactorEvent`], and the reactor applies
//! the events one at a time, in the order they arrive. Because nothing
//! else holds the [`Dispatcher`], no command handler ever runs
//! concurrently with another and no locks are needed.
//!
//! ```text
//! reader task ──Received/Closed──┐
//! reader task ──Received/Closed──┼──→ Reactor (Dispatcher) ──Outbound──→ writer tasks
//! accept loop ──Accepted─────────┘
//! ```

use bytes::Bytes;
use parley_session::PeerSender;
use parley_transport::ConnectionId;
use tokio::sync::mpsc;

use crate::Dispatcher;

/// Something that happened on a connection.
#[derive(Debug)]
pub enum ReactorEvent {
    /// A new connection was accepted. `outbound` feeds its writer task.
    Accepted {
        id: ConnectionId,
        outbound: PeerSender,
    },

    /// Bytes arrived. They may hold any number of lines, or part of one.
    Received { id: ConnectionId, data: Bytes },

    /// The connection ended (peer closed, read error, or write error).
    Closed { id: ConnectionId },
}

/// Owns the [`Dispatcher`] and drives it from a stream of events.
#[derive(Debug)]
pub struct Reactor {
    dispatcher: Dispatcher,
    events: mpsc::Receiver<ReactorEvent>,
}

impl Reactor {
    /// Creates a reactor and the sender that connection tasks use to
    /// reach it.
    ///
    /// `capacity` bounds the event queue; a reader that gets ahead of the
    /// reactor waits for room instead of buffering without limit.
    pub fn new(capacity: usize) -> (Self, mpsc::Sender<ReactorEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        let reactor = Self {
            dispatcher: Dispatcher::new(),
            events: rx,
        };
        (reactor, tx)
    }

    /// Processes events until every sender has been dropped.
    ///
    /// The only await point is waiting for the next event; everything it
    /// triggers runs to completion first.
    pub async fn run(mut self) {
        tracing::debug!("reactor started");
        while let Some(event) = self.events.recv().await {
            self.handle(event);
        }
        tracing::debug!("reactor stopped");
    }

    /// Applies one event to the chat state.
    pub fn handle(&mut self, event: ReactorEvent) {
        match event {
            ReactorEvent::Accepted { id, outbound } => {
                if let Err(e) = self.dispatcher.connect(id, outbound) {
                    tracing::warn!(conn_id = %id, error = %e, "duplicate connection");
                }
            }
            ReactorEvent::Received { id, data } => {
                self.dispatcher.receive(id, &data);
            }
            ReactorEvent::Closed { id } => {
                self.dispatcher.disconnect(id);
            }
        }
    }

    /// The dispatcher, for inspecting state.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}
