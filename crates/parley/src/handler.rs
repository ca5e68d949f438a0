//! Per-connection I/O pumps.
//!
//! Each accepted connection gets two Tokio tasks:
//!   1. a reader that forwards every chunk it receives to the reactor,
//!      then reports `Closed` when the peer goes away
//!   2. a writer that encodes the session's outbound messages and sends
//!      them, closing the connection on `Outbound::Close`
//!
//! Neither task looks at the content; all chat logic lives in the reactor.

use std::sync::Arc;

use parley_protocol::Codec;
use parley_session::Outbound;
use parley_transport::{Connection, ConnectionId};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::ReactorEvent;

/// Announces `conn` to the reactor and starts its reader and writer.
///
/// At most `outbound_capacity` messages wait for the writer.
pub(crate) async fn handle_connection<K, C>(
    conn: K,
    codec: Arc<C>,
    events: mpsc::Sender<ReactorEvent>,
    outbound_capacity: usize,
) where
    K: Connection,
    C: Codec,
{
    let id = conn.id();
    let conn = Arc::new(conn);
    let (outbound, outbound_rx) = mpsc::channel(outbound_capacity);

    if events
        .send(ReactorEvent::Accepted { id, outbound })
        .await
        .is_err()
    {
        tracing::warn!(conn_id = %id, "reactor gone, dropping connection");
        return;
    }

    let reader = tokio::spawn(read_loop(Arc::clone(&conn), events.clone()));
    tokio::spawn(write_loop(conn, codec, outbound_rx, events, reader.abort_handle()));
}

/// Forwards received bytes until the connection ends.
async fn read_loop<K: Connection>(conn: Arc<K>, events: mpsc::Sender<ReactorEvent>) {
    let id = conn.id();
    loop {
        match conn.recv().await {
            Ok(Some(data)) => {
                tracing::trace!(conn_id = %id, bytes = data.len(), "read");
                if events.send(ReactorEvent::Received { id, data }).await.is_err() {
                    return;
                }
            }
            Ok(None) => {
                tracing::debug!(conn_id = %id, "peer closed connection");
                break;
            }
            Err(e) => {
                tracing::debug!(conn_id = %id, error = %e, "recv error");
                break;
            }
        }
    }
    let _ = events.send(ReactorEvent::Closed { id }).await;
}

/// Sends outbound messages until told to close, or until the session
/// drops its sender.
async fn write_loop<K, C>(
    conn: Arc<K>,
    codec: Arc<C>,
    mut outbound: mpsc::Receiver<Outbound>,
    events: mpsc::Sender<ReactorEvent>,
    reader: AbortHandle,
) where
    K: Connection,
    C: Codec,
{
    let id = conn.id();
    while let Some(item) = outbound.recv().await {
        let message = match item {
            Outbound::Message(message) => message,
            Outbound::Close => break,
        };

        let bytes = match codec.encode(&message) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(conn_id = %id, error = %e, "failed to encode message");
                continue;
            }
        };

        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(conn_id = %id, error = %e, "send error");
            report_closed(&events, id).await;
            break;
        }
    }

    // The session is gone (or going); stop reading and hang up.
    reader.abort();
    if let Err(e) = conn.close().await {
        tracing::debug!(conn_id = %id, error = %e, "close error");
    }
    tracing::debug!(conn_id = %id, "connection closed");
}

async fn report_closed(events: &mpsc::Sender<ReactorEvent>, id: ConnectionId) {
    let _ = events.send(ReactorEvent::Closed { id }).await;
}
