//! Per-connection handler: reads client events and feeds them to the relay.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task that drains the connection's outbox:
//!
//! ```text
//!   socket ──recv──→ read_events ──RelayCommand──→ relay actor
//!                                                     │
//!   socket ←─send─── write_events ←──ServerEvent── outbox
//! ```
//!
//! Replies produced by the handler itself (errors, heartbeat acks) go
//! through the same outbox, so the peer sees one ordered stream.

use std::sync::Arc;
use std::time::Duration;

use roomrelay_protocol::{ClientEvent, Codec, ConnectionId, ServerEvent};
use roomrelay_room::{unix_millis, Outbox, RelayError, RelayHandle};
use roomrelay_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::server::ServerState;
use crate::RoomRelayError;

/// How long the writer may keep flushing queued events after the reader
/// has finished. A peer that stopped reading would otherwise keep it
/// parked in `send` forever.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Drop guard that removes the connection's session when the handler exits.
///
/// Runs on clean close, error, idle timeout and panic alike. `Drop` is
/// synchronous, so the leave is queued without waiting for it.
struct LeaveGuard {
    connection_id: ConnectionId,
    relay: RelayHandle,
}

impl Drop for LeaveGuard {
    fn drop(&mut self) {
        self.relay.leave_detached(self.connection_id.clone());
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), RoomRelayError> {
    let conn = Arc::new(conn);
    let connection_id = conn.id().clone();
    tracing::info!(%connection_id, peer = %conn.peer_addr(), "client connected");

    let (outbox, events) = mpsc::unbounded_channel();
    let mut writer = tokio::spawn(write_events(Arc::clone(&conn), events, Arc::clone(&state)));

    let guard = LeaveGuard {
        connection_id: connection_id.clone(),
        relay: state.relay.clone(),
    };

    let result = read_events(&conn, &state, &connection_id, &outbox).await;

    // The writer ends once the relay drops its copy of the outbox. If it is
    // stuck on a full socket instead, abort it so the sink is released.
    drop(guard);
    drop(outbox);
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        tracing::debug!(%connection_id, "writer still busy, aborting");
        writer.abort();
    }
    let _ = conn.close().await;
    tracing::info!(%connection_id, "client disconnected");
    result
}

async fn read_events<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    connection_id: &ConnectionId,
    outbox: &Outbox,
) -> Result<(), RoomRelayError> {
    loop {
        let data = match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::debug!(%connection_id, "connection closed cleanly");
                return Ok(());
            }
            Ok(Err(e)) => {
                tracing::debug!(%connection_id, error = %e, "recv error");
                return Err(e.into());
            }
            Err(_) => {
                tracing::info!(%connection_id, "connection idle, closing");
                return Ok(());
            }
        };

        let event: ClientEvent = match state.codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(%connection_id, error = %e, "failed to decode event");
                send_error(outbox, 400, format!("invalid message: {e}"));
                continue;
            }
        };

        tracing::trace!(%connection_id, event = event.name(), "event received");
        dispatch(state, connection_id, outbox, event).await?;
    }
}

/// Routes one client event to the relay.
///
/// Fails only if the relay has stopped, which ends the connection.
async fn dispatch<C: Codec>(
    state: &ServerState<C>,
    connection_id: &ConnectionId,
    outbox: &Outbox,
    event: ClientEvent,
) -> Result<(), RoomRelayError> {
    match event {
        ClientEvent::JoinRoom { room_id, user_data } => {
            let result = state
                .relay
                .join(connection_id.clone(), room_id.clone(), user_data, outbox.clone())
                .await;
            match result {
                Ok(()) => {}
                Err(RelayError::Unavailable) => return Err(RelayError::Unavailable.into()),
                Err(e) => {
                    tracing::warn!(%connection_id, %room_id, error = %e, "join rejected");
                    send_error(outbox, e.code(), e.to_string());
                }
            }
        }

        ClientEvent::UpdateState { room_id, state: fields } => {
            state
                .relay
                .update_state(connection_id.clone(), room_id, fields)
                .await?;
        }

        ClientEvent::ChatMessage { room_id, message } => {
            state
                .relay
                .broadcast_chat(connection_id.clone(), room_id, message)
                .await?;
        }

        ClientEvent::LeaveRoom => {
            if state.relay.leave(connection_id.clone()).await?.is_none() {
                tracing::debug!(%connection_id, "leave without a room, ignoring");
            }
        }

        ClientEvent::Heartbeat { client_time } => {
            let _ = outbox.send(ServerEvent::HeartbeatAck {
                client_time,
                server_time: unix_millis(),
            });
        }
    }
    Ok(())
}

/// Drains the outbox into the socket until the outbox closes or a send
/// fails.
async fn write_events<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut events: mpsc::UnboundedReceiver<ServerEvent>,
    state: Arc<ServerState<C>>,
) {
    while let Some(event) = events.recv().await {
        let bytes = match state.codec.encode(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(event = event.name(), error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(connection_id = %conn.id(), error = %e, "send failed, stopping writer");
            break;
        }
    }
}

/// Queues an `error` event for the connection. Best effort.
fn send_error(outbox: &Outbox, code: u16, message: impl Into<String>) {
    let _ = outbox.send(ServerEvent::Error {
        code,
        message: message.into(),
    });
}
