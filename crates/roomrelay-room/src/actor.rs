//! Relay actor: a Tokio task that owns the [`RoomRelay`] and applies
//! commands one at a time.
//!
//! Connection handlers never touch relay state directly. They hold a
//! [`RelayHandle`] and send commands through a bounded channel, so
//! operations are serialized in arrival order without locks.

use std::collections::BTreeMap;

use roomrelay_protocol::{ConnectionId, Fields, RoomId};
use tokio::sync::{mpsc, oneshot};

use crate::{Outbox, RelayConfig, RelayError, RoomRelay, Session};

/// Commands sent to the relay actor.
pub(crate) enum RelayCommand {
    Join {
        connection_id: ConnectionId,
        room_id: RoomId,
        user_data: Fields,
        outbox: Outbox,
        reply: oneshot::Sender<Result<(), RelayError>>,
    },

    UpdateState {
        connection_id: ConnectionId,
        room_id: RoomId,
        state: Fields,
    },

    Chat {
        connection_id: ConnectionId,
        room_id: RoomId,
        message: String,
    },

    Leave {
        connection_id: ConnectionId,
        reply: Option<oneshot::Sender<Option<RoomId>>>,
    },

    Stats {
        reply: oneshot::Sender<RelayStats>,
    },

    Snapshot {
        room_id: RoomId,
        reply: oneshot::Sender<Option<RoomSnapshot>>,
    },

    Shutdown,
}

/// Counts of live rooms and sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub rooms: usize,
    pub sessions: usize,
}

/// A copy of one room's sessions, keyed by connection id.
pub type RoomSnapshot = BTreeMap<ConnectionId, Session>;

/// Handle to the running relay actor.
///
/// Cheap to clone. Every method fails with [`RelayError::Unavailable`]
/// once the actor has stopped.
#[derive(Clone)]
pub struct RelayHandle {
    sender: mpsc::Sender<RelayCommand>,
}

impl RelayHandle {
    /// Joins `room_id`, waiting for the outcome.
    ///
    /// Events for this connection are delivered to `outbox` until it
    /// leaves or joins another room.
    pub async fn join(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
        user_data: Fields,
        outbox: Outbox,
    ) -> Result<(), RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RelayCommand::Join {
            connection_id,
            room_id,
            user_data,
            outbox,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RelayError::Unavailable)?
    }

    /// Queues a state update (fire-and-forget).
    pub async fn update_state(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
        state: Fields,
    ) -> Result<(), RelayError> {
        self.send(RelayCommand::UpdateState {
            connection_id,
            room_id,
            state,
        })
        .await
    }

    /// Queues a chat message (fire-and-forget).
    pub async fn broadcast_chat(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
        message: String,
    ) -> Result<(), RelayError> {
        self.send(RelayCommand::Chat {
            connection_id,
            room_id,
            message,
        })
        .await
    }

    /// Leaves the current room, returning which room that was.
    pub async fn leave(
        &self,
        connection_id: ConnectionId,
    ) -> Result<Option<RoomId>, RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RelayCommand::Leave {
            connection_id,
            reply: Some(reply_tx),
        })
        .await?;
        reply_rx.await.map_err(|_| RelayError::Unavailable)
    }

    /// Queues a leave without waiting.
    ///
    /// Usable from synchronous code such as `Drop`. Falls back to a
    /// spawned send when the command queue is full.
    pub fn leave_detached(&self, connection_id: ConnectionId) {
        let command = RelayCommand::Leave {
            connection_id,
            reply: None,
        };
        match self.sender.try_send(command) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(command)) => {
                let sender = self.sender.clone();
                if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                    runtime.spawn(async move {
                        let _ = sender.send(command).await;
                    });
                }
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    pub async fn stats(&self) -> Result<RelayStats, RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RelayCommand::Stats { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| RelayError::Unavailable)
    }

    /// Sessions of one room, or `None` if it does not exist.
    pub async fn room_snapshot(
        &self,
        room_id: RoomId,
    ) -> Result<Option<RoomSnapshot>, RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RelayCommand::Snapshot {
            room_id,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RelayError::Unavailable)
    }

    /// Stops the actor. Pending commands queued before this one still run.
    pub async fn shutdown(&self) -> Result<(), RelayError> {
        self.send(RelayCommand::Shutdown).await
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn send(&self, command: RelayCommand) -> Result<(), RelayError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| RelayError::Unavailable)
    }
}

struct RelayActor {
    relay: RoomRelay,
    receiver: mpsc::Receiver<RelayCommand>,
}

impl RelayActor {
    async fn run(mut self) {
        tracing::info!("relay actor started");

        while let Some(command) = self.receiver.recv().await {
            match command {
                RelayCommand::Join {
                    connection_id,
                    room_id,
                    user_data,
                    outbox,
                    reply,
                } => {
                    let result = self.relay.join(connection_id, room_id, user_data, outbox);
                    let _ = reply.send(result);
                }
                RelayCommand::UpdateState {
                    connection_id,
                    room_id,
                    state,
                } => {
                    self.relay.update_state(&connection_id, &room_id, state);
                }
                RelayCommand::Chat {
                    connection_id,
                    room_id,
                    message,
                } => {
                    self.relay.broadcast_chat(&connection_id, &room_id, message);
                }
                RelayCommand::Leave {
                    connection_id,
                    reply,
                } => {
                    let left = self.relay.leave(&connection_id);
                    if let Some(reply) = reply {
                        let _ = reply.send(left);
                    }
                }
                RelayCommand::Stats { reply } => {
                    let _ = reply.send(RelayStats {
                        rooms: self.relay.room_count(),
                        sessions: self.relay.session_count(),
                    });
                }
                RelayCommand::Snapshot { room_id, reply } => {
                    let snapshot = self.relay.room(&room_id).map(|room| {
                        room.sessions()
                            .map(|s| (s.connection_id().clone(), s.clone()))
                            .collect()
                    });
                    let _ = reply.send(snapshot);
                }
                RelayCommand::Shutdown => {
                    tracing::info!(
                        rooms = self.relay.room_count(),
                        sessions = self.relay.session_count(),
                        "relay shutting down"
                    );
                    break;
                }
            }
        }

        tracing::info!("relay actor stopped");
    }
}

/// Spawns the relay actor and returns a handle to it.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_relay(config: RelayConfig) -> RelayHandle {
    let config = config.validated();
    let (tx, rx) = mpsc::channel(config.command_buffer);

    let actor = RelayActor {
        relay: RoomRelay::new(config),
        receiver: rx,
    };
    tokio::spawn(actor.run());

    RelayHandle { sender: tx }
}
