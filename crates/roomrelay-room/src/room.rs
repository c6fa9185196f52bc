//! A single room: its members and their outbound channels.
//!
//! A [`Room`] pairs each [`Session`] with the [`Outbox`] of the connection
//! that owns it. It knows nothing about other rooms or about limits; the
//! relay decides who joins and leaves and then calls `dispatch` with a
//! [`Recipient`] to fan an event out.
//!
//! Dispatch clones the event once per recipient and never fails. An
//! outbox whose writer has already gone away is skipped with a debug log,
//! because that connection's leave is already on its way to the relay.

use std::collections::{BTreeMap, HashMap};

use roomrelay_protocol::{ConnectionId, PlayerState, Recipient, RoomId, ServerEvent};
use tokio::sync::mpsc;

use crate::Session;

/// Channel for delivering events to one connection's writer task.
///
/// Unbounded so the relay never waits on a slow client.
pub type Outbox = mpsc::UnboundedSender<ServerEvent>;

struct Member {
    session: Session,
    outbox: Outbox,
}

/// A named group of sessions. Exists only while it has members.
pub struct Room {
    id: RoomId,
    members: HashMap<ConnectionId, Member>,
}

impl Room {
    pub(crate) fn new(id: RoomId) -> Self {
        Self {
            id,
            members: HashMap::new(),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.members.contains_key(connection_id)
    }

    pub fn session(&self, connection_id: &ConnectionId) -> Option<&Session> {
        self.members.get(connection_id).map(|m| &m.session)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.members.values().map(|m| &m.session)
    }

    pub(crate) fn session_mut(
        &mut self,
        connection_id: &ConnectionId,
    ) -> Option<&mut Session> {
        self.members.get_mut(connection_id).map(|m| &mut m.session)
    }

    pub(crate) fn insert(&mut self, session: Session, outbox: Outbox) {
        self.members.insert(
            session.connection_id().clone(),
            Member { session, outbox },
        );
    }

    pub(crate) fn remove(&mut self, connection_id: &ConnectionId) -> Option<Session> {
        self.members.remove(connection_id).map(|m| m.session)
    }

    /// Every member's state, keyed by connection id.
    pub fn snapshot(&self) -> BTreeMap<ConnectionId, PlayerState> {
        self.members
            .iter()
            .map(|(id, m)| (id.clone(), m.session.to_player_state()))
            .collect()
    }

    /// Queues `event` for every member matched by `recipient`.
    ///
    /// Members whose connection has already gone away are skipped. Returns
    /// how many outboxes accepted the event.
    pub(crate) fn dispatch(&self, recipient: &Recipient, event: ServerEvent) -> usize {
        let mut delivered = 0;
        for (id, member) in &self.members {
            if !recipient.includes(id) {
                continue;
            }
            if member.outbox.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(
                    room_id = %self.id,
                    connection_id = %id,
                    event = event.name(),
                    "outbox closed, dropping event"
                );
            }
        }
        delivered
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("members", &self.members.len())
            .finish()
    }
}
