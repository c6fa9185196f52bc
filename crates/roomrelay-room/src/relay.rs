//! The relay: creates and destroys rooms, tracks which connection is in
//! which room, and fans events out to members.
//!
//! # Room lifecycle
//!
//! There is no explicit "create room" operation. The first `join` naming
//! a room id creates it, and the `leave` that removes its last session
//! destroys it. A later join with the same id starts a fresh room with no
//! memory of earlier members.
//!
//! # Delivery
//!
//! Each operation decides its recipients up front:
//!
//! | operation        | recipients                                          |
//! |------------------|-----------------------------------------------------|
//! | `join`           | others get `player-joined`, joiner gets `room-state` |
//! | `update_state`   | every member except the sender                      |
//! | `broadcast_chat` | every member, the sender included                   |
//! | `leave`          | members remaining after the removal                 |
//!
//! Events are pushed onto each member's [`Outbox`] before the method
//! returns. Since the relay is driven by a single task, two events
//! queued for the same member always arrive in the order the operations
//! were applied. Nothing is ordered across different members.
//!
//! Methods never await. A full socket only grows that connection's
//! outbox; it never stalls the relay or the other members.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use roomrelay_protocol::{ConnectionId, Fields, PlayerState, Recipient, RoomId, ServerEvent};

use crate::session::ANONYMOUS;
use crate::{Outbox, RejoinPolicy, RelayConfig, RelayError, Room, Session};

/// Milliseconds since the Unix epoch, or 0 if the clock is before it.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Room registry and broadcast logic.
///
/// Every method runs to completion without awaiting, so a caller that owns
/// the relay exclusively (see [`spawn_relay`](crate::spawn_relay)) gets
/// each operation applied atomically and in arrival order.
///
/// Invariants held between calls:
/// - every room has at least one session
/// - a connection has at most one session across all rooms
/// - `connection_rooms` agrees with room membership
#[derive(Debug, Default)]
pub struct RoomRelay {
    rooms: HashMap<RoomId, Room>,

    /// Which room each connection is in.
    connection_rooms: HashMap<ConnectionId, RoomId>,

    config: RelayConfig,
}

impl RoomRelay {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            connection_rooms: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Adds a connection to a room, creating the room if needed.
    ///
    /// On success the other members receive `player-joined` with the
    /// caller's `user_data`, then the joiner receives `room-state` listing
    /// every member including itself. A connection already in a room is
    /// handled per [`RejoinPolicy`]. Limits are checked before any
    /// membership changes, so a refused join leaves everything as it was.
    pub fn join(
        &mut self,
        connection_id: ConnectionId,
        room_id: RoomId,
        mut user_data: Fields,
        outbox: Outbox,
    ) -> Result<(), RelayError> {
        if room_id.is_empty() {
            return Err(RelayError::InvalidRoomId);
        }

        let previous = self.connection_rooms.get(&connection_id).cloned();
        if let Some(current) = &previous {
            if self.config.rejoin_policy == RejoinPolicy::Reject {
                return Err(RelayError::AlreadyInRoom(connection_id, current.clone()));
            }
        }
        self.check_limits(&room_id, previous.as_ref())?;

        if user_data.strip_reserved() {
            tracing::debug!(%connection_id, "dropped reserved key from user data");
        }

        if previous.is_some() {
            self.leave(&connection_id);
        }

        let room = self.rooms.entry(room_id.clone()).or_insert_with(|| {
            tracing::info!(%room_id, "room created");
            Room::new(room_id.clone())
        });

        let joined = ServerEvent::PlayerJoined(PlayerState {
            connection_id: connection_id.clone(),
            fields: user_data.clone(),
        });
        room.insert(
            Session::new(connection_id.clone(), room_id.clone(), user_data),
            outbox,
        );
        room.dispatch(&Recipient::AllExcept(connection_id.clone()), joined);
        room.dispatch(
            &Recipient::Connection(connection_id.clone()),
            ServerEvent::RoomState(room.snapshot()),
        );

        tracing::info!(
            %room_id,
            %connection_id,
            sessions = room.len(),
            "connection joined room"
        );
        self.connection_rooms.insert(connection_id, room_id);
        Ok(())
    }

    fn check_limits(
        &self,
        room_id: &RoomId,
        previous: Option<&RoomId>,
    ) -> Result<(), RelayError> {
        match self.rooms.get(room_id) {
            Some(room) => {
                if let Some(max) = self.config.max_sessions_per_room {
                    // A re-entry frees its own slot first.
                    let occupied = room.len() - usize::from(previous == Some(room_id));
                    if occupied >= max {
                        return Err(RelayError::RoomFull(room_id.clone()));
                    }
                }
            }
            None => {
                if let Some(max) = self.config.max_rooms {
                    // Leaving a room as its last member frees a slot.
                    let frees_room = previous
                        .and_then(|prev| self.rooms.get(prev))
                        .is_some_and(|prev| prev.len() == 1);
                    let alive = self.rooms.len() - usize::from(frees_room);
                    if alive >= max {
                        return Err(RelayError::TooManyRooms(room_id.clone()));
                    }
                }
            }
        }
        Ok(())
    }

    /// Merges `state` into the caller's session and forwards it to the
    /// other members as `player-update`.
    ///
    /// Returns `false` without side effects if the room does not exist or
    /// the caller has no session in it.
    pub fn update_state(
        &mut self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
        mut state: Fields,
    ) -> bool {
        let Some(room) = self.rooms.get_mut(room_id) else {
            tracing::debug!(%connection_id, %room_id, "update for unknown room, ignoring");
            return false;
        };
        state.strip_reserved();
        let Some(session) = room.session_mut(connection_id) else {
            tracing::debug!(%connection_id, %room_id, "update from non-member, ignoring");
            return false;
        };
        session.merge(&state);

        room.dispatch(
            &Recipient::AllExcept(connection_id.clone()),
            ServerEvent::PlayerUpdate(PlayerState {
                connection_id: connection_id.clone(),
                fields: state,
            }),
        );
        true
    }

    /// Removes the connection's session, notifies the rest of its room
    /// with `player-left`, and destroys the room if it is now empty.
    ///
    /// Returns the room that was left, or `None` if the connection had no
    /// session. Calling it twice is harmless.
    pub fn leave(&mut self, connection_id: &ConnectionId) -> Option<RoomId> {
        let room_id = self.connection_rooms.remove(connection_id)?;
        let Some(room) = self.rooms.get_mut(&room_id) else {
            tracing::warn!(%connection_id, %room_id, "indexed room missing on leave");
            return None;
        };
        room.remove(connection_id);
        room.dispatch(
            &Recipient::All,
            ServerEvent::PlayerLeft(connection_id.clone()),
        );

        tracing::info!(
            %room_id,
            %connection_id,
            sessions = room.len(),
            "connection left room"
        );
        if room.is_empty() {
            self.rooms.remove(&room_id);
            tracing::info!(%room_id, "room destroyed");
        }
        Some(room_id)
    }

    /// Sends a chat message to every member of `room_id`, the sender
    /// included.
    ///
    /// The sender need not be a member. Its name comes from the
    /// `username` field of its session in that room, falling back to
    /// `"Anonymous"`. Returns `false` if the room does not exist.
    pub fn broadcast_chat(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
        message: String,
    ) -> bool {
        let Some(room) = self.rooms.get(room_id) else {
            tracing::debug!(%connection_id, %room_id, "chat for unknown room, dropping");
            return false;
        };
        let username = room
            .session(connection_id)
            .and_then(Session::username)
            .unwrap_or(ANONYMOUS)
            .to_owned();

        let delivered = room.dispatch(
            &Recipient::All,
            ServerEvent::ChatMessage {
                connection_id: connection_id.clone(),
                username,
                message,
                timestamp: unix_millis(),
            },
        );
        tracing::debug!(%room_id, %connection_id, delivered, "chat relayed");
        true
    }

    pub fn room(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    /// The room a connection is currently in.
    pub fn room_of(&self, connection_id: &ConnectionId) -> Option<&RoomId> {
        self.connection_rooms.get(connection_id)
    }

    pub fn session(&self, connection_id: &ConnectionId) -> Option<&Session> {
        let room_id = self.connection_rooms.get(connection_id)?;
        self.rooms.get(room_id)?.session(connection_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn session_count(&self) -> usize {
        self.connection_rooms.len()
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn outbox() -> Outbox {
        mpsc::unbounded_channel().0
    }

    #[test]
    fn test_unix_millis_is_after_2020() {
        assert!(unix_millis() > 1_577_836_800_000);
    }

    #[test]
    fn test_index_tracks_membership() {
        let mut relay = RoomRelay::default();
        let a = ConnectionId::new("a");
        relay.join(a.clone(), RoomId::new("r1"), Fields::new(), outbox()).unwrap();
        assert_eq!(relay.room_of(&a), Some(&RoomId::new("r1")));

        relay.join(a.clone(), RoomId::new("r2"), Fields::new(), outbox()).unwrap();
        assert_eq!(relay.room_of(&a), Some(&RoomId::new("r2")));
        assert!(relay.room(&RoomId::new("r1")).is_none());
        assert_eq!(relay.session_count(), 1);

        assert_eq!(relay.leave(&a), Some(RoomId::new("r2")));
        assert_eq!(relay.leave(&a), None);
        assert_eq!(relay.room_count(), 0);
    }

    #[test]
    fn test_room_limit_counts_room_freed_by_move() {
        let mut relay = RoomRelay::new(RelayConfig {
            max_rooms: Some(1),
            ..RelayConfig::default()
        });
        let a = ConnectionId::new("a");
        relay.join(a.clone(), RoomId::new("r1"), Fields::new(), outbox()).unwrap();
        relay.join(a.clone(), RoomId::new("r2"), Fields::new(), outbox()).unwrap();
        assert_eq!(relay.room_ids(), vec![RoomId::new("r2")]);
    }

    #[test]
    fn test_room_full_allows_reentry_of_member() {
        let mut relay = RoomRelay::new(RelayConfig {
            max_sessions_per_room: Some(1),
            ..RelayConfig::default()
        });
        let a = ConnectionId::new("a");
        let r = RoomId::new("r");
        relay.join(a.clone(), r.clone(), Fields::new(), outbox()).unwrap();
        relay.join(a.clone(), r.clone(), Fields::new(), outbox()).unwrap();
        assert_eq!(
            relay.join(ConnectionId::new("b"), r.clone(), Fields::new(), outbox()),
            Err(RelayError::RoomFull(r))
        );
    }
}
