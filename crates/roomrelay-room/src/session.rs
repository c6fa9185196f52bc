//! Session: the relay's record of one connection inside one room.
//!
//! A session lives exactly as long as the membership it describes. It is
//! created by a join, merged into by each state update and dropped on
//! leave or disconnect. Moving to another room drops the old session and
//! starts a new one from the new join's user data, so nothing carries
//! over between rooms.
//!
//! The [`PlayerState`] a session converts into is what other members see
//! in `room-state` and `player-joined`.

use roomrelay_protocol::{ConnectionId, Fields, PlayerState, RoomId, Value};

/// Positional fields every session starts with, all set to 0 on join.
pub const POSITION_KEYS: [&str; 3] = ["x", "y", "z"];

/// Display name used for chat from a connection without a usable
/// `username` field.
pub const ANONYMOUS: &str = "Anonymous";

/// A connection's presence in a room and its last-known state.
///
/// The fields start as the caller's `userData` with `x`, `y` and `z`
/// forced to 0, then absorb every `update-state` by merging. The relay
/// does not validate field types, so `x` may later hold a string if a
/// client sends one.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    connection_id: ConnectionId,
    room_id: RoomId,
    fields: Fields,
}

impl Session {
    pub(crate) fn new(
        connection_id: ConnectionId,
        room_id: RoomId,
        user_data: Fields,
    ) -> Self {
        let mut fields = user_data;
        for key in POSITION_KEYS {
            fields.insert(key, 0.0);
        }
        Self {
            connection_id,
            room_id,
            fields,
        }
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// All fields, `userData` and position alike.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn x(&self) -> Option<f64> {
        self.number("x")
    }

    pub fn y(&self) -> Option<f64> {
        self.number("y")
    }

    pub fn z(&self) -> Option<f64> {
        self.number("z")
    }

    /// The `username` field, if it is a non-empty string.
    pub fn username(&self) -> Option<&str> {
        self.fields
            .get("username")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
    }

    pub(crate) fn merge(&mut self, state: &Fields) {
        self.fields.merge(state);
    }

    /// The wire form: `{connectionId, ...fields}`.
    pub fn to_player_state(&self) -> PlayerState {
        PlayerState {
            connection_id: self.connection_id.clone(),
            fields: self.fields.clone(),
        }
    }

    fn number(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }
}
