//! Events that travel on the wire between clients and the relay.
//!
//! Both directions use adjacently tagged JSON:
//!
//! ```text
//! {"event": "join-room", "data": {"roomId": "lobby", "userData": {"username": "ana"}}}
//! {"event": "player-left", "data": "aB3dE5fG7hJ9kL1mN3pQ"}
//! ```
//!
//! Event names are kebab-case and payload fields are camelCase, which is
//! what JavaScript clients emit without any mapping layer.

use std::collections::BTreeMap;
use std::fmt;

use roomrelay_transport::ConnectionId;
use serde::{Deserialize, Serialize};

use crate::Fields;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A caller-chosen room name.
///
/// Any string is representable; the relay rejects empty ones on join.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who in a room should receive an outbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every member, the sender included.
    All,
    /// One member only.
    Connection(ConnectionId),
    /// Every member except the given one.
    AllExcept(ConnectionId),
}

impl Recipient {
    /// Returns `true` if `connection_id` is covered by this recipient set.
    pub fn includes(&self, connection_id: &ConnectionId) -> bool {
        match self {
            Self::All => true,
            Self::Connection(target) => target == connection_id,
            Self::AllExcept(excluded) => excluded != connection_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Player payloads
// ---------------------------------------------------------------------------

/// A connection's fields, tagged with its id.
///
/// Flattened on the wire, so `PlayerState { connection_id: "c1", fields:
/// {username: "ana", x: 0} }` becomes
/// `{"connectionId": "c1", "username": "ana", "x": 0.0}`. Used for
/// `room-state` entries, `player-joined` and `player-update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    #[serde(rename = "connectionId")]
    pub connection_id: ConnectionId,

    #[serde(flatten)]
    pub fields: Fields,
}

// ---------------------------------------------------------------------------
// Client → relay
// ---------------------------------------------------------------------------

/// Events a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Enter `room_id`, announcing `user_data` to its members.
    JoinRoom {
        room_id: RoomId,
        #[serde(default)]
        user_data: Fields,
    },

    /// Merge `state` into this connection's session in `room_id`.
    UpdateState {
        room_id: RoomId,
        #[serde(default)]
        state: Fields,
    },

    /// Say something to everyone in `room_id`.
    ChatMessage { room_id: RoomId, message: String },

    /// Leave the current room without disconnecting.
    LeaveRoom,

    /// Keep-alive ping; echoed back as `heartbeat-ack`. `client_time` is
    /// whatever clock the client uses, often `performance.now()`, so it
    /// may be fractional.
    Heartbeat { client_time: f64 },
}

impl ClientEvent {
    /// The wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join-room",
            Self::UpdateState { .. } => "update-state",
            Self::ChatMessage { .. } => "chat-message",
            Self::LeaveRoom => "leave-room",
            Self::Heartbeat { .. } => "heartbeat",
        }
    }
}

// ---------------------------------------------------------------------------
// Relay → client
// ---------------------------------------------------------------------------

/// Events the relay sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Full membership of the room just joined, keyed by connection id.
    /// Sent only to the joining connection.
    RoomState(BTreeMap<ConnectionId, PlayerState>),

    /// Someone else entered the room: their id plus `userData`.
    PlayerJoined(PlayerState),

    /// Someone else changed state: their id plus the changed fields only.
    PlayerUpdate(PlayerState),

    /// Someone left the room. The payload is the bare connection id.
    PlayerLeft(ConnectionId),

    /// A chat line, delivered to the whole room including its author.
    ChatMessage {
        connection_id: ConnectionId,
        username: String,
        message: String,
        /// Server wall-clock time, milliseconds since the Unix epoch.
        timestamp: u64,
    },

    /// Reply to `heartbeat`. `client_time` is echoed unchanged;
    /// `server_time` is milliseconds since the Unix epoch.
    HeartbeatAck { client_time: f64, server_time: u64 },

    /// The last client event was rejected. `code` follows HTTP
    /// conventions (400 malformed, 409 conflict, 503 limits reached).
    Error { code: u16, message: String },
}

impl ServerEvent {
    /// The wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomState(_) => "room-state",
            Self::PlayerJoined(_) => "player-joined",
            Self::PlayerUpdate(_) => "player-update",
            Self::PlayerLeft(_) => "player-left",
            Self::ChatMessage { .. } => "chat-message",
            Self::HeartbeatAck { .. } => "heartbeat-ack",
            Self::Error { .. } => "error",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! These pin the exact JSON shapes. Browser clients parse these
    //! frames by hand, so a renamed field is a breaking change.

    use serde_json::json;

    use super::*;
    use crate::Value;

    fn conn(id: &str) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn player(id: &str, fields: &[(&str, Value)]) -> PlayerState {
        PlayerState {
            connection_id: conn(id),
            fields: fields.iter().cloned().collect(),
        }
    }

    // =====================================================================
    // Identity and recipients
    // =====================================================================

    #[test]
    fn test_room_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&RoomId::new("lobby")).unwrap();
        assert_eq!(json, "\"lobby\"");
        assert!(RoomId::new("").is_empty());
    }

    #[test]
    fn test_recipient_includes() {
        let a = conn("a");
        let b = conn("b");
        assert!(Recipient::All.includes(&a));
        assert!(Recipient::Connection(a.clone()).includes(&a));
        assert!(!Recipient::Connection(a.clone()).includes(&b));
        assert!(!Recipient::AllExcept(a.clone()).includes(&a));
        assert!(Recipient::AllExcept(a).includes(&b));
    }

    // =====================================================================
    // Client events
    // =====================================================================

    #[test]
    fn test_join_room_decodes_camel_case_payload() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "join-room",
            "data": { "roomId": "lobby", "userData": { "username": "ana", "color": "red" } }
        }))
        .unwrap();

        match event {
            ClientEvent::JoinRoom { room_id, user_data } => {
                assert_eq!(room_id, RoomId::new("lobby"));
                assert_eq!(user_data.get("username"), Some(&Value::from("ana")));
                assert_eq!(user_data.len(), 2);
            }
            other => panic!("expected JoinRoom, got {other:?}"),
        }
    }

    #[test]
    fn test_join_room_user_data_defaults_to_empty() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "join-room",
            "data": { "roomId": "lobby" }
        }))
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinRoom {
                room_id: RoomId::new("lobby"),
                user_data: Fields::new(),
            }
        );
    }

    #[test]
    fn test_join_room_missing_room_id_is_rejected() {
        let result = serde_json::from_value::<ClientEvent>(json!({
            "event": "join-room",
            "data": { "userData": {} }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_join_room_non_object_user_data_is_rejected() {
        let result = serde_json::from_value::<ClientEvent>(json!({
            "event": "join-room",
            "data": { "roomId": "lobby", "userData": "ana" }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_update_state_decodes_numbers() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "update-state",
            "data": { "roomId": "r", "state": { "x": 5, "y": -1.5 } }
        }))
        .unwrap();
        match event {
            ClientEvent::UpdateState { state, .. } => {
                assert_eq!(state.get("x"), Some(&Value::Number(5.0)));
                assert_eq!(state.get("y"), Some(&Value::Number(-1.5)));
            }
            other => panic!("expected UpdateState, got {other:?}"),
        }
    }

    #[test]
    fn test_update_state_non_object_state_is_rejected() {
        let result = serde_json::from_value::<ClientEvent>(json!({
            "event": "update-state",
            "data": { "roomId": "r", "state": [1, 2] }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_chat_message_decodes() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "chat-message",
            "data": { "roomId": "r", "message": "hi" }
        }))
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::ChatMessage {
                room_id: RoomId::new("r"),
                message: "hi".into(),
            }
        );
        assert_eq!(event.name(), "chat-message");
    }

    #[test]
    fn test_leave_room_decodes_without_data() {
        let event: ClientEvent =
            serde_json::from_value(json!({ "event": "leave-room" })).unwrap();
        assert_eq!(event, ClientEvent::LeaveRoom);
    }

    #[test]
    fn test_heartbeat_decodes() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "heartbeat",
            "data": { "clientTime": 1234 }
        }))
        .unwrap();
        assert_eq!(event, ClientEvent::Heartbeat { client_time: 1234.0 });
    }

    #[test]
    fn test_heartbeat_accepts_fractional_time() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "heartbeat",
            "data": { "clientTime": 1234.5 }
        }))
        .unwrap();
        assert_eq!(event, ClientEvent::Heartbeat { client_time: 1234.5 });
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let result = serde_json::from_value::<ClientEvent>(json!({
            "event": "fly-to-moon",
            "data": {}
        }));
        assert!(result.is_err());
    }

    // =====================================================================
    // Server events
    // =====================================================================

    #[test]
    fn test_player_joined_is_flat() {
        let event = ServerEvent::PlayerJoined(player(
            "c2",
            &[("username", Value::from("bo"))],
        ));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            json!({
                "event": "player-joined",
                "data": { "connectionId": "c2", "username": "bo" }
            })
        );
    }

    #[test]
    fn test_player_update_carries_only_changed_fields() {
        let event =
            ServerEvent::PlayerUpdate(player("c1", &[("x", Value::from(5))]));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "player-update");
        assert_eq!(json["data"]["connectionId"], "c1");
        assert_eq!(json["data"]["x"], 5.0);
        assert_eq!(json["data"].as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_player_left_payload_is_bare_id() {
        let json =
            serde_json::to_value(ServerEvent::PlayerLeft(conn("c1"))).unwrap();
        assert_eq!(json, json!({ "event": "player-left", "data": "c1" }));
    }

    #[test]
    fn test_room_state_is_keyed_by_connection_id() {
        let mut members = BTreeMap::new();
        members.insert(
            conn("c1"),
            player("c1", &[("username", Value::from("ana")), ("x", Value::from(0))]),
        );
        members.insert(conn("c2"), player("c2", &[]));

        let json = serde_json::to_value(ServerEvent::RoomState(members)).unwrap();

        assert_eq!(json["event"], "room-state");
        assert_eq!(json["data"]["c1"]["connectionId"], "c1");
        assert_eq!(json["data"]["c1"]["username"], "ana");
        assert_eq!(json["data"]["c2"], json!({ "connectionId": "c2" }));
    }

    #[test]
    fn test_chat_message_json_format() {
        let event = ServerEvent::ChatMessage {
            connection_id: conn("c1"),
            username: "ana".into(),
            message: "hi".into(),
            timestamp: 1_700_000_000_000,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            json!({
                "event": "chat-message",
                "data": {
                    "connectionId": "c1",
                    "username": "ana",
                    "message": "hi",
                    "timestamp": 1_700_000_000_000u64
                }
            })
        );
    }

    #[test]
    fn test_error_json_format() {
        let json = serde_json::to_value(ServerEvent::Error {
            code: 400,
            message: "bad".into(),
        })
        .unwrap();
        assert_eq!(
            json,
            json!({ "event": "error", "data": { "code": 400, "message": "bad" } })
        );
    }

    #[test]
    fn test_heartbeat_ack_json_format() {
        let json = serde_json::to_value(ServerEvent::HeartbeatAck {
            client_time: 10.25,
            server_time: 20,
        })
        .unwrap();
        assert_eq!(json["data"]["clientTime"], 10.25);
        assert_eq!(json["data"]["serverTime"], 20);
    }

    #[test]
    fn test_player_state_decodes_back_from_flat_json() {
        // Clients (and our own end-to-end tests) read these back.
        let state: PlayerState = serde_json::from_value(json!({
            "connectionId": "c9",
            "username": "zed",
            "x": 1.5
        }))
        .unwrap();
        assert_eq!(state.connection_id, conn("c9"));
        assert_eq!(state.fields.get("x"), Some(&Value::Number(1.5)));
        assert!(!state.fields.contains_key("connectionId"));
    }
}
