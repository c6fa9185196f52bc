//! Error types for the relay.

use roomrelay_protocol::{ConnectionId, RoomId};

/// Reasons a relay operation is refused.
///
/// Only joins can fail on well-formed input. Updates, chat and leaves for
/// connections without a session are silent no-ops, not errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// The room id is empty.
    #[error("room id must not be empty")]
    InvalidRoomId,

    /// The connection already has a session and the relay is configured
    /// with [`RejoinPolicy::Reject`](crate::RejoinPolicy::Reject).
    #[error("connection {0} is already in room {1}")]
    AlreadyInRoom(ConnectionId, RoomId),

    /// The room has reached `max_sessions_per_room`.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// Creating another room would exceed `max_rooms`.
    #[error("room limit reached, cannot create room {0}")]
    TooManyRooms(RoomId),

    /// The relay actor has stopped.
    #[error("relay is unavailable")]
    Unavailable,
}

impl RelayError {
    /// HTTP-style status code reported to the client in an `error` event.
    pub fn code(&self) -> u16 {
        match self {
            Self::InvalidRoomId => 400,
            Self::AlreadyInRoom(..) => 409,
            Self::RoomFull(_) | Self::TooManyRooms(_) | Self::Unavailable => 503,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_error_codes() {
        let c = ConnectionId::new("c");
        let r = RoomId::new("r");
        assert_eq!(RelayError::InvalidRoomId.code(), 400);
        assert_eq!(RelayError::AlreadyInRoom(c, r.clone()).code(), 409);
        assert_eq!(RelayError::RoomFull(r.clone()).code(), 503);
        assert_eq!(RelayError::TooManyRooms(r).code(), 503);
    }

    #[test]
    fn test_relay_error_display() {
        let err = RelayError::AlreadyInRoom(
            ConnectionId::new("abc"),
            RoomId::new("lobby"),
        );
        assert_eq!(err.to_string(), "connection abc is already in room lobby");
    }
}
