//! Unified error type for roomrelay.

use roomrelay_protocol::ProtocolError;
use roomrelay_room::RelayError;
use roomrelay_transport::TransportError;

/// Top-level error wrapping each layer's error.
///
/// `#[from]` on every variant lets `?` lift layer errors into this one.
#[derive(Debug, thiserror::Error)]
pub enum RoomRelayError {
    /// Binding, accepting, sending or receiving failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An event could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The relay refused an operation or has stopped.
    #[error(transparent)]
    Relay(#[from] RelayError),
}

#[cfg(test)]
mod tests {
    use roomrelay_protocol::{ConnectionId, RoomId};

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: RoomRelayError = TransportError::Closed(ConnectionId::new("gone")).into();
        assert!(matches!(err, RoomRelayError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let decode = serde_json::from_str::<u8>("nope").unwrap_err();
        let err: RoomRelayError = ProtocolError::Decode(decode).into();
        assert!(matches!(err, RoomRelayError::Protocol(_)));
    }

    #[test]
    fn test_from_relay_error() {
        let err: RoomRelayError = RelayError::RoomFull(RoomId::new("lobby")).into();
        assert!(matches!(err, RoomRelayError::Relay(RelayError::RoomFull(_))));
        assert_eq!(err.to_string(), "room lobby is full");
    }
}
