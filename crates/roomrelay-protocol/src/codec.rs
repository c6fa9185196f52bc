//! Codec trait and implementations for serializing events.
//!
//! The relay never touches a serialization library directly; it goes
//! through a [`Codec`] so the wire format can change without touching the
//! room logic. [`JsonCodec`] is the only implementation today.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back.
///
/// Codecs are shared by every connection task, hence `Send + Sync`.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or do
    /// not match the shape of `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that speaks JSON via `serde_json`.
///
/// JSON is what browser clients produce natively, so this is the default
/// (behind the `json` feature).
///
/// ```rust
/// use roomrelay_protocol::{ClientEvent, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let event: ClientEvent = codec
///     .decode(br#"{"event":"chat-message","data":{"roomId":"lobby","message":"hi"}}"#)
///     .unwrap();
/// assert!(matches!(event, ClientEvent::ChatMessage { .. }));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientEvent, ConnectionId, ServerEvent};

    #[test]
    fn test_json_codec_encodes_server_event() {
        let bytes = JsonCodec
            .encode(&ServerEvent::PlayerLeft(ConnectionId::new("c1")))
            .unwrap();
        assert_eq!(bytes, br#"{"event":"player-left","data":"c1"}"#);
    }

    #[test]
    fn test_json_codec_decode_garbage_is_decode_error() {
        let result: Result<ClientEvent, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_decode_error_mentions_missing_field() {
        let err = JsonCodec
            .decode::<ClientEvent>(br#"{"event":"join-room","data":{}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("roomId"), "got: {err}");
    }
}
