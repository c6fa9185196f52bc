//! Error types for the protocol layer.

/// Errors that can occur while turning events into bytes and back.
///
/// A `Decode` error almost always means the client sent something
/// malformed: broken JSON, an unknown event name, a missing `roomId`, or
/// a `userData`/`state` that is not a flat object of strings, numbers and
/// booleans. The relay reports these back to the offending connection.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing an event failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The bytes are not a valid event.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),
}
