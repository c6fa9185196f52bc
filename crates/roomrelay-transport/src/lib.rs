//! Transport abstraction layer for roomrelay.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the network protocol carrying relay events, plus the [`ConnectionId`]
//! every connection is known by.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    PendingWebSocket, WebSocketConnection, WebSocketTransport, DEFAULT_HANDSHAKE_TIMEOUT,
};

use std::fmt;
use std::net::SocketAddr;

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};

/// Length of a generated connection id.
const CONNECTION_ID_LEN: usize = 20;

/// Opaque, transport-assigned identifier for a connection.
///
/// Serialized as a plain string. Generated ids are 20 random
/// alphanumeric characters and are never reused while the process runs.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        let id: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(CONNECTION_ID_LEN)
            .map(char::from)
            .collect();
        Self(id)
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the underlying `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accepts new incoming connections.
///
/// `accept` only takes the socket off the listener. The protocol handshake
/// happens later in [`Incoming::upgrade`], which callers run in the task
/// that will own the connection. A peer that connects and then stalls
/// therefore delays nobody but itself.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// An accepted socket that has not completed its handshake.
    type Incoming: Incoming<Connection = Self::Connection, Error = Self::Error>;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next incoming socket.
    async fn accept(&mut self) -> Result<Self::Incoming, Self::Error>;

    /// Gracefully shuts down the transport, stopping new connections.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// A socket accepted by a [`Transport`] whose handshake is still pending.
pub trait Incoming: Send + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Remote address of the peer.
    fn peer_addr(&self) -> SocketAddr;

    /// Runs the handshake and yields a ready connection.
    ///
    /// Implementations bound this with a timeout; a peer that never
    /// completes the handshake gets an error, not an endless wait.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that can send and receive bytes.
///
/// Sending and receiving must be usable concurrently from different
/// tasks: a relay connection is read by its handler while a writer task
/// pushes broadcasts to it.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends data to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> &ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new("abc");
        assert_eq!(id.as_str(), "abc");
        assert_eq!(id.into_inner(), "abc");
    }

    #[test]
    fn test_connection_id_display_is_raw_id() {
        let id = ConnectionId::new("k3Xq");
        assert_eq!(id.to_string(), "k3Xq");
    }

    #[test]
    fn test_connection_id_generate_shape() {
        let id = ConnectionId::generate();
        assert_eq!(id.as_str().len(), CONNECTION_ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_connection_id_generate_is_unique() {
        let ids: std::collections::HashSet<ConnectionId> =
            (0..1000).map(|_| ConnectionId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_connection_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&ConnectionId::new("c1")).unwrap();
        assert_eq!(json, "\"c1\"");
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new("a"), "alice");
        map.insert(ConnectionId::new("b"), "bob");
        assert_eq!(map[&ConnectionId::new("a")], "alice");
    }
}
