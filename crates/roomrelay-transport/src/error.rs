use crate::ConnectionId;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The WebSocket upgrade handshake failed.
    #[cfg(feature = "websocket")]
    #[error("websocket handshake with {peer} failed: {source}")]
    Handshake {
        peer: std::net::SocketAddr,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    /// The peer did not finish the WebSocket upgrade in time.
    #[error("websocket handshake with {0} timed out")]
    HandshakeTimeout(std::net::SocketAddr),

    /// Writing a frame to the peer failed.
    #[cfg(feature = "websocket")]
    #[error("send failed: {0}")]
    SendFailed(#[source] tokio_tungstenite::tungstenite::Error),

    /// Reading a frame from the peer failed.
    #[cfg(feature = "websocket")]
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] tokio_tungstenite::tungstenite::Error),

    /// The connection was already closed locally.
    #[error("connection {0} is closed")]
    Closed(ConnectionId),

    /// The transport was shut down and accepts no more connections.
    #[error("transport shut down")]
    Shutdown,
}
