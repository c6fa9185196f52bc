//! `RoomRelayServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → relay.
//!
//! The accept loop only takes sockets off the listener. Everything that
//! waits on a peer, starting with the HTTP upgrade, runs in the task
//! spawned for that connection, so one slow or silent client cannot hold
//! up the others. The upgrade is bounded by the handshake timeout and the
//! connection afterwards by the idle timeout.
//!
//! All connections share one relay actor through a cloned
//! [`RelayHandle`]. Shutting the server down stops the listener first and
//! then the actor; connection tasks still running see their next relay
//! call fail and close.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use roomrelay_protocol::{Codec, JsonCodec};
use roomrelay_room::{spawn_relay, RelayConfig, RelayHandle};
use roomrelay_transport::{
    DEFAULT_HANDSHAKE_TIMEOUT, Incoming, Transport, TransportError, WebSocketTransport,
};

use crate::handler::handle_connection;
use crate::RoomRelayError;

/// Default bind address for the library builder.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// How long a connection may stay silent before it is dropped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared state passed to every connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) relay: RelayHandle,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a relay server.
///
/// # Example
///
/// ```rust,no_run
/// use roomrelay::prelude::*;
///
/// # async fn start() -> Result<(), RoomRelayError> {
/// let server = RoomRelayServer::builder()
///     .bind("0.0.0.0:3000")
///     .relay_config(RelayConfig {
///         max_sessions_per_room: Some(64),
///         ..RelayConfig::default()
///     })
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RoomRelayServerBuilder {
    bind_addr: String,
    relay_config: RelayConfig,
    idle_timeout: Duration,
    handshake_timeout: Duration,
}

impl RoomRelayServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            relay_config: RelayConfig::default(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Sets the address to listen on. Port 0 picks a free port.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    pub fn relay_config(mut self, config: RelayConfig) -> Self {
        self.relay_config = config;
        self
    }

    /// Sets how long a connection may go without sending a frame.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets how long a new socket has to complete the WebSocket upgrade.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Binds the listener and starts the relay, using JSON on the wire.
    pub async fn build(self) -> Result<RoomRelayServer<JsonCodec>, RoomRelayError> {
        self.build_with_codec(JsonCodec).await
    }

    /// Like [`build`](Self::build) with a custom codec.
    pub async fn build_with_codec<C: Codec>(
        self,
        codec: C,
    ) -> Result<RoomRelayServer<C>, RoomRelayError> {
        let transport = WebSocketTransport::bind(&self.bind_addr)
            .await?
            .with_handshake_timeout(self.handshake_timeout);
        let relay = spawn_relay(self.relay_config);

        let state = Arc::new(ServerState {
            relay,
            codec,
            idle_timeout: self.idle_timeout,
        });

        Ok(RoomRelayServer { transport, state })
    }
}

impl Default for RoomRelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound relay server. Call [`run`](Self::run) to start accepting.
pub struct RoomRelayServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl RoomRelayServer<JsonCodec> {
    pub fn builder() -> RoomRelayServerBuilder {
        RoomRelayServerBuilder::new()
    }
}

impl<C: Codec> RoomRelayServer<C> {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Handle to the relay actor, for stats and snapshots.
    pub fn relay(&self) -> RelayHandle {
        self.state.relay.clone()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), RoomRelayError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then stops the
    /// listener and the relay.
    ///
    /// Accept errors are logged and the loop continues.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), RoomRelayError> {
        tracing::info!(addr = ?self.local_addr().ok(), "relay server listening");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(incoming) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            let peer = incoming.peer_addr();
                            let conn = match incoming.upgrade().await {
                                Ok(conn) => conn,
                                Err(e) => {
                                    tracing::debug!(%peer, error = %e, "handshake failed");
                                    return;
                                }
                            };
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(TransportError::Shutdown) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        self.transport.shutdown().await?;
        if self.state.relay.shutdown().await.is_err() {
            tracing::debug!("relay already stopped");
        }
        tracing::info!("relay server stopped");
        Ok(())
    }
}
