//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::{Connection, ConnectionId, Incoming, Transport, TransportError};

type WsStream = WebSocketStream<TcpStream>;

/// How long a freshly accepted socket has to finish the WebSocket upgrade.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on a graceful close. A peer that has stopped reading can
/// leave the close frame unsendable; the socket is then simply dropped.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
    handshake_timeout: Duration,
    shut_down: AtomicBool,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    ///
    /// Port `0` asks the OS for a free port; use
    /// [`local_addr`](Self::local_addr) to find out which one.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await.map_err(|source| {
            TransportError::Bind {
                addr: addr.to_string(),
                source,
            }
        })?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self {
            listener,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            shut_down: AtomicBool::new(false),
        })
    }

    /// Sets the time limit for the upgrade of each accepted socket.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Incoming = PendingWebSocket;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Incoming, Self::Error> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(TransportError::Shutdown);
        }

        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::trace!(%peer, "accepted TCP connection");

        Ok(PendingWebSocket {
            stream,
            peer,
            handshake_timeout: self.handshake_timeout,
        })
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        self.shut_down.store(true, Ordering::Release);
        tracing::info!("WebSocket transport shut down");
        Ok(())
    }
}

/// A TCP socket waiting for its HTTP upgrade.
///
/// Returned by [`WebSocketTransport::accept`]. Call
/// [`upgrade`](Incoming::upgrade) from the connection's own task.
pub struct PendingWebSocket {
    stream: TcpStream,
    peer: SocketAddr,
    handshake_timeout: Duration,
}

impl Incoming for PendingWebSocket {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    async fn upgrade(self) -> Result<Self::Connection, Self::Error> {
        let peer = self.peer;
        let ws = tokio::time::timeout(
            self.handshake_timeout,
            tokio_tungstenite::accept_async(self.stream),
        )
        .await
        .map_err(|_| TransportError::HandshakeTimeout(peer))?
        .map_err(|source| TransportError::Handshake { peer, source })?;

        let id = ConnectionId::generate();
        tracing::debug!(%id, %peer, "accepted WebSocket connection");

        Ok(WebSocketConnection::new(id, peer, ws))
    }
}

/// A single WebSocket connection.
///
/// The socket is split into independently locked halves so a task
/// blocked in [`recv`](Connection::recv) never holds up a concurrent
/// [`send`](Connection::send).
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
    closed: AtomicBool,
}

impl WebSocketConnection {
    fn new(id: ConnectionId, peer: SocketAddr, ws: WsStream) -> Self {
        let (sink, stream) = ws.split();
        Self {
            id,
            peer,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the remote address of the peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    /// Sends `data` as a text frame when it is valid UTF-8 (JSON always
    /// is, and browsers then receive a string), otherwise as binary.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed(self.id.clone()));
        }
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::text(text.to_owned()),
            Err(_) => Message::binary(data.to_vec()),
        };
        self.sink
            .lock()
            .await
            .send(msg)
            .await
            .map_err(TransportError::SendFailed)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        loop {
            let msg = self.stream.lock().await.next().await;
            match msg {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.to_vec()));
                }
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => return Err(TransportError::ReceiveFailed(e)),
            }
        }
    }

    /// Sends a close frame, waiting at most a second.
    ///
    /// The sink may be held by a writer parked on a peer that stopped
    /// reading. Rather than wait for it, the close gives up and the socket
    /// is torn down when the connection is dropped.
    async fn close(&self) -> Result<(), Self::Error> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let graceful = tokio::time::timeout(CLOSE_TIMEOUT, async {
            self.sink.lock().await.close().await
        })
        .await;
        match graceful {
            Ok(Ok(()))
            | Ok(Err(tungstenite::Error::ConnectionClosed))
            | Ok(Err(tungstenite::Error::AlreadyClosed)) => Ok(()),
            Ok(Err(e)) => Err(TransportError::SendFailed(e)),
            Err(_) => {
                tracing::debug!(id = %self.id, "close timed out, dropping socket");
                Ok(())
            }
        }
    }

    fn id(&self) -> &ConnectionId {
        &self.id
    }
}
