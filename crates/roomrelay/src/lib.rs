//! # roomrelay
//!
//! Room-based real-time state relay for multiplayer web clients.
//!
//! Clients connect over WebSocket, join named rooms, and the relay fans
//! their position/state updates, chat and presence changes out to the
//! other members. The relay holds no game rules: it stores each
//! connection's last-known fields and forwards what it is sent.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roomrelay::prelude::*;
//!
//! # async fn start() -> Result<(), RoomRelayError> {
//! let server = RoomRelayServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::RoomRelayError;
pub use server::{
    RoomRelayServer, RoomRelayServerBuilder, DEFAULT_BIND_ADDR, DEFAULT_IDLE_TIMEOUT,
};

pub use roomrelay_protocol as protocol;
pub use roomrelay_room as room;
pub use roomrelay_transport as transport;

/// Everything needed to embed and talk to a relay server.
pub mod prelude {
    pub use crate::{RoomRelayError, RoomRelayServer, RoomRelayServerBuilder};
    pub use roomrelay_protocol::{
        ClientEvent, Codec, ConnectionId, Fields, JsonCodec, PlayerState, RoomId,
        ServerEvent, Value,
    };
    pub use roomrelay_room::{
        RejoinPolicy, RelayConfig, RelayError, RelayHandle, RelayStats,
    };
}
