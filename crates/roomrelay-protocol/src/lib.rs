//! Wire protocol for roomrelay.
//!
//! This crate defines what clients and the relay say to each other:
//!
//! - **Values** ([`Value`], [`Fields`]): the typed open mapping clients
//!   use for `userData` and incremental `state`.
//! - **Events** ([`ClientEvent`], [`ServerEvent`], [`PlayerState`]):
//!   the named events that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how events become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! Every frame is a JSON object of the form
//! `{"event": "<name>", "data": <payload>}`.
//!
//! ```text
//! Transport (bytes) → Protocol (events) → Relay (rooms and sessions)
//! ```

mod codec;
mod error;
mod types;
mod value;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use roomrelay_transport::ConnectionId;
pub use types::{
    ClientEvent, PlayerState, Recipient, RoomId, ServerEvent,
};
pub use value::{Fields, RESERVED_KEY, Value};
