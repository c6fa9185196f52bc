//! Room membership and broadcasting for roomrelay.
//!
//! Rooms are created on first join and destroyed when their last session
//! leaves. All state lives in a single [`RoomRelay`], owned by one Tokio
//! task (actor model) and driven through a [`RelayHandle`].
//!
//! # Key types
//!
//! - [`RoomRelay`]: synchronous state machine (join, update, chat, leave)
//! - [`RelayHandle`]: async handle to the actor that owns the relay
//! - [`Session`]: one connection's state inside a room
//! - [`RelayConfig`]: limits and rejoin policy
//!
//! # Concurrency
//!
//! Connection tasks never share the relay. Each call on a [`RelayHandle`]
//! becomes a command on one bounded channel; the actor task applies them
//! one by one to the [`RoomRelay`], whose methods are synchronous. Calls
//! that need an answer (join, leave, stats) carry a oneshot for the
//! reply. Fire-and-forget calls (state updates, chat) return once the
//! command is queued.
//!
//! Outbound events travel the other way over each connection's
//! unbounded [`Outbox`], so the actor never waits on a client.

mod actor;
mod config;
mod error;
mod relay;
mod room;
mod session;

pub use actor::{spawn_relay, RelayHandle, RelayStats, RoomSnapshot};
pub use config::{RejoinPolicy, RelayConfig};
pub use error::RelayError;
pub use relay::{unix_millis, RoomRelay};
pub use room::{Outbox, Room};
pub use session::{Session, ANONYMOUS, POSITION_KEYS};
