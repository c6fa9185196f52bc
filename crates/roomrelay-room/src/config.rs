//! Relay configuration.

// ---------------------------------------------------------------------------
// RejoinPolicy
// ---------------------------------------------------------------------------

/// What happens when a connection that is already in a room joins again.
///
/// A connection is a member of at most one room. The second join either
/// moves it or is refused:
///
/// ```text
/// InRoom(a) ──join(b)──→ LeavePrevious: player-left to a, then join b
///                    └─→ Reject:        error, still InRoom(a)
/// ```
///
/// Joining the room the connection is already in follows the same rule,
/// so under `LeavePrevious` it acts as a fresh re-entry (positions reset,
/// new `room-state`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RejoinPolicy {
    /// Leave the current room first, then join the new one.
    #[default]
    LeavePrevious,
    /// Refuse the join with [`RelayError::AlreadyInRoom`](crate::RelayError::AlreadyInRoom).
    Reject,
}

// ---------------------------------------------------------------------------
// RelayConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`RoomRelay`](crate::RoomRelay).
///
/// Limits are off by default: rooms and memberships are bounded only by
/// memory. Set them for internet-facing deployments.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Maximum number of rooms alive at once. `None` means unlimited.
    pub max_rooms: Option<usize>,

    /// Maximum sessions in a single room. `None` means unlimited.
    pub max_sessions_per_room: Option<usize>,

    /// How a second join from the same connection is handled.
    pub rejoin_policy: RejoinPolicy,

    /// Capacity of the relay actor's command queue. Handlers wait when it
    /// is full, which throttles chatty clients instead of growing memory.
    pub command_buffer: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_rooms: None,
            max_sessions_per_room: None,
            rejoin_policy: RejoinPolicy::default(),
            command_buffer: 256,
        }
    }
}

impl RelayConfig {
    /// Fixes values that would make the relay unusable.
    ///
    /// Called by [`spawn_relay`](crate::spawn_relay). A zero
    /// `command_buffer` is raised to 1 (Tokio channels need capacity).
    pub fn validated(mut self) -> Self {
        if self.command_buffer == 0 {
            tracing::warn!("command_buffer of 0 is invalid, using 1");
            self.command_buffer = 1;
        }
        self
    }
}
