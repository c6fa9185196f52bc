//! Command-line arguments. Every flag can also come from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use roomrelay::prelude::{RejoinPolicy, RelayConfig};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Socket address to listen on.
    #[arg(long, env = "RELAY_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Port to listen on, replacing the port of --bind.
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Maximum number of rooms alive at once.
    #[arg(long, env = "RELAY_MAX_ROOMS")]
    pub max_rooms: Option<usize>,

    /// Maximum sessions in one room.
    #[arg(long, env = "RELAY_MAX_SESSIONS_PER_ROOM")]
    pub max_sessions_per_room: Option<usize>,

    /// Refuse joins from connections already in a room instead of moving them.
    #[arg(long, env = "RELAY_REJECT_REJOIN")]
    pub reject_rejoin: bool,

    /// Seconds a connection may stay silent before it is dropped.
    #[arg(long, env = "RELAY_IDLE_TIMEOUT_SECS", default_value_t = 30)]
    pub idle_timeout_secs: u64,

    /// Log filter used when RUST_LOG is not set (trace, debug, info, warn, error).
    #[arg(long, env = "RELAY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, env = "RELAY_JSON_LOGS")]
    pub json_logs: bool,
}

impl Cli {
    pub fn bind_addr(&self) -> SocketAddr {
        let mut addr = self.bind;
        if let Some(port) = self.port {
            addr.set_port(port);
        }
        addr
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            max_rooms: self.max_rooms,
            max_sessions_per_room: self.max_sessions_per_room,
            rejoin_policy: if self.reject_rejoin {
                RejoinPolicy::Reject
            } else {
                RejoinPolicy::LeavePrevious
            },
            ..RelayConfig::default()
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}
