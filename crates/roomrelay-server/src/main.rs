//! roomrelay server: relays room membership, state updates and chat
//! between WebSocket clients.

mod cli;
mod logging;

use clap::Parser;
use roomrelay::prelude::*;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.json_logs)?;

    let server = RoomRelayServer::builder()
        .bind(cli.bind_addr().to_string())
        .relay_config(cli.relay_config())
        .idle_timeout(cli.idle_timeout())
        .build()
        .await?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %server.local_addr()?,
        max_rooms = ?cli.max_rooms,
        max_sessions_per_room = ?cli.max_sessions_per_room,
        "roomrelay server starting"
    );

    server.run_until(shutdown_signal()).await?;
    Ok(())
}

/// Resolves on Ctrl-C. If the signal handler cannot be installed the
/// server runs until killed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
