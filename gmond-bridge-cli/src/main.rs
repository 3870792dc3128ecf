//! ## gmond-bridge
//! Command line front-end for the Ganglia bridge.
//!
//! - `run`: forward the bridge's own metrics until Ctrl-C
//! - `check`: validate configuration and resolve the collector
//! - `dump`: print the datagrams of one cycle without sending them

use clap::Parser;
use gmond_bridge_telemetry::BridgeLogger;

mod commands;
mod error;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    BridgeLogger::init_with_filter(&cli.log_level);

    commands::run_command(cli).await?;
    Ok(())
}
