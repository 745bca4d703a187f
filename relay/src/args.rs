use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Relay chat completion gateway
#[derive(Debug, Parser)]
#[command(name = "relay", about = "Provider-agnostic chat completion gateway")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml", env = "RELAY_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "RELAY_LISTEN")]
    pub listen: Option<SocketAddr>,
}
