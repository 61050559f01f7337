//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Terminal messenger for a legacy text-protocol server.
///
/// Reads lines from stdin and sends each one to the server; prints server
/// replies, connection status changes and errors as they happen.
#[derive(Debug, Parser)]
#[command(name = "tcplink", version)]
pub struct Args {
    /// Server host; defaults to the saved settings.
    #[arg(long, env = "TCPLINK_HOST")]
    pub host: Option<String>,

    /// Server port; defaults to the saved settings.
    #[arg(long, env = "TCPLINK_PORT")]
    pub port: Option<u32>,

    /// Code page label shared with the server, e.g. `cp866`.
    #[arg(long, env = "TCPLINK_ENCODING")]
    pub encoding: Option<String>,

    /// Settings file instead of the platform default.
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Start without the reachability check (settings are then not saved).
    #[arg(long)]
    pub skip_probe: bool,

    /// Print events as JSON lines.
    #[arg(long)]
    pub json: bool,
}
