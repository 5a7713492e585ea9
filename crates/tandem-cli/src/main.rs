//! Tandem CLI - Synchronized playback server and tools
//!
//! Features:
//! - Serve media on a shared network clock, broadcasting heartbeats
//! - Listen to heartbeats and commands on a multicast group
//! - Send transport commands to servers
//! - Check the GStreamer installation

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tandem_core::config::{DEFAULT_MULTICAST_ADDRESS, DEFAULT_MULTICAST_PORT};

mod commands;
mod output;

/// Tandem CLI - Network-synchronized media playback
#[derive(Parser)]
#[command(name = "tandem")]
#[command(version)]
#[command(about = "Network-synchronized media playback over GStreamer", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play media on a network clock and broadcast heartbeats
    Serve {
        /// Path or URI of the media
        media: String,

        /// JSON server configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Address the network clock is served on
        #[arg(short, long)]
        address: Option<String>,

        /// Port the network clock is served on
        #[arg(short, long)]
        port: Option<u16>,

        /// Heartbeat period in updates
        #[arg(long)]
        heartbeat: Option<u32>,

        /// Updates per second
        #[arg(long, default_value = "60")]
        fps: u32,

        /// Start muted
        #[arg(long)]
        mute: bool,

        /// Loop playback
        #[arg(long = "loop")]
        looping: bool,

        /// Apply command records received from peers
        #[arg(long)]
        accept_commands: bool,
    },

    /// Print heartbeats and commands seen on a group
    Listen {
        /// Multicast group
        #[arg(short, long, default_value = DEFAULT_MULTICAST_ADDRESS)]
        group: String,

        /// Group port
        #[arg(short, long, default_value_t = DEFAULT_MULTICAST_PORT)]
        port: u16,
    },

    /// Send one transport command (play, pause, stop, seek, volume, mute)
    Send {
        /// Command name
        command: String,

        /// Command argument (seconds, volume, on/off)
        value: Option<String>,

        /// Multicast group or peer address
        #[arg(short, long, default_value = DEFAULT_MULTICAST_ADDRESS)]
        group: String,

        /// Group or peer port
        #[arg(short, long, default_value_t = DEFAULT_MULTICAST_PORT)]
        port: u16,
    },

    /// Check the GStreamer installation
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .init();

    tandem_core::init();

    match cli.command {
        Commands::Serve {
            media,
            config,
            address,
            port,
            heartbeat,
            fps,
            mute,
            looping,
            accept_commands,
        } => {
            let options = commands::ServeOptions {
                media,
                config,
                address,
                port,
                heartbeat,
                fps,
                mute,
                looping,
                accept_commands,
            };
            commands::serve(options, &cli.format).await?;
        }
        Commands::Listen { group, port } => {
            commands::listen(&group, port, &cli.format).await?;
        }
        Commands::Send { command, value, group, port } => {
            commands::send(&command, value.as_deref(), &group, port)?;
        }
        Commands::Check => {
            commands::check(&cli.format)?;
        }
    }

    Ok(())
}
