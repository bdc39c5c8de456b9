//! Command-line arguments for the `pokelink` binary.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use pokelink_battle::Role;

use crate::config::TransportConfig;

/// Turn-based battles between two peers over UDP.
#[derive(Parser, Debug)]
#[command(name = "pokelink", author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub mode: Mode,

    #[command(flatten)]
    pub options: Options,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Wait for a joiner on a local port.
    Host {
        /// Local UDP port.
        #[arg(short, long)]
        port: u16,
    },
    /// Connect to a waiting host.
    Join {
        /// Local UDP port.
        #[arg(short, long)]
        port: u16,
        /// Host address (e.g. 127.0.0.1:8888).
        #[arg(long)]
        peer: SocketAddr,
    },
    /// Watch a host's battle.
    Spectate {
        /// Local UDP port.
        #[arg(short, long)]
        port: u16,
        /// Host address.
        #[arg(long)]
        peer: SocketAddr,
    },
}

/// Flags shared by every mode.
///
/// Transport values override [`TransportConfig::default`].
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// Pokemon to battle with (defaults to the first entry of the dex).
    #[arg(long, global = true)]
    pub pokemon: Option<String>,

    /// JSON data file with species and moves (defaults to the built-in table).
    #[arg(long, global = true)]
    pub dex: Option<PathBuf>,

    /// Milliseconds before an unacknowledged message is resent.
    #[arg(long, global = true)]
    pub retry_delay_ms: Option<u64>,

    /// Retransmissions before the peer is declared lost.
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Milliseconds between polls of the socket.
    #[arg(long, global = true)]
    pub poll_interval_ms: Option<u64>,

    /// Log level (error, warn, info, debug, trace). `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Directory where received stickers are written.
    #[arg(long, global = true)]
    pub sticker_dir: Option<PathBuf>,
}

impl Mode {
    pub fn role(&self) -> Role {
        match self {
            Mode::Host { .. } => Role::Host,
            Mode::Join { .. } => Role::Joiner,
            Mode::Spectate { .. } => Role::Spectator,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            Mode::Host { port } | Mode::Join { port, .. } | Mode::Spectate { port, .. } => *port,
        }
    }

    /// The host to contact, if this side initiates
    pub fn peer(&self) -> Option<SocketAddr> {
        match self {
            Mode::Host { .. } => None,
            Mode::Join { peer, .. } | Mode::Spectate { peer, .. } => Some(*peer),
        }
    }

    /// Listen on every interface
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port()))
    }
}

impl TransportConfig {
    /// Apply CLI overrides on top of the defaults.
    pub fn apply_cli_overrides(&mut self, options: &Options) {
        if let Some(ms) = options.retry_delay_ms {
            self.retry_delay = Duration::from_millis(ms);
        }
        if let Some(n) = options.max_retries {
            self.max_retries = n;
        }
        if let Some(ms) = options.poll_interval_ms {
            self.poll_interval = Duration::from_millis(ms);
        }
    }
}
