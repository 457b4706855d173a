//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Video watch session tracker.
///
/// Detects playing videos from a page-snapshot feed, tracks watch sessions
/// with pause-aware time accumulation, and keeps the session history in a
/// local store.
#[derive(Debug, Parser)]
#[command(name = "vt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Set up the install identity and seed default settings.
    Init {
        /// Human-friendly label for this install (defaults to hostname).
        #[arg(long)]
        label: Option<String>,
    },

    /// Run the tracker against a page-snapshot feed.
    Run {
        /// JSONL feed of page snapshots and protocol messages.
        /// Reads stdin when omitted.
        #[arg(long)]
        feed: Option<PathBuf>,

        /// Tab identifier for sessions started during this run.
        #[arg(long, default_value = "1")]
        tab: String,
    },

    /// Show tracking status and store health.
    Status,

    /// List the full session history.
    Sessions {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show derived watch statistics.
    Stats {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Drop the entire session history.
    Clear,

    /// Enable or disable session tracking.
    Tracking {
        #[arg(value_enum)]
        state: TrackingState,
    },
}

/// On/off argument for the tracking command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TrackingState {
    On,
    Off,
}

impl TrackingState {
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::On)
    }
}
