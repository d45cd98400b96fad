//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ft_core::TrackingMode;

/// Browser tab focus tracker.
///
/// Records how long each tab holds your attention and collects the
/// sessions into a weekly report.
#[derive(Debug, Parser)]
#[command(name = "ft", version, about, long_about = None)]
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
    /// Track tab focus from browser events read on stdin.
    Track {
        /// Key sessions by `domain` or full `url`.
        #[arg(long)]
        mode: Option<TrackingMode>,

        /// Collector URL that receives finished sessions.
        #[arg(long)]
        endpoint: Option<String>,

        /// Read length-prefixed native messaging frames instead of JSON lines.
        #[arg(long)]
        native: bool,
    },

    /// Run the collector that stores sessions and serves the weekly report.
    Serve {
        /// Address to listen on (e.g., 127.0.0.1:8080).
        #[arg(long)]
        listen: Option<String>,
    },

    /// Show browsing time for the past seven days.
    Report {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show collector database status.
    Status,
}
