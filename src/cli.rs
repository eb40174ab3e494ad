use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Watches a project tree for inline marker comments left for a coding agent.
///
/// comment-watch scans changed files for a marker token (default `agent`) and
/// fires a batched trigger dispatch, carrying every pending comment across the
/// tree, when a fire-now marker (default `!agent`) lands in any file.
#[derive(Parser, Debug)]
#[command(
    name = "comment-watch",
    version,
    about,
    long_about = None,
    propagate_version = true,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch a directory tree and report marker comments as files change.
    ///
    /// Runs until ctrl-c. Passive markers are reported as they appear and
    /// accumulate; a fire-now marker dispatches the whole pending batch and
    /// clears it.
    Watch {
        /// Path to the project root to watch.
        path: PathBuf,

        /// Marker token to look for (overrides comment-watch.toml).
        #[arg(long)]
        marker: Option<String>,

        /// Debounce window in milliseconds for filesystem events.
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// Also scan files that already exist when the watch starts.
        #[arg(long)]
        include_existing: bool,

        /// Emit one JSON object per event instead of human-readable text.
        #[arg(long)]
        json: bool,
    },

    /// Scan a directory tree once and report every marker comment found.
    ///
    /// No watching and no pending state — a point-in-time inventory of
    /// marker comments, honoring the same ignore rules as watch.
    Scan {
        /// Path to the project root to scan.
        path: PathBuf,

        /// Marker token to look for (overrides comment-watch.toml).
        #[arg(long)]
        marker: Option<String>,

        /// Print each scanned file path to stderr.
        #[arg(short, long)]
        verbose: bool,

        /// Output results as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },
}
