use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "recsync",
    version = env!("RECSYNC_VERSION"),
    about = "Sync cloud meeting recordings to Google Drive"
)]
pub struct Cli {
    /// Configuration file (default: ./config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Use a specific database file instead of the configured one
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable verbose output for debugging API calls and transfers
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reset stalled records, fetch new recordings, then upload pending files
    Run {
        /// Fetch and record only; nothing is downloaded or uploaded
        #[arg(long, overrides_with = "no_dry_run")]
        dry_run: bool,

        /// Upload even if the config says dry_run = true
        #[arg(long, overrides_with = "dry_run")]
        no_dry_run: bool,
    },

    /// Fetch recordings since the cutoff and store the ones matching the filters
    Ingest,

    /// Upload stored records that are not yet synced (no fetch)
    Sync,

    /// Show what is pending for the configured file type and record type
    Status {
        /// Maximum number of pending meetings to list
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Put every record that is not synced back in the queue
    Reset,

    /// Google Drive authorization
    Drive {
        #[command(subcommand)]
        action: DriveAction,
    },

    /// Administrative commands
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum DriveAction {
    /// Authorize access to Google Drive (one-time setup)
    Init,
    /// Show whether Drive is authorized
    Status,
    /// Remove the stored Drive authorization
    Logout,
}

#[derive(Subcommand, Debug)]
pub enum AdminAction {
    /// Database management
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum DbAction {
    /// Delete the database file (sync state is lost)
    Clear,
    /// Show database location, size and record counts
    Info,
}

impl Commands {
    /// Resolve `--dry-run`/`--no-dry-run` against the configured default.
    pub fn dry_run_override(&self) -> Option<bool> {
        match self {
            Commands::Run { dry_run: true, .. } => Some(true),
            Commands::Run { no_dry_run: true, .. } => Some(false),
            _ => None,
        }
    }
}
