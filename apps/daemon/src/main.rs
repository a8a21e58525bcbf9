//! cliplog - clipboard history recorder
//!
//! Entry point for the command-line binary.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cliplog_capture::{CaptureConfig, PollSettings, DEFAULT_RETENTION_LIMIT};

const DATABASE_FILE: &str = "cliplog.db";

/// Command-line arguments for cliplog
#[derive(Parser, Debug)]
#[command(name = "cliplog")]
#[command(version, about = "Record and browse clipboard history", long_about = None)]
pub struct Args {
    /// Directory holding the history database (default: ~/.cliplog)
    #[arg(long, global = true, env = "CLIPLOG_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Non-favorite entries to keep (clamped to 100..=50000)
    #[arg(long, global = true, env = "CLIPLOG_RETENTION", default_value_t = DEFAULT_RETENTION_LIMIT)]
    pub retention: usize,

    /// Ignore captures shorter than this many characters (0 disables)
    #[arg(long, global = true, env = "CLIPLOG_MIN_LENGTH", default_value_t = 0)]
    pub min_length: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Watch the clipboard and record changes until Ctrl-C
    Run {
        /// Base polling interval in milliseconds
        #[arg(long, env = "CLIPLOG_POLL_MS")]
        poll_ms: Option<u64>,

        /// Start with capture paused (toggle with SIGUSR1 on Unix)
        #[arg(long)]
        paused: bool,
    },
    /// Print the most recent entries, favorites first
    List {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print entries containing QUERY
    Search {
        query: String,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Put an entry back on the clipboard
    Copy { id: i64 },
    /// Mark an entry as favorite, or unmark it with --off
    Favorite {
        id: i64,

        #[arg(long)]
        off: bool,
    },
    /// Delete one entry
    Delete { id: i64 },
    /// Delete every entry that is not a favorite
    Clear,
    /// Delete the history database, favorites included
    Wipe,
}

impl Args {
    fn database_path(&self) -> Result<PathBuf> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::home_dir()
                .context("cannot determine home directory, pass --data-dir")?
                .join(".cliplog"),
        };
        Ok(dir.join(DATABASE_FILE))
    }

    fn capture_config(&self) -> CaptureConfig {
        let mut poll = PollSettings::default();
        if let Command::Run {
            poll_ms: Some(ms), ..
        } = self.command
        {
            poll.base_interval_ms = ms;
            poll.min_interval_ms = poll.min_interval_ms.min(ms);
        }

        CaptureConfig {
            retention_limit: self.retention,
            min_clip_length: self.min_length,
            watcher_enabled: true,
            poll,
        }
        .normalized()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging();

    let db_path = args.database_path()?;
    let config = args.capture_config();
    tracing::debug!(path = %db_path.display(), ?config, "resolved settings");

    match args.command {
        Command::Run { paused, .. } => commands::run(&db_path, config, paused).await,
        Command::List { limit, json } => commands::list(&db_path, limit, json),
        Command::Search { query, limit, json } => commands::search(&db_path, &query, limit, json),
        Command::Copy { id } => commands::copy(&db_path, config, id),
        Command::Favorite { id, off } => commands::favorite(&db_path, id, !off),
        Command::Delete { id } => commands::delete(&db_path, id),
        Command::Clear => commands::clear(&db_path),
        Command::Wipe => commands::wipe(&db_path),
    }
}

/// Logs go to stderr so command output on stdout stays pipeable.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,cliplog=debug")),
        )
        .with_writer(std::io::stderr)
        .init();
}
