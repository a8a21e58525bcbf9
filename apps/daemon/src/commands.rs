//! Subcommand handlers.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use cliplog_capture::{CaptureConfig, ClipHistory, NeverPaused, PauseFlag};
use cliplog_clipboard::SystemClipboard;
use cliplog_storage::{ClipEntry, ClipRepository, Database};

const PREVIEW_CHARS: usize = 72;

fn open_store(db_path: &Path) -> Result<Database> {
    Database::open(db_path)
        .with_context(|| format!("failed to open history at {}", db_path.display()))
}

pub async fn run(db_path: &Path, config: CaptureConfig, start_paused: bool) -> Result<()> {
    let store = Arc::new(open_store(db_path)?);
    let pause = PauseFlag::new();
    if start_paused {
        pause.pause();
    }

    let history = ClipHistory::new(
        store,
        Arc::new(SystemClipboard::new()),
        Arc::new(pause.clone()),
        config,
    );
    history.start()?;

    tracing::info!(
        path = %db_path.display(),
        retention = history.config().retention_limit,
        paused = start_paused,
        "recording clipboard history, Ctrl-C to stop"
    );

    wait_for_shutdown(&pause).await?;

    history.shutdown();
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown(pause: &PauseFlag) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut toggle = signal(SignalKind::user_defined1()).context("failed to listen for SIGUSR1")?;
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for Ctrl-C")?;
                tracing::info!("shutdown requested");
                return Ok(());
            }
            _ = toggle.recv() => {
                let paused = pause.toggle();
                tracing::info!(paused, "capture pause toggled");
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(_pause: &PauseFlag) -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracing::info!("shutdown requested");
    Ok(())
}

pub fn list(db_path: &Path, limit: usize, json: bool) -> Result<()> {
    let store = open_store(db_path)?;
    let entries = store.list_latest(limit)?;
    print_entries(&entries, json)
}

pub fn search(db_path: &Path, query: &str, limit: usize, json: bool) -> Result<()> {
    let store = open_store(db_path)?;
    let entries = store.search(query, limit)?;
    print_entries(&entries, json)
}

// TODO: on X11 the selection is dropped when this process exits; serve it
// until another owner takes over (arboard's `SetExtLinux::wait`).
pub fn copy(db_path: &Path, config: CaptureConfig, id: i64) -> Result<()> {
    let store = Arc::new(open_store(db_path)?);
    let history = ClipHistory::new(
        store,
        Arc::new(SystemClipboard::new()),
        Arc::new(NeverPaused),
        config,
    );
    let entry = history.copy_entry(id)?;
    history.shutdown();
    println!("copied #{}: {}", entry.id, preview(&entry.content));
    Ok(())
}

pub fn favorite(db_path: &Path, id: i64, favorite: bool) -> Result<()> {
    let store = open_store(db_path)?;
    store.set_favorite(id, favorite)?;
    println!(
        "#{id} {}",
        if favorite { "marked favorite" } else { "unmarked" }
    );
    Ok(())
}

pub fn delete(db_path: &Path, id: i64) -> Result<()> {
    let store = open_store(db_path)?;
    store.delete_by_id(id)?;
    println!("deleted #{id}");
    Ok(())
}

pub fn clear(db_path: &Path) -> Result<()> {
    let store = open_store(db_path)?;
    let removed = store.delete_all_non_favorites()?;
    let kept = store.count_favorites()?;
    println!("removed {removed} entries, kept {kept} favorites");
    Ok(())
}

pub fn wipe(db_path: &Path) -> Result<()> {
    if !db_path.exists() {
        println!("nothing to delete at {}", db_path.display());
        return Ok(());
    }
    let store = open_store(db_path)?;
    store.delete_database_file()?;
    println!("deleted {}", db_path.display());
    Ok(())
}

fn print_entries(entries: &[ClipEntry], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }
    for entry in entries {
        println!("{}", format_entry(entry));
    }
    Ok(())
}

fn format_entry(entry: &ClipEntry) -> String {
    let when = chrono::DateTime::from_timestamp_millis(entry.created_at)
        .map(|t| {
            t.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "-".to_string());
    let star = if entry.favorite { '*' } else { ' ' };
    format!("{:>6} {star} {when}  {}", entry.id, preview(&entry.content))
}

/// First line of `text`, cut to a fixed number of chars.
fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or("");
    let mut out: String = line.chars().take(PREVIEW_CHARS).collect();
    if line.chars().count() > PREVIEW_CHARS || text.lines().nth(1).is_some() {
        out.push_str("...");
    }
    out
}
