//! Clipboard capture pipeline for cliplog.
//!
//! Polls the clipboard, filters what it sees and records the survivors in
//! the history store. It handles:
//! - Adaptive polling (fast after a change, slower when idle or failing)
//! - Pause/resume with a barrier so paused content is never recorded
//! - Dedup, size limits and suppression of the app's own clipboard writes
//! - Retention pruning
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Domain Layer                             │
//! │  text.rs     - Whitespace normalization and fingerprints    │
//! │  limits.rs   - Size caps and clamping ranges               │
//! │  config.rs   - CaptureConfig, PollSettings                  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Service Layer                             │
//! │  ingest.rs   - Guards and store forwarding                  │
//! │  watcher.rs  - Tick state machine and polling thread        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Application Layer                          │
//! │  controller.rs - Enable/disable lifecycle                   │
//! │  history.rs    - ClipHistory facade                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cliplog_capture::{CaptureConfig, ClipHistory, PauseFlag};
//! use cliplog_clipboard::SystemClipboard;
//! use cliplog_storage::Database;
//! use std::sync::Arc;
//!
//! let store = Arc::new(Database::open(&path)?);
//! let pause = PauseFlag::new();
//! let history = ClipHistory::new(
//!     store,
//!     Arc::new(SystemClipboard::new()),
//!     Arc::new(pause.clone()),
//!     CaptureConfig::default(),
//! );
//! history.start()?;
//! ```

mod config;
mod controller;
mod error;
mod history;
mod ingest;
mod limits;
mod pause;
mod text;
mod watcher;

pub use config::{CaptureConfig, PollSettings};
pub use controller::WatcherController;
pub use error::CaptureError;
pub use history::ClipHistory;
pub use ingest::{IngestOutcome, IngestionService, RejectReason};
pub use limits::{
    clamp_min_clip_length, clamp_retention, DEFAULT_RETENTION_LIMIT, MAX_TEXT_LEN,
    MIN_CLIP_LENGTH_RANGE, PRUNE_EVERY, RETENTION_RANGE, SELF_COPY_WINDOW,
};
pub use pause::{NeverPaused, PauseFlag, PauseRef, PauseSource};
pub use text::{fingerprint, normalize};
pub use watcher::{CaptureCallback, ClipboardWatcher, Tick, TickOutcome, WatcherState};
