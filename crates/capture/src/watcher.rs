//! Clipboard watcher - adaptive polling loop that detects new clipboard text.
//!
//! The decision logic lives in [`WatcherState::tick`], a synchronous step
//! that returns how long to wait before the next one. [`ClipboardWatcher`]
//! runs that step on a dedicated thread; ticks never overlap because the
//! next one is only scheduled after the previous one returned.

use crate::config::PollSettings;
use crate::error::CaptureError;
use crate::limits::exceeds_max_len;
use crate::pause::{PauseRef, PauseSource};
use crate::text::normalize;
use cliplog_clipboard::{ClipboardPort, ClipboardRef};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Receives newly captured clipboard text (trimmed, not normalized).
///
/// Returning an error makes the watcher offer the same text again on a
/// later tick, after failure backoff.
pub type CaptureCallback = Arc<dyn Fn(&str) -> Result<(), CaptureError> + Send + Sync + 'static>;

/// Idle backoff steps: after more than `n` consecutive ticks without a
/// change, wait at least this many milliseconds.
const IDLE_STEPS: &[(u32, u64)] = &[(10, 0), (30, 400), (60, 650), (120, 1000), (240, 2000)];

/// Failure backoff doubles at most this many times.
const MAX_FAILURE_DOUBLINGS: u32 = 4;

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Capture is paused; the clipboard was re-snapshotted.
    Paused,
    /// First tick after a pause; the clipboard was re-snapshotted.
    Resumed,
    /// Nothing new (empty, oversized, or unchanged clipboard).
    Idle,
    /// New text was handed to the callback.
    Captured,
    /// The clipboard read or the callback failed.
    Failed,
}

/// Result of [`WatcherState::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub outcome: TickOutcome,
    pub next_delay: Duration,
}

/// In-memory capture state of one watcher.
#[derive(Debug)]
pub struct WatcherState {
    settings: PollSettings,
    last_seen: Option<String>,
    was_paused: bool,
    consecutive_failures: u32,
    consecutive_no_change: u32,
}

impl WatcherState {
    pub fn new(settings: PollSettings) -> Self {
        Self {
            settings: settings.normalized(),
            last_seen: None,
            was_paused: false,
            consecutive_failures: 0,
            consecutive_no_change: 0,
        }
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Normalized text the watcher believes is on the clipboard.
    pub fn last_seen(&self) -> Option<&str> {
        self.last_seen.as_deref()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn consecutive_no_change(&self) -> u32 {
        self.consecutive_no_change
    }

    /// Barrier: record whatever is on the clipboard right now as already seen.
    ///
    /// Read failures keep the previous value.
    pub fn snapshot(&mut self, clipboard: &dyn ClipboardPort) {
        match clipboard.read_text() {
            Ok(Some(raw)) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() || exceeds_max_len(trimmed) {
                    return;
                }
                self.last_seen = Some(normalize(trimmed));
            }
            Ok(None) => {}
            Err(e) => tracing::debug!(error = %e, "clipboard snapshot skipped"),
        }
    }

    /// Run one polling step.
    pub fn tick(
        &mut self,
        clipboard: &dyn ClipboardPort,
        pause: &dyn PauseSource,
        on_text: &dyn Fn(&str) -> Result<(), CaptureError>,
    ) -> Tick {
        if pause.is_paused() {
            if !self.was_paused {
                tracing::debug!("clipboard capture paused");
            }
            self.was_paused = true;
            self.snapshot(clipboard);
            self.reset_counters();
            return Tick {
                outcome: TickOutcome::Paused,
                next_delay: self.settings.paused(),
            };
        }

        if self.was_paused {
            tracing::debug!("clipboard capture resumed");
            self.was_paused = false;
            self.snapshot(clipboard);
            self.reset_counters();
            return Tick {
                outcome: TickOutcome::Resumed,
                next_delay: self.settings.base(),
            };
        }

        let raw = match clipboard.read_text() {
            Ok(Some(raw)) => raw,
            Ok(None) => return self.idle(),
            Err(e) => {
                tracing::debug!(error = %e, "clipboard read failed");
                return self.failed();
            }
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() || exceeds_max_len(trimmed) {
            return self.idle();
        }

        let norm = normalize(trimmed);
        if self.last_seen.as_deref() == Some(norm.as_str()) {
            return self.idle();
        }

        // Mark as seen before the callback so a slow callback cannot re-trigger it.
        let previous = self.last_seen.replace(norm);
        self.consecutive_no_change = 0;

        match on_text(trimmed) {
            Ok(()) => {
                self.consecutive_failures = 0;
                Tick {
                    outcome: TickOutcome::Captured,
                    next_delay: self.settings.min(),
                }
            }
            Err(e) => {
                if e.is_lifecycle() {
                    tracing::error!(error = %e, "capture callback used after shutdown");
                } else {
                    tracing::warn!(error = %e, "capture callback failed, will retry");
                }
                self.last_seen = previous;
                self.failed()
            }
        }
    }

    /// Apply failure backoff without a tick, e.g. after the tick panicked.
    pub fn record_failure(&mut self) -> Duration {
        self.failed().next_delay
    }

    fn reset_counters(&mut self) {
        self.consecutive_failures = 0;
        self.consecutive_no_change = 0;
    }

    fn idle(&mut self) -> Tick {
        self.consecutive_failures = 0;
        self.consecutive_no_change = self.consecutive_no_change.saturating_add(1);
        Tick {
            outcome: TickOutcome::Idle,
            next_delay: self.idle_delay(),
        }
    }

    fn failed(&mut self) -> Tick {
        self.consecutive_no_change = 0;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        Tick {
            outcome: TickOutcome::Failed,
            next_delay: self.failure_delay(),
        }
    }

    fn idle_delay(&self) -> Duration {
        let step_ms = IDLE_STEPS
            .iter()
            .find(|(threshold, _)| self.consecutive_no_change <= *threshold)
            .map(|(_, ms)| *ms)
            .unwrap_or(self.settings.max_interval_ms);
        self.clamp_delay(step_ms)
    }

    fn failure_delay(&self) -> Duration {
        let doublings = self.consecutive_failures.min(MAX_FAILURE_DOUBLINGS);
        let ms = self.settings.base_interval_ms.saturating_mul(1 << doublings);
        self.clamp_delay(ms)
    }

    fn clamp_delay(&self, ms: u64) -> Duration {
        Duration::from_millis(ms.clamp(
            self.settings.base_interval_ms,
            self.settings.max_interval_ms,
        ))
    }
}

/// Background clipboard watcher.
///
/// `start` snapshots the clipboard synchronously, so text already present
/// when capture begins is never reported.
pub struct ClipboardWatcher {
    clipboard: ClipboardRef,
    pause: PauseRef,
    on_text: CaptureCallback,
    settings: PollSettings,
    running: Arc<AtomicBool>,
    closed: bool,
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ClipboardWatcher {
    pub fn new(clipboard: ClipboardRef, pause: PauseRef, on_text: CaptureCallback) -> Self {
        Self::with_settings(clipboard, pause, on_text, PollSettings::default())
    }

    pub fn with_settings(
        clipboard: ClipboardRef,
        pause: PauseRef,
        on_text: CaptureCallback,
        settings: PollSettings,
    ) -> Self {
        Self {
            clipboard,
            pause,
            on_text,
            settings: settings.normalized(),
            running: Arc::new(AtomicBool::new(false)),
            closed: false,
            shutdown: None,
            handle: None,
        }
    }

    /// Take the startup snapshot and begin polling. No-op if already running.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.closed {
            return Err(CaptureError::Closed);
        }
        if self.handle.is_some() {
            tracing::warn!("ClipboardWatcher already running");
            return Ok(());
        }

        let mut state = WatcherState::new(self.settings);
        state.snapshot(&*self.clipboard);

        let (tx, rx) = crossbeam_channel::bounded::<()>(1);
        let clipboard = Arc::clone(&self.clipboard);
        let pause = Arc::clone(&self.pause);
        let on_text = Arc::clone(&self.on_text);
        let running = Arc::clone(&self.running);

        self.running.store(true, Ordering::SeqCst);
        let handle = std::thread::Builder::new()
            .name("cliplog-clipboard-watcher".into())
            .spawn(move || run_loop(state, clipboard, pause, on_text, rx, running))
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                CaptureError::Spawn(e)
            })?;

        self.shutdown = Some(tx);
        self.handle = Some(handle);
        Ok(())
    }

    /// Stop polling. A tick already in progress finishes first; a scheduled
    /// tick is discarded. Idempotent.
    pub fn close(&mut self) {
        self.closed = true;

        // Dropping the sender wakes the loop out of its wait.
        drop(self.shutdown.take());

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("clipboard watcher thread panicked");
            }
        }
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for ClipboardWatcher {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_loop(
    mut state: WatcherState,
    clipboard: ClipboardRef,
    pause: PauseRef,
    on_text: CaptureCallback,
    shutdown: Receiver<()>,
    running: Arc<AtomicBool>,
) {
    tracing::info!(
        base_ms = state.settings().base_interval_ms,
        max_ms = state.settings().max_interval_ms,
        "ClipboardWatcher started"
    );

    let mut delay = state.settings().base();
    loop {
        match shutdown.recv_timeout(delay) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        let tick = panic::catch_unwind(AssertUnwindSafe(|| {
            state.tick(&*clipboard, &*pause, &*on_text)
        }));

        delay = match tick {
            Ok(tick) => tick.next_delay,
            Err(_) => {
                tracing::error!("clipboard watcher tick panicked");
                state.record_failure()
            }
        };
    }

    running.store(false, Ordering::SeqCst);
    tracing::info!("ClipboardWatcher stopped");
}
