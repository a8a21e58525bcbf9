//! In-process clipboard for tests and headless runs.

use crate::{ClipboardError, ClipboardPort};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Clipboard that lives entirely in memory.
///
/// Supports scripted read failures so callers can exercise retry paths.
#[derive(Default)]
pub struct MemoryClipboard {
    text: Mutex<Option<String>>,
    failing_reads: AtomicUsize,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clipboard that already holds `text`.
    pub fn with_text(text: impl Into<String>) -> Self {
        let clipboard = Self::default();
        clipboard.set(text);
        clipboard
    }

    /// Simulate another application copying `text`.
    pub fn set(&self, text: impl Into<String>) {
        *self.slot() = Some(text.into());
    }

    /// Simulate the clipboard being emptied or holding a non-text format.
    pub fn clear(&self) {
        *self.slot() = None;
    }

    /// Current contents without counting as a read.
    pub fn peek(&self) -> Option<String> {
        self.slot().clone()
    }

    /// Make the next `count` reads fail with [`ClipboardError::Busy`].
    pub fn fail_next_reads(&self, count: usize) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    /// Number of `read_text` calls so far, including failed ones.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of successful `write_text` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn slot(&self) -> MutexGuard<'_, Option<String>> {
        self.text.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ClipboardPort for MemoryClipboard {
    fn read_text(&self) -> Result<Option<String>, ClipboardError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let should_fail = self
            .failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(ClipboardError::Busy);
        }

        Ok(self.slot().clone().filter(|s| !s.is_empty()))
    }

    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.set(text);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
