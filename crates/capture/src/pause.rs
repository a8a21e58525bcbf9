//! Pause state the watcher pulls once per tick.
//!
//! The watcher queries this synchronously instead of subscribing to events,
//! so any boolean the host owns (a tray toggle, a CLI flag) can drive it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Source of the "capture paused" flag.
pub trait PauseSource: Send + Sync {
    fn is_paused(&self) -> bool;
}

/// Shared pause source handle.
pub type PauseRef = Arc<dyn PauseSource>;

/// Pause source that never pauses.
pub struct NeverPaused;

impl PauseSource for NeverPaused {
    fn is_paused(&self) -> bool {
        false
    }
}

/// Cloneable pause toggle backed by an atomic flag.
#[derive(Debug, Clone, Default)]
pub struct PauseFlag {
    paused: Arc<AtomicBool>,
}

impl PauseFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Flip the flag and return the new state.
    pub fn toggle(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::SeqCst)
    }
}

impl PauseSource for PauseFlag {
    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_flag_toggle() {
        let flag = PauseFlag::new();
        assert!(!flag.is_paused());

        assert!(flag.toggle());
        assert!(flag.is_paused());

        assert!(!flag.toggle());
        assert!(!flag.is_paused());
    }

    #[test]
    fn test_clones_share_state() {
        let flag = PauseFlag::new();
        let other = flag.clone();
        flag.pause();
        assert!(other.is_paused());
        other.resume();
        assert!(!flag.is_paused());
    }

    #[test]
    fn test_never_paused() {
        assert!(!NeverPaused.is_paused());
    }
}
