//! Enable/disable lifecycle over zero or one live [`ClipboardWatcher`].

use crate::config::PollSettings;
use crate::error::CaptureError;
use crate::pause::PauseRef;
use crate::watcher::{CaptureCallback, ClipboardWatcher};
use cliplog_clipboard::ClipboardRef;
use std::sync::{Mutex, MutexGuard, PoisonError};

struct ControllerState {
    watcher: Option<ClipboardWatcher>,
    settings: PollSettings,
}

/// Owns the watcher so callers never juggle its thread themselves.
///
/// Every operation runs under one lock, so concurrent `enable` calls cannot
/// end up with two watchers polling the clipboard.
pub struct WatcherController {
    clipboard: ClipboardRef,
    pause: PauseRef,
    on_text: CaptureCallback,
    state: Mutex<ControllerState>,
}

impl WatcherController {
    pub fn new(
        clipboard: ClipboardRef,
        pause: PauseRef,
        on_text: CaptureCallback,
        settings: PollSettings,
    ) -> Self {
        Self {
            clipboard,
            pause,
            on_text,
            state: Mutex::new(ControllerState {
                watcher: None,
                settings: settings.normalized(),
            }),
        }
    }

    /// Start a fresh watcher. No-op when one is already running.
    pub fn enable(&self) -> Result<(), CaptureError> {
        let mut state = self.lock();
        self.enable_locked(&mut state)
    }

    /// Stop and drop the watcher, joining its thread before returning.
    pub fn disable(&self) {
        let mut state = self.lock();
        Self::disable_locked(&mut state);
    }

    /// Replace a running watcher with a new one. Does nothing while disabled.
    pub fn restart(&self) -> Result<(), CaptureError> {
        let mut state = self.lock();
        if state.watcher.is_none() {
            return Ok(());
        }
        Self::disable_locked(&mut state);
        self.enable_locked(&mut state)
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().watcher.is_some()
    }

    pub fn poll_settings(&self) -> PollSettings {
        self.lock().settings
    }

    /// Store new poll settings, restarting the watcher if they changed.
    pub fn set_poll_settings(&self, settings: PollSettings) -> Result<(), CaptureError> {
        let settings = settings.normalized();
        let mut state = self.lock();
        if state.settings == settings {
            return Ok(());
        }
        state.settings = settings;
        if state.watcher.is_some() {
            tracing::debug!(?settings, "poll settings changed, restarting watcher");
            Self::disable_locked(&mut state);
            self.enable_locked(&mut state)?;
        }
        Ok(())
    }

    fn enable_locked(&self, state: &mut ControllerState) -> Result<(), CaptureError> {
        if state.watcher.is_some() {
            return Ok(());
        }

        let mut watcher = ClipboardWatcher::with_settings(
            self.clipboard.clone(),
            self.pause.clone(),
            self.on_text.clone(),
            state.settings,
        );
        watcher.start()?;
        state.watcher = Some(watcher);
        tracing::info!("clipboard capture enabled");
        Ok(())
    }

    fn disable_locked(state: &mut ControllerState) {
        if let Some(mut watcher) = state.watcher.take() {
            watcher.close();
            tracing::info!("clipboard capture disabled");
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for WatcherController {
    fn drop(&mut self) {
        self.disable();
    }
}
