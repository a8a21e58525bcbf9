//! [`ClipHistory`] wires the watcher, ingestion and store into one handle.

use crate::config::CaptureConfig;
use crate::controller::WatcherController;
use crate::error::CaptureError;
use crate::ingest::IngestionService;
use crate::pause::PauseRef;
use crate::watcher::CaptureCallback;
use cliplog_clipboard::ClipboardRef;
use cliplog_storage::{ClipEntry, ClipRepository, Database};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const IDLE: u8 = 0;
const STARTED: u8 = 1;
const SHUT_DOWN: u8 = 2;

/// The capture pipeline as the host application sees it.
pub struct ClipHistory {
    store: Arc<Database>,
    ingestion: Arc<IngestionService<Database>>,
    clipboard: ClipboardRef,
    controller: WatcherController,
    config: Mutex<CaptureConfig>,
    phase: AtomicU8,
}

impl ClipHistory {
    pub fn new(
        store: Arc<Database>,
        clipboard: ClipboardRef,
        pause: PauseRef,
        config: CaptureConfig,
    ) -> Self {
        let ingestion = Arc::new(IngestionService::with_config(Arc::clone(&store), &config));
        Self::with_ingestion(ingestion, clipboard, pause, config)
    }

    /// Build around an existing ingestion service. Its repository becomes the
    /// store this handle reads from.
    pub fn with_ingestion(
        ingestion: Arc<IngestionService<Database>>,
        clipboard: ClipboardRef,
        pause: PauseRef,
        config: CaptureConfig,
    ) -> Self {
        let config = config.normalized();
        ingestion.apply_config(config.retention_limit, config.min_clip_length);

        let sink = Arc::clone(&ingestion);
        let on_text: CaptureCallback =
            Arc::new(move |text: &str| sink.ingest(text).map(|_| ()));

        let controller = WatcherController::new(clipboard.clone(), pause, on_text, config.poll);

        Self {
            store: Arc::clone(ingestion.repository()),
            ingestion,
            clipboard,
            controller,
            config: Mutex::new(config),
            phase: AtomicU8::new(IDLE),
        }
    }

    /// Begin capturing if the config has the watcher enabled.
    pub fn start(&self) -> Result<(), CaptureError> {
        if self
            .phase
            .compare_exchange(IDLE, STARTED, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return match self.phase.load(Ordering::SeqCst) {
                SHUT_DOWN => Err(CaptureError::Closed),
                _ => Ok(()),
            };
        }

        if self.config().watcher_enabled {
            self.controller.enable()?;
        } else {
            tracing::info!("clipboard capture disabled by config");
        }
        Ok(())
    }

    /// Stop the watcher, then close the store. Idempotent.
    pub fn shutdown(&self) {
        if self.phase.swap(SHUT_DOWN, Ordering::SeqCst) == SHUT_DOWN {
            return;
        }
        self.controller.disable();
        self.store.close();
        tracing::info!("clipboard history shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.phase.load(Ordering::SeqCst) == SHUT_DOWN
    }

    pub fn is_capturing(&self) -> bool {
        self.controller.is_enabled()
    }

    /// Put `text` on the system clipboard without recording it again.
    pub fn copy_to_clipboard(&self, text: &str) -> Result<(), CaptureError> {
        self.ensure_open()?;
        self.ingestion.mark_pushed_by_app(text);
        self.clipboard.write_text(text)?;
        Ok(())
    }

    /// Copy a stored entry back to the clipboard.
    pub fn copy_entry(&self, id: i64) -> Result<ClipEntry, CaptureError> {
        let entry = self.store.get(id)?;
        self.copy_to_clipboard(&entry.content)?;
        Ok(entry)
    }

    /// Push new settings into the running pipeline.
    ///
    /// Limits apply to the next capture. A poll change restarts the watcher.
    /// `watcher_enabled` turns capture on or off once [`Self::start`] ran.
    pub fn apply_config(&self, config: &CaptureConfig) -> Result<(), CaptureError> {
        self.ensure_open()?;
        let config = config.normalized();

        self.ingestion
            .apply_config(config.retention_limit, config.min_clip_length);
        self.controller.set_poll_settings(config.poll)?;

        if self.phase.load(Ordering::SeqCst) == STARTED {
            if config.watcher_enabled {
                self.controller.enable()?;
            } else {
                self.controller.disable();
            }
        }

        *self.lock_config() = config;
        Ok(())
    }

    pub fn config(&self) -> CaptureConfig {
        self.lock_config().clone()
    }

    pub fn store(&self) -> &Arc<Database> {
        &self.store
    }

    pub fn ingestion(&self) -> &Arc<IngestionService<Database>> {
        &self.ingestion
    }

    pub fn controller(&self) -> &WatcherController {
        &self.controller
    }

    fn ensure_open(&self) -> Result<(), CaptureError> {
        if self.is_shut_down() {
            return Err(CaptureError::Closed);
        }
        Ok(())
    }

    fn lock_config(&self) -> MutexGuard<'_, CaptureConfig> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ClipHistory {
    fn drop(&mut self) {
        self.controller.disable();
    }
}
