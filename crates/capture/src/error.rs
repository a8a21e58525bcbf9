//! Error types for the capture pipeline.

use cliplog_clipboard::ClipboardError;
use cliplog_storage::StorageError;
use thiserror::Error;

/// Errors surfaced by the capture pipeline.
///
/// Policy drops (too short, duplicate, self-copy) are not errors; see
/// [`IngestOutcome`](crate::IngestOutcome).
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The history store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The clipboard could not be written.
    #[error("clipboard error: {0}")]
    Clipboard(#[from] ClipboardError),

    /// A watcher or history handle was used after shutdown.
    #[error("capture pipeline has been shut down")]
    Closed,

    /// The watcher thread could not be spawned.
    #[error("failed to spawn watcher thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl CaptureError {
    /// Lifecycle misuse: the store or watcher was used after shutdown.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            CaptureError::Closed | CaptureError::Storage(StorageError::Closed)
        )
    }
}
