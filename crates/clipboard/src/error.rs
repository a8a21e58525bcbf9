//! Error types for clipboard access.

use thiserror::Error;

/// Errors returned by a [`ClipboardPort`](crate::ClipboardPort).
///
/// Both variants are recoverable: callers retry on their own schedule.
#[derive(Debug, Error)]
pub enum ClipboardError {
    /// Another process currently holds the clipboard.
    #[error("clipboard is occupied by another process")]
    Busy,

    /// The clipboard backend could not be opened or failed unexpectedly.
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
}

impl ClipboardError {
    /// Whether the failure is lock contention that usually clears within milliseconds.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClipboardError::Busy)
    }
}
