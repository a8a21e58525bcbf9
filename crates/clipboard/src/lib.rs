//! Clipboard access for cliplog.
//!
//! The rest of the workspace talks to the OS clipboard only through
//! [`ClipboardPort`], so capture logic can be driven by [`MemoryClipboard`]
//! in tests and by [`SystemClipboard`] in the real application.

mod error;
mod memory;
mod system;

use std::sync::Arc;

pub use error::ClipboardError;
pub use memory::MemoryClipboard;
pub use system::SystemClipboard;

/// Read/write access to the shared text clipboard.
///
/// Every call is independent. Implementations must return promptly even when
/// another process holds the clipboard, reporting that as
/// [`ClipboardError::Busy`] instead of blocking.
pub trait ClipboardPort: Send + Sync {
    /// Current clipboard text.
    ///
    /// Returns `Ok(None)` when the clipboard is empty or holds a non-text format.
    fn read_text(&self) -> Result<Option<String>, ClipboardError>;

    /// Replace the clipboard contents with `text`.
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Shared clipboard handle.
pub type ClipboardRef = Arc<dyn ClipboardPort>;
