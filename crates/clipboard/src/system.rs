//! OS clipboard adapter backed by arboard.

use crate::{ClipboardError, ClipboardPort};

/// [`ClipboardPort`] implementation using arboard.
///
/// A fresh `arboard::Clipboard` is opened per call so no OS handle is held
/// between watcher ticks.
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }

    fn open() -> Result<arboard::Clipboard, ClipboardError> {
        arboard::Clipboard::new().map_err(map_error)
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardPort for SystemClipboard {
    fn read_text(&self) -> Result<Option<String>, ClipboardError> {
        let mut clipboard = Self::open()?;
        match clipboard.get_text() {
            Ok(text) if text.is_empty() => Ok(None),
            Ok(text) => Ok(Some(text)),
            // Empty clipboard, or an image/file list: nothing for us to capture.
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(arboard::Error::ConversionFailure) => Ok(None),
            Err(e) => Err(map_error(e)),
        }
    }

    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard = Self::open()?;
        clipboard.set_text(text.to_owned()).map_err(map_error)?;
        tracing::debug!(len = text.len(), "wrote text to system clipboard");
        Ok(())
    }
}

fn map_error(err: arboard::Error) -> ClipboardError {
    match err {
        arboard::Error::ClipboardOccupied => ClipboardError::Busy,
        other => ClipboardError::Unavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occupied_maps_to_busy() {
        let err = map_error(arboard::Error::ClipboardOccupied);
        assert!(matches!(err, ClipboardError::Busy));
        assert!(err.is_transient());
    }

    #[test]
    fn test_other_errors_map_to_unavailable() {
        let err = map_error(arboard::Error::ClipboardNotSupported);
        assert!(matches!(err, ClipboardError::Unavailable(_)));
        assert!(!err.is_transient());
    }
}
