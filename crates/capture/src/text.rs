//! Text normalization and fingerprinting.
//!
//! Pure functions. The watcher and the ingestion service both go through
//! [`normalize`], so "same content" means the same thing everywhere.

use sha2::{Digest, Sha256};

/// Collapse every whitespace run (spaces, tabs, newlines) into a single
/// space and trim both ends.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Hex-encoded SHA-256 of normalized text; the store-level dedup key.
pub fn fingerprint(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}
