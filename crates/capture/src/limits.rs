//! Capture limits and retention bounds.
//!
//! Single source of truth for the size guards and clamping ranges shared by
//! the watcher, the ingestion service and configuration.

use std::ops::RangeInclusive;
use std::time::Duration;

/// Longest clipboard text (in chars) the watcher or ingestion will accept.
pub const MAX_TEXT_LEN: usize = 50_000;

/// Allowed values for the retention limit (non-favorite entries kept).
pub const RETENTION_RANGE: RangeInclusive<usize> = 100..=50_000;

/// Allowed values for the minimum clip length. 0 disables the guard.
pub const MIN_CLIP_LENGTH_RANGE: RangeInclusive<usize> = 0..=10_000;

pub const DEFAULT_RETENTION_LIMIT: usize = 800;

/// How long after the app writes to the clipboard an identical capture is
/// treated as the echo of that write.
pub const SELF_COPY_WINDOW: Duration = Duration::from_millis(1500);

/// Retention pruning runs after every this many forwarded inserts.
pub const PRUNE_EVERY: u64 = 10;

pub fn clamp_retention(limit: usize) -> usize {
    limit.clamp(*RETENTION_RANGE.start(), *RETENTION_RANGE.end())
}

pub fn clamp_min_clip_length(len: usize) -> usize {
    len.clamp(*MIN_CLIP_LENGTH_RANGE.start(), *MIN_CLIP_LENGTH_RANGE.end())
}

/// Whether `text` exceeds [`MAX_TEXT_LEN`] characters.
///
/// Checks the byte length first so the common short case never walks the string.
pub fn exceeds_max_len(text: &str) -> bool {
    text.len() > MAX_TEXT_LEN && text.chars().count() > MAX_TEXT_LEN
}
