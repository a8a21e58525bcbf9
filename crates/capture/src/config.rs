//! Runtime configuration for the capture pipeline.

use crate::limits::{clamp_min_clip_length, clamp_retention, DEFAULT_RETENTION_LIMIT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Watcher timing. All values in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    /// Normal polling interval and the floor for idle/failure backoff.
    pub base_interval_ms: u64,
    /// Interval right after a change was captured.
    pub min_interval_ms: u64,
    /// Ceiling for idle and failure backoff.
    pub max_interval_ms: u64,
    /// Interval while capture is paused.
    pub paused_interval_ms: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            base_interval_ms: 250,
            min_interval_ms: 200,
            max_interval_ms: 3000,
            paused_interval_ms: 600,
        }
    }
}

impl PollSettings {
    /// Enforce `1 <= min <= base <= max`.
    pub fn normalized(self) -> Self {
        let min = self.min_interval_ms.max(1);
        let base = self.base_interval_ms.max(min);
        let max = self.max_interval_ms.max(base);
        Self {
            base_interval_ms: base,
            min_interval_ms: min,
            max_interval_ms: max,
            paused_interval_ms: self.paused_interval_ms.max(1),
        }
    }

    pub fn base(&self) -> Duration {
        Duration::from_millis(self.base_interval_ms)
    }

    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }

    pub fn paused(&self) -> Duration {
        Duration::from_millis(self.paused_interval_ms)
    }
}

/// Settings the host pushes into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Non-favorite entries kept by retention pruning.
    pub retention_limit: usize,
    /// Captures shorter than this (in chars) are ignored. 0 disables.
    pub min_clip_length: usize,
    pub watcher_enabled: bool,
    pub poll: PollSettings,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            retention_limit: DEFAULT_RETENTION_LIMIT,
            min_clip_length: 0,
            watcher_enabled: true,
            poll: PollSettings::default(),
        }
    }
}

impl CaptureConfig {
    /// Copy with every field clamped into its valid range.
    pub fn normalized(&self) -> Self {
        Self {
            retention_limit: clamp_retention(self.retention_limit),
            min_clip_length: clamp_min_clip_length(self.min_clip_length),
            watcher_enabled: self.watcher_enabled,
            poll: self.poll.normalized(),
        }
    }
}
