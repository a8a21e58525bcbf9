//! Ingestion service - decides which captured text becomes a history entry.
//!
//! Guards, in order: empty, minimum length, maximum length, self-copy
//! suppression, fast in-memory dedup. Survivors are fingerprinted and handed
//! to the store, which dedups again on the fingerprint.

use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::limits::{
    clamp_min_clip_length, clamp_retention, exceeds_max_len, PRUNE_EVERY, SELF_COPY_WINDOW,
};
use crate::text::{fingerprint, normalize};
use cliplog_storage::{ClipRepository, Database, InsertOutcome, NewClip, StorageError};
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Why a capture was dropped. None of these are failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Blank after trimming or normalization.
    Empty,
    /// Shorter than the configured minimum length.
    TooShort,
    /// Longer than [`MAX_TEXT_LEN`](crate::MAX_TEXT_LEN).
    TooLong,
    /// Echo of text this application just put on the clipboard.
    SelfCopy,
    /// Same text as the last capture forwarded to the store.
    RecentDuplicate,
}

/// Result of [`IngestionService::ingest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new entry was created.
    Stored(i64),
    /// The store already had an entry with this fingerprint.
    AlreadyStored,
    Rejected(RejectReason),
}

struct PushedAnchor {
    normalized: String,
    at: Instant,
}

/// Turns raw clipboard captures into store inserts.
///
/// Safe to share between the watcher thread and foreground callers.
pub struct IngestionService<R = Database> {
    repo: Arc<R>,
    retention_limit: AtomicUsize,
    min_clip_length: AtomicUsize,
    last_ingested: Mutex<Option<String>>,
    last_pushed: Mutex<Option<PushedAnchor>>,
    self_copy_window: Duration,
    forwarded: AtomicU64,
    last_created_at: AtomicI64,
}

impl<R> IngestionService<R>
where
    R: ClipRepository<Error = StorageError>,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self::with_config(repo, &CaptureConfig::default())
    }

    pub fn with_config(repo: Arc<R>, config: &CaptureConfig) -> Self {
        let config = config.normalized();
        Self {
            repo,
            retention_limit: AtomicUsize::new(config.retention_limit),
            min_clip_length: AtomicUsize::new(config.min_clip_length),
            last_ingested: Mutex::new(None),
            last_pushed: Mutex::new(None),
            self_copy_window: SELF_COPY_WINDOW,
            forwarded: AtomicU64::new(0),
            last_created_at: AtomicI64::new(0),
        }
    }

    /// Override the self-copy suppression window.
    pub fn with_self_copy_window(mut self, window: Duration) -> Self {
        self.self_copy_window = window;
        self
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    pub fn retention_limit(&self) -> usize {
        self.retention_limit.load(Ordering::SeqCst)
    }

    pub fn min_clip_length(&self) -> usize {
        self.min_clip_length.load(Ordering::SeqCst)
    }

    /// Update limits. Takes effect on the next [`Self::ingest`] call.
    pub fn apply_config(&self, retention_limit: usize, min_clip_length: usize) {
        let retention_limit = clamp_retention(retention_limit);
        let min_clip_length = clamp_min_clip_length(min_clip_length);
        self.retention_limit.store(retention_limit, Ordering::SeqCst);
        self.min_clip_length.store(min_clip_length, Ordering::SeqCst);
        tracing::debug!(retention_limit, min_clip_length, "ingestion config applied");
    }

    /// Process one captured text.
    ///
    /// Store failures are returned so the watcher can retry the same text;
    /// policy drops come back as [`IngestOutcome::Rejected`].
    pub fn ingest(&self, raw: &str) -> Result<IngestOutcome, CaptureError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(IngestOutcome::Rejected(RejectReason::Empty));
        }

        let min_len = self.min_clip_length();
        if min_len > 0 && trimmed.chars().count() < min_len {
            tracing::debug!(min_len, "capture below minimum length");
            return Ok(IngestOutcome::Rejected(RejectReason::TooShort));
        }

        if exceeds_max_len(trimmed) {
            tracing::debug!(bytes = trimmed.len(), "capture over size cap");
            return Ok(IngestOutcome::Rejected(RejectReason::TooLong));
        }

        let normalized = normalize(trimmed);
        if normalized.is_empty() {
            return Ok(IngestOutcome::Rejected(RejectReason::Empty));
        }

        if self.is_self_copy(&normalized) {
            tracing::debug!("ignoring echo of app clipboard write");
            return Ok(IngestOutcome::Rejected(RejectReason::SelfCopy));
        }

        if lock(&self.last_ingested).as_deref() == Some(normalized.as_str()) {
            return Ok(IngestOutcome::Rejected(RejectReason::RecentDuplicate));
        }

        let hash = fingerprint(&normalized);
        let created_at = self.next_timestamp();
        let outcome = self.repo.insert(&NewClip {
            content: trimmed,
            content_norm: &normalized,
            content_hash: &hash,
            created_at,
        })?;

        *lock(&self.last_ingested) = Some(normalized);

        let forwarded = self.forwarded.fetch_add(1, Ordering::SeqCst) + 1;
        if forwarded % PRUNE_EVERY == 0 {
            self.prune_quietly();
        }

        Ok(match outcome {
            InsertOutcome::Inserted(id) => {
                tracing::debug!(id, hash = &hash[..12], bytes = trimmed.len(),"stored clipboard entry");
                IngestOutcome::Stored(id)
            }
            InsertOutcome::Duplicate => {
                tracing::debug!(hash = &hash[..12], "clipboard entry already stored");
                IngestOutcome::AlreadyStored
            }
        })
    }

    /// Record that the application is about to put `text` on the clipboard,
    /// so the watcher's capture of it is dropped instead of stored.
    pub fn mark_pushed_by_app(&self, text: &str) {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return;
        }

        *lock(&self.last_pushed) = Some(PushedAnchor {
            normalized: normalized.clone(),
            at: Instant::now(),
        });

        // Covers a capture that arrives after the suppression window.
        *lock(&self.last_ingested) = Some(normalized);
    }

    /// Prune to the current retention limit now.
    pub fn prune_now(&self) -> Result<usize, CaptureError> {
        Ok(self.repo.prune_to_limit(self.retention_limit())?)
    }

    fn prune_quietly(&self) {
        let limit = self.retention_limit();
        match self.repo.prune_to_limit(limit) {
            Ok(removed) => tracing::debug!(removed, limit, "retention maintenance done"),
            Err(e) => tracing::warn!(error = %e, limit, "retention maintenance failed"),
        }
    }

    fn is_self_copy(&self, normalized: &str) -> bool {
        match lock(&self.last_pushed).as_ref() {
            Some(anchor) => {
                anchor.normalized == normalized && anchor.at.elapsed() <= self.self_copy_window
            }
            None => false,
        }
    }

    /// Wall-clock millis, never lower than a previously issued value.
    fn next_timestamp(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let previous = self.last_created_at.fetch_max(now, Ordering::SeqCst);
        previous.max(now)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::MAX_TEXT_LEN;

    fn service() -> IngestionService {
        IngestionService::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    fn count(service: &IngestionService) -> usize {
        service.repository().count().unwrap()
    }

    #[test]
    fn test_trims_and_normalizes() {
        let service = service();
        let outcome = service.ingest("  hello   world  ").unwrap();
        let IngestOutcome::Stored(id) = outcome else {
            panic!("expected a stored entry, got {outcome:?}");
        };

        let entry = service.repository().get(id).unwrap();
        assert_eq!(entry.content, "hello   world");
        assert_eq!(entry.content_norm, "hello world");
        assert_eq!(entry.content_hash, fingerprint("hello world"));
        assert_eq!(count(&service), 1);
    }

    #[test]
    fn test_rejects_blank() {
        let service = service();
        assert_eq!(
            service.ingest("").unwrap(),
            IngestOutcome::Rejected(RejectReason::Empty)
        );
        assert_eq!(
            service.ingest(" \n\t ").unwrap(),
            IngestOutcome::Rejected(RejectReason::Empty)
        );
        assert_eq!(count(&service), 0);
    }

    #[test]
    fn test_min_length_applies_at_runtime() {
        let service = service();
        assert!(matches!(service.ingest("ab").unwrap(), IngestOutcome::Stored(_)));

        service.apply_config(800, 5);
        assert_eq!(
            service.ingest("abcd").unwrap(),
            IngestOutcome::Rejected(RejectReason::TooShort)
        );
        assert!(matches!(service.ingest("abcde").unwrap(), IngestOutcome::Stored(_)));

        service.apply_config(800, 0);
        assert!(matches!(service.ingest("x").unwrap(), IngestOutcome::Stored(_)));
    }

    #[test]
    fn test_rejects_oversized() {
        let service = service();
        let text = "y".repeat(MAX_TEXT_LEN + 1);
        assert_eq!(
            service.ingest(&text).unwrap(),
            IngestOutcome::Rejected(RejectReason::TooLong)
        );
    }

    #[test]
    fn test_back_to_back_duplicate_is_absorbed() {
        let service = service();
        assert!(matches!(service.ingest("a").unwrap(), IngestOutcome::Stored(_)));
        assert_eq!(
            service.ingest("a").unwrap(),
            IngestOutcome::Rejected(RejectReason::RecentDuplicate)
        );
        assert_eq!(count(&service), 1);
    }

    #[test]
    fn test_store_dedups_non_adjacent_repeat() {
        let service = service();
        service.ingest("a").unwrap();
        service.ingest("b").unwrap();
        assert_eq!(service.ingest("a").unwrap(), IngestOutcome::AlreadyStored);
        assert_eq!(count(&service), 2);
    }

    #[test]
    fn test_self_copy_within_window_is_dropped() {
        let service = service();
        service.mark_pushed_by_app("X");
        service.ingest("Y").unwrap();

        // Fast dedup now points at "Y", so only suppression can catch this.
        assert_eq!(
            service.ingest("X").unwrap(),
            IngestOutcome::Rejected(RejectReason::SelfCopy)
        );
        assert_eq!(count(&service), 1);
    }

    #[test]
    fn test_self_copy_matches_normalized_text() {
        let service = service();
        service.mark_pushed_by_app("  multi\nline  ");
        assert_eq!(
            service.ingest("multi line").unwrap(),
            IngestOutcome::Rejected(RejectReason::SelfCopy)
        );
    }

    #[test]
    fn test_capture_after_window_is_stored() {
        let service = service().with_self_copy_window(Duration::from_millis(20));
        service.mark_pushed_by_app("X");
        service.ingest("Z").unwrap();

        std::thread::sleep(Duration::from_millis(40));
        assert!(matches!(service.ingest("X").unwrap(), IngestOutcome::Stored(_)));
    }

    #[test]
    fn test_mark_pushed_primes_fast_dedup() {
        let service = service().with_self_copy_window(Duration::ZERO);
        service.mark_pushed_by_app("X");
        std::thread::sleep(Duration::from_millis(2));

        assert_eq!(
            service.ingest("X").unwrap(),
            IngestOutcome::Rejected(RejectReason::RecentDuplicate)
        );
    }

    #[test]
    fn test_prunes_every_tenth_forward() {
        let service = service();
        service.apply_config(100, 0);

        for i in 0..119 {
            service.ingest(&format!("entry {i}")).unwrap();
        }
        // Pruned at the 110th forward, nine more since.
        assert_eq!(count(&service), 109);

        service.ingest("entry 119").unwrap();
        assert_eq!(count(&service), 100);

        let newest = service.repository().list_latest(1).unwrap();
        assert_eq!(newest[0].content, "entry 119");
    }

    #[test]
    fn test_prune_spares_favorites() {
        let service = service();
        service.apply_config(100, 0);

        let IngestOutcome::Stored(fav) = service.ingest("keep me").unwrap() else {
            panic!("expected stored");
        };
        service.repository().set_favorite(fav, true).unwrap();

        for i in 0..200 {
            service.ingest(&format!("filler {i}")).unwrap();
        }
        service.prune_now().unwrap();

        assert!(service.repository().get(fav).unwrap().favorite);
        assert_eq!(count(&service), 101);
    }

    #[test]
    fn test_apply_config_clamps() {
        let service = service();
        service.apply_config(1, 1_000_000);
        assert_eq!(service.retention_limit(), 100);
        assert_eq!(service.min_clip_length(), 10_000);
    }

    #[test]
    fn test_timestamps_non_decreasing() {
        let service = service();
        for i in 0..20 {
            service.ingest(&format!("t{i}")).unwrap();
        }
        let mut entries = service.repository().list_latest(100).unwrap();
        entries.sort_by_key(|e| e.id);
        assert!(entries.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[test]
    fn test_closed_store_is_lifecycle_error() {
        let service = service();
        service.repository().close();

        let err = service.ingest("late").unwrap_err();
        assert!(err.is_lifecycle());
    }

    #[test]
    fn test_store_failure_does_not_advance_fast_dedup() {
        let service = service();
        service.repository().close();
        assert!(service.ingest("retry me").is_err());
        assert!(service.ingest("retry me").is_err(), "must reach the store again");
    }

    #[test]
    fn test_concurrent_ingest_and_mark() {
        let service = Arc::new(service());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let service = Arc::clone(&service);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        if t == 0 {
                            service.mark_pushed_by_app(&format!("pushed {i}"));
                            service.apply_config(500, 0);
                        } else {
                            service.ingest(&format!("shared {i}")).unwrap();
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("thread panicked");
        }

        assert_eq!(count(&service), 25, "one row per distinct text");
    }
}
