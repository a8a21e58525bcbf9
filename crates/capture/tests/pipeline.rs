//! End-to-end tests: in-memory clipboard -> watcher -> ingestion -> SQLite.

use cliplog_capture::{CaptureConfig, ClipHistory, NeverPaused, PauseFlag, PauseRef, PollSettings};
use cliplog_clipboard::MemoryClipboard;
use cliplog_storage::{ClipRepository, Database};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn fast_config() -> CaptureConfig {
    CaptureConfig {
        poll: PollSettings {
            base_interval_ms: 10,
            min_interval_ms: 5,
            max_interval_ms: 30,
            paused_interval_ms: 10,
        },
        ..CaptureConfig::default()
    }
}

fn create_history(clipboard: &Arc<MemoryClipboard>, pause: PauseRef) -> ClipHistory {
    let store = Arc::new(Database::open_in_memory().expect("Failed to create in-memory database"));
    ClipHistory::new(store, clipboard.clone(), pause, fast_config())
}

fn contents(history: &ClipHistory) -> Vec<String> {
    history
        .store()
        .list_latest(1000)
        .unwrap()
        .into_iter()
        .map(|e| e.content)
        .collect()
}

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

/// Give the watcher several ticks to act on whatever is on the clipboard.
fn settle() {
    std::thread::sleep(Duration::from_millis(80));
}

// =============================================================================
// Capture Tests
// =============================================================================

mod capture {
    use super::*;

    #[test]
    fn test_prior_content_is_not_recorded() {
        let clipboard = Arc::new(MemoryClipboard::with_text("PRIOR"));
        let history = create_history(&clipboard, Arc::new(NeverPaused));
        history.start().unwrap();

        settle();
        assert!(contents(&history).is_empty());

        clipboard.set("NEW");
        assert!(wait_until(|| contents(&history) == ["NEW"]));
        history.shutdown();
    }

    #[test]
    fn test_successive_copies_recorded_newest_first() {
        let clipboard = Arc::new(MemoryClipboard::new());
        let history = create_history(&clipboard, Arc::new(NeverPaused));
        history.start().unwrap();

        for text in ["first", "second", "third"] {
            clipboard.set(text);
            assert!(wait_until(|| contents(&history).first().map(String::as_str) == Some(text)));
        }

        assert_eq!(contents(&history), ["third", "second", "first"]);
        history.shutdown();
    }

    #[test]
    fn test_whitespace_variant_not_recorded_twice() {
        let clipboard = Arc::new(MemoryClipboard::new());
        let history = create_history(&clipboard, Arc::new(NeverPaused));
        history.start().unwrap();

        clipboard.set("  hello   world  ");
        assert!(wait_until(|| contents(&history).len() == 1));

        clipboard.set("hello world");
        settle();

        assert_eq!(contents(&history), ["hello   world"]);
        history.shutdown();
    }

    #[test]
    fn test_recovers_after_busy_clipboard() {
        let clipboard = Arc::new(MemoryClipboard::new());
        let history = create_history(&clipboard, Arc::new(NeverPaused));
        history.start().unwrap();

        clipboard.fail_next_reads(3);
        clipboard.set("after contention");

        assert!(wait_until(|| contents(&history) == ["after contention"]));
        history.shutdown();
    }
}

// =============================================================================
// Pause Tests
// =============================================================================

mod pause {
    use super::*;

    #[test]
    fn test_content_copied_while_paused_is_skipped() {
        let clipboard = Arc::new(MemoryClipboard::new());
        let flag = PauseFlag::new();
        let history = create_history(&clipboard, Arc::new(flag.clone()));
        history.start().unwrap();

        flag.pause();
        settle();
        clipboard.set("secret");
        settle();

        flag.resume();
        settle();
        assert!(contents(&history).is_empty(), "paused content must stay out");

        clipboard.set("public");
        assert!(wait_until(|| contents(&history) == ["public"]));
        history.shutdown();
    }
}

// =============================================================================
// Copy-Back Tests
// =============================================================================

mod copy_back {
    use super::*;

    #[test]
    fn test_copy_entry_is_not_recaptured() {
        let clipboard = Arc::new(MemoryClipboard::new());
        let history = create_history(&clipboard, Arc::new(NeverPaused));
        history.start().unwrap();

        clipboard.set("older");
        assert!(wait_until(|| contents(&history).len() == 1));
        clipboard.set("newer");
        assert!(wait_until(|| contents(&history).len() == 2));

        let older = history
            .store()
            .search("older", 10)
            .unwrap()
            .pop()
            .expect("entry stored");
        let copied = history.copy_entry(older.id).unwrap();
        assert_eq!(copied.content, "older");

        settle();
        assert_eq!(contents(&history), ["newer", "older"]);
        assert_eq!(history.store().count().unwrap(), 2);
        history.shutdown();
    }

    #[test]
    fn test_copy_of_new_text_is_suppressed() {
        let clipboard = Arc::new(MemoryClipboard::new());
        let history = create_history(&clipboard, Arc::new(NeverPaused));
        history.start().unwrap();

        history.copy_to_clipboard("pushed by app").unwrap();
        settle();

        assert!(contents(&history).is_empty());
        history.shutdown();
    }
}

// =============================================================================
// Maintenance Tests
// =============================================================================

mod maintenance {
    use super::*;

    #[test]
    fn test_favorites_survive_clear() {
        let clipboard = Arc::new(MemoryClipboard::new());
        let history = create_history(&clipboard, Arc::new(NeverPaused));
        let store = history.store();

        let ids: Vec<i64> = ["keep", "drop 1", "drop 2"]
            .iter()
            .map(|text| match history.ingestion().ingest(text).unwrap() {
                cliplog_capture::IngestOutcome::Stored(id) => id,
                other => panic!("expected stored, got {other:?}"),
            })
            .collect();
        store.set_favorite(ids[0], true).unwrap();

        assert_eq!(store.delete_all_non_favorites().unwrap(), 2);
        assert_eq!(contents(&history), ["keep"]);
    }

    #[test]
    fn test_retention_applied_through_config() {
        let clipboard = Arc::new(MemoryClipboard::new());
        let history = create_history(&clipboard, Arc::new(NeverPaused));
        history
            .apply_config(&CaptureConfig {
                retention_limit: 100,
                ..fast_config()
            })
            .unwrap();

        for i in 0..150 {
            history.ingestion().ingest(&format!("clip {i}")).unwrap();
        }

        let remaining = contents(&history);
        assert_eq!(remaining.len(), 100);
        assert_eq!(remaining.first().map(String::as_str), Some("clip 149"));
        assert_eq!(remaining.last().map(String::as_str), Some("clip 50"));
    }

    #[test]
    fn test_history_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cliplog.db");
        let clipboard = Arc::new(MemoryClipboard::new());

        {
            let store = Arc::new(Database::open(&path).unwrap());
            let history = ClipHistory::new(store, clipboard.clone(), Arc::new(NeverPaused), fast_config());
            history.ingestion().ingest("persisted").unwrap();
            history.shutdown();
        }

        let store = Arc::new(Database::open(&path).unwrap());
        let history = ClipHistory::new(store, clipboard, Arc::new(NeverPaused), fast_config());
        assert_eq!(
            history.ingestion().ingest("persisted").unwrap(),
            cliplog_capture::IngestOutcome::AlreadyStored
        );
        assert_eq!(contents(&history), ["persisted"]);
        history.shutdown();
    }
}
