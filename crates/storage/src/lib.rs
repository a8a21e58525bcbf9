//! Durable clipboard history for cliplog.
//!
//! Entries live in a single SQLite table. The `content_hash` column carries a
//! UNIQUE constraint, so a fingerprint can only ever be stored once no matter
//! how many processes or restarts try to insert it. Favorites are exempt from
//! retention pruning.

mod database;

use serde::{Deserialize, Serialize};

pub use database::{escape_like, Database, BUSY_TIMEOUT};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("database is closed")]
    Closed,
}

impl StorageError {
    /// SQLITE_BUSY / SQLITE_LOCKED after the busy timeout ran out.
    ///
    /// These clear on their own and are worth retrying.
    pub fn is_busy(&self) -> bool {
        match self {
            StorageError::DatabaseError(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// A persisted clipboard capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipEntry {
    pub id: i64,
    /// Captured text, trimmed at the edges only.
    pub content: String,
    /// Whitespace-collapsed form the fingerprint was computed from.
    pub content_norm: String,
    pub content_hash: String,
    pub favorite: bool,
    /// Capture time in milliseconds since the Unix epoch.
    pub created_at: i64,
}

/// Row data for [`ClipRepository::insert`].
#[derive(Debug, Clone, Copy)]
pub struct NewClip<'a> {
    pub content: &'a str,
    pub content_norm: &'a str,
    pub content_hash: &'a str,
    pub created_at: i64,
}

/// Result of an insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was created with this id.
    Inserted(i64),
    /// A row with the same fingerprint already exists; nothing changed.
    Duplicate,
}

/// Repository for clipboard history persistence.
pub trait ClipRepository: Send + Sync {
    type Error;

    /// Insert unless an entry with the same `content_hash` exists.
    fn insert(&self, clip: &NewClip<'_>) -> std::result::Result<InsertOutcome, Self::Error>;

    /// Up to `limit` entries, favorites first, newest first.
    fn list_latest(&self, limit: usize) -> std::result::Result<Vec<ClipEntry>, Self::Error>;

    /// Entries whose content contains `query` literally, same ordering as [`Self::list_latest`].
    fn search(&self, query: &str, limit: usize)
        -> std::result::Result<Vec<ClipEntry>, Self::Error>;

    fn get(&self, id: i64) -> std::result::Result<ClipEntry, Self::Error>;
    fn delete_by_id(&self, id: i64) -> std::result::Result<(), Self::Error>;
    fn set_favorite(&self, id: i64, favorite: bool) -> std::result::Result<(), Self::Error>;

    /// Remove every entry not marked favorite. Returns the number removed.
    fn delete_all_non_favorites(&self) -> std::result::Result<usize, Self::Error>;

    /// Keep only the `limit` newest non-favorite entries. Favorites are never
    /// counted or removed. Returns the number removed.
    fn prune_to_limit(&self, limit: usize) -> std::result::Result<usize, Self::Error>;
}
