use crate::{ClipEntry, ClipRepository, InsertOutcome, NewClip, Result, StorageError};
use rusqlite::{params, Connection, OpenFlags, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// How long a statement waits on a locked database before failing with SQLITE_BUSY.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(3);

const ENTRY_COLUMNS: &str = "id, content, content_norm, content_hash, is_favorite, created_at";

/// SQLite-backed clipboard history.
///
/// All writes go through a single connection. File-backed databases open a
/// second, read-only connection so listing and searching never queue behind
/// an insert; WAL mode lets the two run side by side.
pub struct Database {
    writer: Mutex<Option<Connection>>,
    reader: Option<Mutex<Option<Connection>>>,
    path: Option<PathBuf>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let writer = Connection::open(path)?;
        configure(&writer)?;
        writer.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;
        init_schema(&writer)?;

        let reader = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        configure(&reader)?;

        tracing::info!(path = %path.display(), "opened clipboard history database");

        Ok(Self {
            writer: Mutex::new(Some(writer)),
            reader: Some(Mutex::new(Some(reader))),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        configure(&conn)?;
        init_schema(&conn)?;
        Ok(Self {
            writer: Mutex::new(Some(conn)),
            reader: None,
            path: None,
        })
    }

    /// Location on disk, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn count(&self) -> Result<usize> {
        let n: i64 = self.read(|conn| {
            conn.query_row("SELECT COUNT(*) FROM clip_entries", [], |row| row.get(0))
        })?;
        Ok(n as usize)
    }

    pub fn count_favorites(&self) -> Result<usize> {
        let n: i64 = self.read(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM clip_entries WHERE is_favorite = 1",
                [],
                |row| row.get(0),
            )
        })?;
        Ok(n as usize)
    }

    /// Close both connections. Idempotent; every later call fails with
    /// [`StorageError::Closed`].
    pub fn close(&self) {
        let writer = lock(&self.writer).take();
        let reader = self.reader.as_ref().and_then(|r| lock(r).take());
        if writer.is_some() || reader.is_some() {
            tracing::info!("closed clipboard history database");
        }
        // Reader first so the writer's close performs the final WAL checkpoint.
        drop(reader);
        drop(writer);
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.writer).is_none()
    }

    /// Close the database and delete its files, including the WAL side files.
    pub fn delete_database_file(&self) -> Result<()> {
        self.close();

        let Some(path) = &self.path else {
            return Ok(());
        };

        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.clone().into_os_string();
            file.push(suffix);
            match std::fs::remove_file(&file) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(path = %path.display(), "deleted clipboard history database");
        Ok(())
    }

    fn write<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let guard = lock(&self.writer);
        let conn = guard.as_ref().ok_or(StorageError::Closed)?;
        Ok(f(conn)?)
    }

    fn read<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        match &self.reader {
            Some(reader) => {
                let guard = lock(reader);
                let conn = guard.as_ref().ok_or(StorageError::Closed)?;
                Ok(f(conn)?)
            }
            None => self.write(f),
        }
    }

    fn query_entries(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<ClipEntry>> {
        self.read(|conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            let rows = stmt.query_map(params, map_entry)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
    }
}

impl ClipRepository for Database {
    type Error = StorageError;

    fn insert(&self, clip: &NewClip<'_>) -> Result<InsertOutcome> {
        self.write(|conn| {
            let affected = conn.execute(
                "INSERT INTO clip_entries (content, content_norm, content_hash, is_favorite, created_at)
                 VALUES (?1, ?2, ?3, 0, ?4)
                 ON CONFLICT(content_hash) DO NOTHING",
                params![
                    clip.content,
                    clip.content_norm,
                    clip.content_hash,
                    clip.created_at
                ],
            )?;
            Ok(if affected == 0 {
                InsertOutcome::Duplicate
            } else {
                InsertOutcome::Inserted(conn.last_insert_rowid())
            })
        })
    }

    fn list_latest(&self, limit: usize) -> Result<Vec<ClipEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM clip_entries
             ORDER BY is_favorite DESC, created_at DESC, id DESC
             LIMIT ?1"
        );
        self.query_entries(&sql, [limit as i64])
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<ClipEntry>> {
        if query.is_empty() {
            return self.list_latest(limit);
        }

        let pattern = format!("%{}%", escape_like(query));
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM clip_entries
             WHERE content LIKE ?1 ESCAPE '\\'
             ORDER BY is_favorite DESC, created_at DESC, id DESC
             LIMIT ?2"
        );
        self.query_entries(&sql, params![pattern, limit as i64])
    }

    fn get(&self, id: i64) -> Result<ClipEntry> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM clip_entries WHERE id = ?1");
        self.read(|conn| conn.query_row(&sql, [id], map_entry))
            .map_err(|e| match e {
                StorageError::DatabaseError(rusqlite::Error::QueryReturnedNoRows) => {
                    StorageError::NotFound(format!("clip entry {id}"))
                }
                other => other,
            })
    }

    fn delete_by_id(&self, id: i64) -> Result<()> {
        let affected = self.write(|conn| conn.execute("DELETE FROM clip_entries WHERE id = ?1", [id]))?;
        if affected == 0 {
            return Err(StorageError::NotFound(format!("clip entry {id}")));
        }
        Ok(())
    }

    fn set_favorite(&self, id: i64, favorite: bool) -> Result<()> {
        let affected = self.write(|conn| {
            conn.execute(
                "UPDATE clip_entries SET is_favorite = ?1 WHERE id = ?2",
                params![favorite, id],
            )
        })?;
        if affected == 0 {
            return Err(StorageError::NotFound(format!("clip entry {id}")));
        }
        Ok(())
    }

    fn delete_all_non_favorites(&self) -> Result<usize> {
        let removed =
            self.write(|conn| conn.execute("DELETE FROM clip_entries WHERE is_favorite = 0", []))?;
        tracing::debug!(removed, "cleared non-favorite entries");
        Ok(removed)
    }

    fn prune_to_limit(&self, limit: usize) -> Result<usize> {
        let removed = self.write(|conn| {
            conn.execute(
                "DELETE FROM clip_entries
                 WHERE is_favorite = 0
                   AND id NOT IN (
                     SELECT id FROM clip_entries
                     WHERE is_favorite = 0
                     ORDER BY created_at DESC, id DESC
                     LIMIT ?1
                   )",
                [limit as i64],
            )
        })?;
        if removed > 0 {
            tracing::debug!(removed, limit, "pruned clipboard history");
        }
        Ok(removed)
    }
}

/// Escape `%`, `_` and the escape character itself so `s` matches literally
/// inside a `LIKE ... ESCAPE '\'` pattern.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn configure(conn: &Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch(
        "PRAGMA foreign_keys=ON;
         PRAGMA temp_store=MEMORY;",
    )
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS clip_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL,
            content_norm TEXT NOT NULL,
            content_hash TEXT NOT NULL UNIQUE,
            is_favorite INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_clip_entries_fav_created
            ON clip_entries(is_favorite DESC, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_clip_entries_created
            ON clip_entries(created_at);
        "#,
    )
}

fn map_entry(row: &Row<'_>) -> rusqlite::Result<ClipEntry> {
    Ok(ClipEntry {
        id: row.get(0)?,
        content: row.get(1)?,
        content_norm: row.get(2)?,
        content_hash: row.get(3)?,
        favorite: row.get::<_, i64>(4)? != 0,
        created_at: row.get(5)?,
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
