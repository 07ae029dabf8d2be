use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use rusqlite::{Connection, OptionalExtension as _};

use super::{LoadedHistory, StorageBackend};
use crate::entry::{EntryRecord, entry_from_json};
use crate::error::StorageError;

/// All groups in one `SQLite` database, one row per entry.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend").finish_non_exhaustive()
    }
}

/// Create the schema if it does not exist yet.
///
/// # Errors
/// Returns an error if the table creation fails.
pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS entries (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            group_key  TEXT    NOT NULL,
            date       INTEGER NOT NULL,
            commit_id  TEXT    NOT NULL,
            payload    TEXT    NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_entries_group ON entries(group_key, id);
        CREATE TABLE IF NOT EXISTS meta (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;
    Ok(())
}

impl SqliteBackend {
    /// Open or create the database at `path`.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or the DB cannot be opened.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// # Errors
    /// Returns an error if the in-memory DB cannot be created.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the repository URL returned by later loads.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn set_repo_url(&self, repo_url: &str) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT INTO meta (key, value) VALUES ('repo_url', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [repo_url],
        )?;
        Ok(())
    }

    /// Number of stored entries for `group`.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn count(&self, group: &str) -> Result<usize, StorageError> {
        let n: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM entries WHERE group_key = ?1",
            [group],
            |r| r.get(0),
        )?;
        Ok(usize::try_from(n).unwrap_or(0))
    }
}

impl StorageBackend for SqliteBackend {
    fn load(&mut self) -> Result<LoadedHistory, StorageError> {
        let conn = self.conn();
        let repo_url: Option<String> = conn
            .query_row("SELECT value FROM meta WHERE key = 'repo_url'", [], |r| {
                r.get(0)
            })
            .optional()?;

        let mut stmt = conn.prepare("SELECT group_key, payload FROM entries ORDER BY id ASC")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?;

        let mut groups: Vec<(String, Vec<EntryRecord>)> = Vec::new();
        for row in rows {
            let (group, payload) = row?;
            let value: serde_json::Value = serde_json::from_str(&payload)?;
            let entry = entry_from_json(&value).map_err(|source| StorageError::Corrupt {
                group: group.clone(),
                source,
            })?;
            match groups.iter_mut().find(|(g, _)| *g == group) {
                Some((_, entries)) => entries.push(entry),
                None => groups.push((group, vec![entry])),
            }
        }
        groups.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(LoadedHistory { repo_url, groups })
    }

    fn publish(&self, group: &str, log: &[Arc<EntryRecord>]) -> Result<(), StorageError> {
        let Some(entry) = log.last() else {
            return Ok(());
        };
        let payload = serde_json::to_string(entry.as_ref())?;
        self.conn().execute(
            "INSERT INTO entries (group_key, date, commit_id, payload)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![group, entry.date, entry.commit.id, payload],
        )?;
        tracing::debug!(group, date = entry.date, "inserted entry row");
        Ok(())
    }
}
