pub mod json_dir;
#[cfg(test)]
pub mod mock;
pub mod sqlite;

use std::sync::Arc;

use crate::config::{BackendKind, HistoryConfig};
use crate::entry::EntryRecord;
use crate::error::StorageError;

pub use json_dir::JsonDirBackend;
pub use sqlite::SqliteBackend;

/// Everything a backend holds, as read at open time.
#[derive(Debug, Default)]
pub struct LoadedHistory {
    pub repo_url: Option<String>,
    /// Group logs in append order.
    pub groups: Vec<(String, Vec<EntryRecord>)>,
}

/// Persistence behind a [`crate::store::HistoryStore`].
///
/// The store calls `publish` while holding the group's append lock, before
/// the new log becomes visible, so an `Err` leaves history untouched.
pub trait StorageBackend: Send + Sync {
    /// Read every persisted group.
    ///
    /// # Errors
    /// Returns an error if storage is unreadable or holds an invalid entry.
    fn load(&mut self) -> Result<LoadedHistory, StorageError>;

    /// Durably record `log`, the group's full history with the newly
    /// appended entry last.
    ///
    /// # Errors
    /// Returns an error if the write did not complete.
    fn publish(&self, group: &str, log: &[Arc<EntryRecord>]) -> Result<(), StorageError>;
}

/// Build the backend `config` selects.
///
/// # Errors
/// Returns an error if the SQLite database cannot be opened or initialized.
pub fn open_backend(config: &HistoryConfig) -> Result<Box<dyn StorageBackend>, StorageError> {
    match config.backend {
        BackendKind::Json => Ok(Box::new(
            JsonDirBackend::new(config.data_dir.clone())
                .with_suite(config.suite.clone())
                .with_repo_url(config.repo_url.clone()),
        )),
        BackendKind::Sqlite => {
            let backend = SqliteBackend::open(&config.sqlite_path())?;
            if !config.repo_url.is_empty() {
                backend.set_repo_url(&config.repo_url)?;
            }
            Ok(Box::new(backend))
        }
    }
}
