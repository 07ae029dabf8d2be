//! Append-only, per-group benchmark history.
//!
//! Each group owns a published snapshot (`Arc<Vec<Arc<EntryRecord>>>`) that
//! readers clone cheaply. Writers hold the group's append lock, build the next
//! log, hand it to the storage backend, and only then swap the snapshot, so a
//! reader sees some prefix of the appends and never a partial entry.

use std::collections::BTreeMap;
use std::path::{Component, Path};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde_json::Value;

use crate::entry::{EntryRecord, entry_from_json};
use crate::error::{HistoryError, ValidationError};
use crate::storage::StorageBackend;

/// An immutable view of one group's log at some point in time.
pub type Snapshot = Arc<Vec<Arc<EntryRecord>>>;

#[derive(Default)]
struct GroupLog {
    append_lock: Mutex<()>,
    published: RwLock<Snapshot>,
}

impl GroupLog {
    fn from_entries(entries: Vec<EntryRecord>) -> Self {
        let log: Vec<Arc<EntryRecord>> = entries.into_iter().map(Arc::new).collect();
        Self {
            append_lock: Mutex::new(()),
            published: RwLock::new(Arc::new(log)),
        }
    }

    fn snapshot(&self) -> Snapshot {
        Arc::clone(&*self.published.read().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Reject group keys that cannot safely name a persisted document: the key
/// must be exactly one plain path component.
///
/// # Errors
/// Returns a [`ValidationError`] at path `group`.
pub fn validate_group(group: &str) -> Result<(), ValidationError> {
    if group.trim().is_empty() {
        return Err(ValidationError::invalid("group", "must not be empty"));
    }
    let mut components = Path::new(group).components();
    let single_name = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_name || group.contains('/') || group.contains('\\') {
        return Err(ValidationError::invalid(
            "group",
            format!("invalid group key: {group:?}"),
        ));
    }
    Ok(())
}

/// The benchmark history for every known group.
///
/// Construct one explicitly and pass it to producers and consumers; there is
/// no process-wide instance.
pub struct HistoryStore {
    groups: RwLock<BTreeMap<String, Arc<GroupLog>>>,
    /// Max `date` across all groups; 0 while the store is empty.
    last_update: AtomicI64,
    repo_url: String,
    backend: Option<Box<dyn StorageBackend>>,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("groups", &self.groups().len())
            .field("last_update", &self.last_update())
            .field("repo_url", &self.repo_url)
            .field("persistent", &self.backend.is_some())
            .finish()
    }
}

impl HistoryStore {
    /// An empty, purely in-memory store.
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            groups: RwLock::new(BTreeMap::new()),
            last_update: AtomicI64::new(0),
            repo_url: repo_url.into(),
            backend: None,
        }
    }

    /// Open a store over `backend`, loading every persisted group.
    ///
    /// A non-empty `repo_url` wins over the one recorded in storage.
    ///
    /// # Errors
    /// Returns [`HistoryError::Storage`] if the backend cannot be read or
    /// holds an entry that fails validation.
    pub fn open(
        repo_url: impl Into<String>,
        mut backend: Box<dyn StorageBackend>,
    ) -> Result<Self, HistoryError> {
        let loaded = backend.load()?;
        let mut repo_url: String = repo_url.into();
        if repo_url.is_empty()
            && let Some(stored) = loaded.repo_url
        {
            repo_url = stored;
        }

        let mut groups = BTreeMap::new();
        let mut last_update = 0;
        for (group, entries) in loaded.groups {
            let max_date = entries.iter().map(|e| e.date).max().unwrap_or(0);
            last_update = last_update.max(max_date);
            tracing::debug!(group = %group, entries = entries.len(), "loaded group");
            groups.insert(group, Arc::new(GroupLog::from_entries(entries)));
        }

        Ok(Self {
            groups: RwLock::new(groups),
            last_update: AtomicI64::new(last_update),
            repo_url,
            backend: Some(backend),
        })
    }

    fn group_log(&self, group: &str) -> Option<Arc<GroupLog>> {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(group)
            .cloned()
    }

    fn group_log_or_create(&self, group: &str) -> Arc<GroupLog> {
        if let Some(log) = self.group_log(group) {
            return log;
        }
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(groups.entry(group.to_string()).or_default())
    }

    /// Validate `entry` and append it to `group`'s log.
    ///
    /// On success the log grows by exactly one and `last_update` becomes
    /// `max(last_update, entry.date)`. On failure nothing changes.
    ///
    /// # Errors
    /// [`HistoryError::Validation`] for a malformed entry or group key;
    /// [`HistoryError::Storage`] if the backend could not persist the new log.
    pub fn append(&self, group: &str, entry: EntryRecord) -> Result<(), HistoryError> {
        validate_group(group)?;
        entry.validate()?;

        let log = self.group_log_or_create(group);
        let _guard = log.append_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let current = log.snapshot();
        let mut next: Vec<Arc<EntryRecord>> = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        let date = entry.date;
        next.push(Arc::new(entry));

        if let Some(backend) = &self.backend {
            backend.publish(group, &next)?;
        }

        self.last_update.fetch_max(date, Ordering::AcqRel);
        *log.published.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        tracing::debug!(group, date, "appended entry");
        Ok(())
    }

    /// Structurally validate an untyped entry, then [`Self::append`] it.
    ///
    /// # Errors
    /// Same as [`Self::append`].
    pub fn append_json(&self, group: &str, entry: &Value) -> Result<(), HistoryError> {
        validate_group(group)?;
        let entry = entry_from_json(entry)?;
        self.append(group, entry)
    }

    /// The group's log in append order. Unknown groups yield an empty log.
    pub fn entries_for(&self, group: &str) -> Snapshot {
        self.group_log(group)
            .map(|log| log.snapshot())
            .unwrap_or_default()
    }

    /// Keys of every group holding at least one entry, sorted.
    pub fn groups(&self) -> Vec<String> {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, log)| !log.snapshot().is_empty())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Max `date` over every entry in the store, or `None` when empty.
    pub fn last_update(&self) -> Option<i64> {
        match self.last_update.load(Ordering::Acquire) {
            0 => None,
            ms => Some(ms),
        }
    }

    pub fn repo_url(&self) -> &str {
        &self.repo_url
    }
}

#[cfg(test)]
mod tests;
