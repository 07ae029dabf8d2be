use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{LoadedHistory, StorageBackend};
use crate::document::{BenchmarkDocument, DEFAULT_SUITE};
use crate::entry::EntryRecord;
use crate::error::StorageError;
use crate::store::validate_group;

/// File name of each group's document, as served to the dashboard.
pub const DOCUMENT_FILE: &str = "data.js";

/// One `<root>/<group>/data.js` document per group.
///
/// Only `suite` is read into the store; other suites in a document are kept
/// as-is when it is rewritten.
#[derive(Debug, Clone)]
pub struct JsonDirBackend {
    root: PathBuf,
    suite: String,
    repo_url: String,
}

impl JsonDirBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            suite: DEFAULT_SUITE.to_string(),
            repo_url: String::new(),
        }
    }

    #[must_use]
    pub fn with_suite(mut self, suite: impl Into<String>) -> Self {
        self.suite = suite.into();
        self
    }

    /// Repo URL stamped into documents this backend writes.
    #[must_use]
    pub fn with_repo_url(mut self, repo_url: impl Into<String>) -> Self {
        self.repo_url = repo_url.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn document_path(&self, group: &str) -> PathBuf {
        self.root.join(group).join(DOCUMENT_FILE)
    }

    fn read_document(path: &Path) -> Result<Option<BenchmarkDocument>, StorageError> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(path, e)),
        };
        BenchmarkDocument::parse(&text)
            .map(Some)
            .map_err(|source| StorageError::Document {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Every group document under the root, sorted by group key.
    /// Subdirectories without a document, or whose name is not a valid
    /// group key, are skipped.
    ///
    /// # Errors
    /// Returns an error if the root or a document cannot be read or parsed.
    pub fn documents(&self) -> Result<Vec<(String, BenchmarkDocument)>, StorageError> {
        let dir = match std::fs::read_dir(&self.root) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&self.root, e)),
        };

        let mut subdirs: Vec<_> = dir
            .filter_map(std::result::Result::ok)
            .filter(|e| e.path().is_dir())
            .collect();
        subdirs.sort_by_key(std::fs::DirEntry::file_name);

        let mut docs = Vec::new();
        for sub in subdirs {
            let group = sub.file_name().to_string_lossy().into_owned();
            if validate_group(&group).is_err() {
                tracing::warn!(dir = %sub.path().display(), "skipping directory with invalid group name");
                continue;
            }
            if let Some(doc) = Self::read_document(&self.document_path(&group))? {
                docs.push((group, doc));
            }
        }
        Ok(docs)
    }

    fn write_atomic(path: &Path, contents: &str) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
        let tmp_path = path.with_extension("js.tmp");
        std::fs::write(&tmp_path, contents).map_err(|e| StorageError::io(&tmp_path, e))?;
        std::fs::rename(&tmp_path, path).map_err(|e| StorageError::io(path, e))
    }
}

impl StorageBackend for JsonDirBackend {
    fn load(&mut self) -> Result<LoadedHistory, StorageError> {
        let mut loaded = LoadedHistory::default();
        for (group, mut doc) in self.documents()? {
            if loaded.repo_url.is_none() && !doc.repo_url.is_empty() {
                loaded.repo_url = Some(doc.repo_url.clone());
            }
            if doc.suites.keys().any(|s| *s != self.suite) {
                tracing::debug!(group = %group, suite = %self.suite, "document has other suites; they are left untouched");
            }
            let entries = doc.suites.remove(&self.suite).unwrap_or_default();
            loaded.groups.push((group, entries));
        }
        if self.repo_url.is_empty()
            && let Some(url) = &loaded.repo_url
        {
            self.repo_url.clone_from(url);
        }
        Ok(loaded)
    }

    fn publish(&self, group: &str, log: &[Arc<EntryRecord>]) -> Result<(), StorageError> {
        let path = self.document_path(group);
        let mut doc = Self::read_document(&path)?
            .unwrap_or_else(|| BenchmarkDocument::new(self.repo_url.clone()));
        if !self.repo_url.is_empty() {
            doc.repo_url.clone_from(&self.repo_url);
        }
        doc.set_suite(&self.suite, log.iter().map(|e| EntryRecord::clone(e)).collect());

        let text = doc.render_script()?;
        Self::write_atomic(&path, &text)?;
        tracing::debug!(group, path = %path.display(), entries = log.len(), "published document");
        Ok(())
    }
}
