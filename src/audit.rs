//! Self-consistency diagnostics over group logs and persisted documents.
//!
//! Findings are reported, never repaired: the log is append-only.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::document::BenchmarkDocument;
use crate::entry::EntryRecord;

/// Ordering and provenance findings for one log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogAudit {
    pub entries: usize,
    /// Indices whose `date` is earlier than the previous entry's.
    pub out_of_order: Vec<usize>,
    /// Commit ids appended more than once, with their counts.
    pub duplicate_commits: BTreeMap<String, usize>,
}

impl LogAudit {
    pub fn is_clean(&self) -> bool {
        self.out_of_order.is_empty() && self.duplicate_commits.is_empty()
    }
}

pub fn audit_log<'a, I>(entries: I) -> LogAudit
where
    I: IntoIterator<Item = &'a EntryRecord>,
{
    let mut audit = LogAudit::default();
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    let mut previous: Option<i64> = None;

    for (i, entry) in entries.into_iter().enumerate() {
        audit.entries += 1;
        if previous.is_some_and(|p| entry.date < p) {
            audit.out_of_order.push(i);
        }
        previous = Some(entry.date);
        *seen.entry(entry.commit.id.as_str()).or_default() += 1;
    }

    audit.duplicate_commits = seen
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(id, n)| (id.to_string(), n))
        .collect();
    audit
}

/// Findings for a persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentAudit {
    pub declared_last_update: i64,
    pub computed_last_update: Option<i64>,
    pub suites: BTreeMap<String, LogAudit>,
}

impl DocumentAudit {
    /// Declared minus computed `lastUpdate`, in ms. Positive when the
    /// producer stamped its write time rather than the newest entry's date.
    pub fn last_update_drift(&self) -> Option<i64> {
        self.computed_last_update
            .map(|computed| self.declared_last_update - computed)
    }

    pub fn is_clean(&self) -> bool {
        self.last_update_drift().unwrap_or(0) == 0 && self.suites.values().all(LogAudit::is_clean)
    }
}

pub fn audit_document(doc: &BenchmarkDocument) -> DocumentAudit {
    DocumentAudit {
        declared_last_update: doc.last_update,
        computed_last_update: doc.computed_last_update(),
        suites: doc
            .suites
            .iter()
            .map(|(name, entries)| (name.clone(), audit_log(entries)))
            .collect(),
    }
}
