//! Read-side views for dashboards. Nothing here mutates the store, and an
//! unknown group or bench name yields an empty result rather than an error.

mod series;

pub use series::{Series, SeriesIter, SeriesPoint};

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::entry::EntryRecord;
use crate::store::HistoryStore;

#[derive(Debug, Clone, Copy)]
pub struct QueryFacade<'a> {
    store: &'a HistoryStore,
}

impl<'a> QueryFacade<'a> {
    pub const fn new(store: &'a HistoryStore) -> Self {
        Self { store }
    }

    /// The most recently appended entry. Append order decides, not `date`:
    /// dates may tie or run backwards across re-triggered jobs.
    pub fn latest(&self, group: &str) -> Option<Arc<EntryRecord>> {
        self.store.entries_for(group).last().cloned()
    }

    /// `(date, value)` for `bench` across the group's log, skipping entries
    /// that lack it. The result is a snapshot and can be iterated repeatedly.
    pub fn series_for(&self, group: &str, bench: &str) -> Series {
        Series::new(self.store.entries_for(group), bench)
    }

    /// Union of bench names over every entry of the group, sorted.
    pub fn all_bench_names(&self, group: &str) -> BTreeSet<String> {
        self.store
            .entries_for(group)
            .iter()
            .flat_map(|e| e.bench_names())
            .map(ToOwned::to_owned)
            .collect()
    }

    pub fn groups(&self) -> BTreeSet<String> {
        self.store.groups().into_iter().collect()
    }
}
