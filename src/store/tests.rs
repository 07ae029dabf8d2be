#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::thread;

use serde_json::json;

use super::*;
use crate::error::StorageError;
use crate::storage::LoadedHistory;
use crate::storage::mock::InMemoryBackend;
use crate::test_helpers::entry;

const GROUP: &str = "linux-x64-simd4";

// --- append ---

#[test]
fn append_grows_log_by_one() {
    let store = HistoryStore::new("");
    for (i, date) in [100, 200, 150].into_iter().enumerate() {
        store.append(GROUP, entry(date, &[("box", 1)])).expect("append");
        assert_eq!(store.entries_for(GROUP).len(), i + 1);
    }
}

#[test]
fn append_keeps_call_order_even_when_dates_go_backwards() {
    let store = HistoryStore::new("");
    for date in [100, 200, 150] {
        store.append(GROUP, entry(date, &[])).unwrap();
    }
    let dates: Vec<i64> = store.entries_for(GROUP).iter().map(|e| e.date).collect();
    assert_eq!(dates, vec![100, 200, 150]);
}

#[test]
fn last_update_is_max_date_across_groups() {
    let store = HistoryStore::new("");
    assert_eq!(store.last_update(), None);

    store.append("a", entry(100, &[])).unwrap();
    assert_eq!(store.last_update(), Some(100));
    store.append("b", entry(300, &[])).unwrap();
    store.append("a", entry(200, &[])).unwrap();
    assert_eq!(store.last_update(), Some(300), "never moves backwards");
}

#[test]
fn rejected_append_changes_nothing() {
    let store = HistoryStore::new("");
    store.append(GROUP, entry(100, &[("box", 1)])).unwrap();

    let mut bad = entry(200, &[]);
    bad.date = -5;
    let err = store.append(GROUP, bad).unwrap_err();
    assert!(matches!(err, HistoryError::Validation(_)));

    assert_eq!(store.entries_for(GROUP).len(), 1);
    assert_eq!(store.last_update(), Some(100));
}

#[test]
fn append_json_rejects_non_numeric_date() {
    let store = HistoryStore::new("");
    let mut wire = serde_json::to_value(entry(100, &[("box", 1)])).unwrap();
    wire["date"] = json!("not-a-number");

    let err = store.append_json(GROUP, &wire).unwrap_err();
    let HistoryError::Validation(inner) = err else {
        unreachable!("expected a validation error");
    };
    assert_eq!(inner.path, "date");
    assert!(store.entries_for(GROUP).is_empty());
    assert!(store.groups().is_empty());
}

#[test]
fn append_json_accepts_wire_entry() {
    let store = HistoryStore::new("");
    let wire = serde_json::to_value(entry(100, &[("box", 19_159_290)])).unwrap();
    store.append_json(GROUP, &wire).expect("append");
    assert_eq!(store.entries_for(GROUP)[0].benches[0].value(), 19_159_290.0);
}

#[test]
fn append_json_rejects_missing_distinct() {
    let store = HistoryStore::new("");
    let mut wire = serde_json::to_value(entry(100, &[("box", 1)])).unwrap();
    wire["commit"].as_object_mut().unwrap().remove("distinct");

    let err = store.append_json(GROUP, &wire).unwrap_err();
    assert!(matches!(err, HistoryError::Validation(ref v) if v.path == "commit.distinct"));
    assert!(store.entries_for(GROUP).is_empty());
}

#[test]
fn readers_never_see_a_date_beyond_last_update() {
    let store = Arc::new(HistoryStore::new(""));
    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for date in 1..=500 {
                store.append(GROUP, entry(date, &[])).unwrap();
            }
        })
    };
    while !writer.is_finished() {
        let newest = store.entries_for(GROUP).last().map(|e| e.date);
        if let Some(date) = newest {
            assert!(store.last_update().unwrap_or(0) >= date);
        }
    }
    writer.join().unwrap();
}

#[test]
fn rejects_group_keys_that_escape_the_data_dir() {
    let store = HistoryStore::new("");
    for group in ["", "  ", ".", "..", "../etc", "a/b", "a\\b", "/abs"] {
        let err = store.append(group, entry(1, &[])).unwrap_err();
        assert!(matches!(err, HistoryError::Validation(ref v) if v.path == "group"), "{group:?}");
    }
}

#[test]
fn duplicate_commit_ids_are_separate_entries() {
    let store = HistoryStore::new("");
    let first = entry(100, &[]);
    let mut rerun = first.clone();
    rerun.date = 110;
    store.append(GROUP, first).unwrap();
    store.append(GROUP, rerun).unwrap();
    let log = store.entries_for(GROUP);
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].commit.id, log[1].commit.id);
}

// --- entries_for / groups ---

#[test]
fn unknown_group_is_empty_not_an_error() {
    let store = HistoryStore::new("");
    assert!(store.entries_for("win-x64-occt").is_empty());
    assert!(store.groups().is_empty(), "reading must not create a group");
}

#[test]
fn groups_lists_each_key_once_sorted() {
    let store = HistoryStore::new("");
    store.append("win-x64-occt", entry(1, &[])).unwrap();
    store.append("linux-x64-embree", entry(2, &[])).unwrap();
    store.append("win-x64-occt", entry(3, &[])).unwrap();
    assert_eq!(store.groups(), vec!["linux-x64-embree", "win-x64-occt"]);
}

#[test]
fn snapshot_is_unaffected_by_later_appends() {
    let store = HistoryStore::new("");
    store.append(GROUP, entry(1, &[])).unwrap();
    let before = store.entries_for(GROUP);
    store.append(GROUP, entry(2, &[])).unwrap();
    assert_eq!(before.len(), 1);
    assert_eq!(store.entries_for(GROUP).len(), 2);
}

#[test]
fn repeated_reads_are_identical() {
    let store = HistoryStore::new("");
    store.append(GROUP, entry(1, &[("box", 5)])).unwrap();
    assert_eq!(store.entries_for(GROUP), store.entries_for(GROUP));
}

// --- persistence ---

#[test]
fn open_loads_groups_and_recomputes_last_update() {
    let backend = InMemoryBackend::with_initial(LoadedHistory {
        repo_url: Some("https://example.com/r".to_string()),
        groups: vec![
            ("a".to_string(), vec![entry(100, &[]), entry(400, &[])]),
            ("b".to_string(), vec![entry(250, &[])]),
        ],
    });
    let store = HistoryStore::open("", Box::new(backend)).expect("open");
    assert_eq!(store.groups(), vec!["a", "b"]);
    assert_eq!(store.entries_for("a").len(), 2);
    assert_eq!(store.last_update(), Some(400));
    assert_eq!(store.repo_url(), "https://example.com/r");
}

#[test]
fn explicit_repo_url_wins_over_stored() {
    let backend = InMemoryBackend::with_initial(LoadedHistory {
        repo_url: Some("https://stored.example.com".to_string()),
        groups: Vec::new(),
    });
    let store = HistoryStore::open("https://configured.example.com", Box::new(backend)).unwrap();
    assert_eq!(store.repo_url(), "https://configured.example.com");
}

#[test]
fn append_publishes_full_log() {
    let backend = InMemoryBackend::new();
    let probe = backend.probe();
    let store = HistoryStore::open("", Box::new(backend)).unwrap();

    store.append("a", entry(1, &[])).unwrap();
    store.append("a", entry(2, &[])).unwrap();
    store.append("b", entry(3, &[])).unwrap();

    assert_eq!(
        probe.published(),
        vec![
            ("a".to_string(), 1),
            ("a".to_string(), 2),
            ("b".to_string(), 1)
        ]
    );
}

#[test]
fn validation_failure_never_reaches_backend() {
    let backend = InMemoryBackend::new();
    let probe = backend.probe();
    let store = HistoryStore::open("", Box::new(backend)).unwrap();

    let mut bad = entry(1, &[]);
    bad.tool = String::new();
    assert!(store.append("a", bad).is_err());
    assert_eq!(probe.publish_count(), 0);
}

#[test]
fn storage_failure_leaves_history_unchanged() {
    let backend = InMemoryBackend::new();
    let probe = backend.probe();
    let store = HistoryStore::open("", Box::new(backend)).unwrap();
    store.append(GROUP, entry(100, &[])).unwrap();

    probe.set_failing(true);
    let err = store.append(GROUP, entry(200, &[])).unwrap_err();
    assert!(matches!(err, HistoryError::Storage(StorageError::Io { .. })));
    assert_eq!(store.entries_for(GROUP).len(), 1);
    assert_eq!(store.last_update(), Some(100));

    probe.set_failing(false);
    store.append(GROUP, entry(200, &[])).unwrap();
    assert_eq!(store.entries_for(GROUP).len(), 2);
}

// --- concurrency ---

#[test]
fn concurrent_appends_to_one_group_are_all_kept() {
    let store = Arc::new(HistoryStore::new(""));
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..25 {
                    store.append(GROUP, entry(1 + t * 100 + i, &[])).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let log = store.entries_for(GROUP);
    assert_eq!(log.len(), 200);
    // Within one writer thread, call order is preserved.
    for t in 0..8 {
        let dates: Vec<i64> = log
            .iter()
            .map(|e| e.date)
            .filter(|d| (d - 1) / 100 == t)
            .collect();
        assert!(dates.windows(2).all(|w| w[0] < w[1]), "thread {t}: {dates:?}");
    }
    assert_eq!(store.last_update(), Some(1 + 7 * 100 + 24));
}

#[test]
fn readers_only_see_whole_prefixes() {
    let store = Arc::new(HistoryStore::new(""));
    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for date in 1..=200 {
                store.append(GROUP, entry(date, &[("box", date)])).unwrap();
            }
        })
    };
    while !writer.is_finished() {
        let log = store.entries_for(GROUP);
        for (i, e) in log.iter().enumerate() {
            assert_eq!(e.date, i64::try_from(i).unwrap() + 1);
        }
    }
    writer.join().unwrap();
    assert_eq!(store.entries_for(GROUP).len(), 200);
}
