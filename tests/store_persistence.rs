#![allow(clippy::unwrap_used, clippy::expect_used)]

use bench_history::entry::{Bench, Commit, Person};
use bench_history::storage::{JsonDirBackend, SqliteBackend, StorageBackend};
use bench_history::{EntryRecord, HistoryError, HistoryStore, QueryFacade};
use tempfile::TempDir;

const GROUP: &str = "linux-x64-simd4";

fn person() -> Person {
    Person {
        email: "ci@example.com".to_string(),
        name: "CI Bot".to_string(),
        username: None,
    }
}

fn run(date: i64, benches: &[(&str, i64)]) -> EntryRecord {
    EntryRecord {
        commit: Commit {
            author: person(),
            committer: person(),
            distinct: true,
            id: format!("{date:040x}"),
            message: "nightly".to_string(),
            timestamp: "2025-12-13T15:34:35Z".to_string(),
            tree_id: None,
            url: None,
        },
        date,
        tool: "customBiggerIsBetter".to_string(),
        benches: benches
            .iter()
            .map(|(name, value)| Bench::new(*name, *value, "rays/sec"))
            .collect(),
    }
}

/// Appends the three-run history, with `box` missing from the middle run.
fn append_scenario(store: &HistoryStore) {
    store.append(GROUP, run(100, &[("box", 19_159_290)])).unwrap();
    store.append(GROUP, run(200, &[("cone", 6_039_596)])).unwrap();
    store.append(GROUP, run(150, &[("box", 13_299_995)])).unwrap();
}

fn assert_scenario(store: &HistoryStore) {
    let q = QueryFacade::new(store);
    assert_eq!(q.latest(GROUP).unwrap().date, 150);
    let points: Vec<(i64, f64)> = q.series_for(GROUP, "box").iter().map(Into::into).collect();
    assert_eq!(points, vec![(100, 19_159_290.0), (150, 13_299_995.0)]);
    assert_eq!(store.last_update(), Some(200));
}

fn reopen(backend: impl StorageBackend + 'static) -> HistoryStore {
    HistoryStore::open("", Box::new(backend)).expect("reopen")
}

#[test]
fn json_dir_history_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = HistoryStore::open(
            "https://example.com/raytracer",
            Box::new(JsonDirBackend::new(dir.path()).with_repo_url("https://example.com/raytracer")),
        )
        .unwrap();
        append_scenario(&store);
        assert_scenario(&store);
    }

    let store = reopen(JsonDirBackend::new(dir.path()));
    assert_scenario(&store);
    assert_eq!(store.repo_url(), "https://example.com/raytracer");
}

#[test]
fn sqlite_history_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.db");
    {
        let store = reopen(SqliteBackend::open(&path).unwrap());
        append_scenario(&store);
    }
    assert_scenario(&reopen(SqliteBackend::open(&path).unwrap()));
}

#[test]
fn rejected_entry_is_not_persisted() {
    let dir = TempDir::new().unwrap();
    {
        let store = reopen(JsonDirBackend::new(dir.path()));
        store.append(GROUP, run(100, &[("box", 1)])).unwrap();

        let wire = serde_json::json!({
            "commit": serde_json::to_value(run(1, &[]).commit).unwrap(),
            "date": "not-a-number",
            "tool": "customBiggerIsBetter",
            "benches": [],
        });
        let err = store.append_json(GROUP, &wire).unwrap_err();
        assert!(matches!(err, HistoryError::Validation(ref v) if v.path == "date"));
    }
    let store = reopen(JsonDirBackend::new(dir.path()));
    assert_eq!(store.entries_for(GROUP).len(), 1);
}

#[test]
fn dot_group_is_rejected_and_nothing_lands_at_the_root() {
    let dir = TempDir::new().unwrap();
    {
        let store = reopen(JsonDirBackend::new(dir.path()));
        for group in [".", "..", "./"] {
            let err = store.append(group, run(100, &[("box", 1)])).unwrap_err();
            assert!(matches!(err, HistoryError::Validation(ref v) if v.path == "group"), "{group:?}");
        }
        store.append(GROUP, run(100, &[("box", 1)])).unwrap();
    }
    assert!(!dir.path().join("data.js").exists());

    let store = reopen(JsonDirBackend::new(dir.path()));
    assert_eq!(store.groups(), vec![GROUP]);
    assert_eq!(store.entries_for(GROUP).len(), 1);
}
