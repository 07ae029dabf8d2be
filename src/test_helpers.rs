use crate::entry::{Bench, Commit, EntryRecord, Person};

fn person() -> Person {
    Person {
        email: "ci@example.com".to_string(),
        name: "CI Bot".to_string(),
        username: Some("ci-bot".to_string()),
    }
}

/// Entry with a deterministic commit and one `rays/sec` bench per `(name, value)`.
pub fn entry(date: i64, benches: &[(&str, i64)]) -> EntryRecord {
    entry_for_commit(&format!("{date:040x}"), date, benches)
}

pub fn entry_for_commit(commit_id: &str, date: i64, benches: &[(&str, i64)]) -> EntryRecord {
    EntryRecord {
        commit: Commit {
            author: person(),
            committer: person(),
            distinct: true,
            id: commit_id.to_string(),
            message: format!("run at {date}"),
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
