use std::io::Read;
use std::path::Path;

use anyhow::Context;

use bench_history::HistoryStore;
use bench_history::audit::{self, DocumentAudit, LogAudit};
use bench_history::config::{BackendKind, HistoryConfig};
use bench_history::storage::{self, JsonDirBackend};

pub fn open_store(cfg: &HistoryConfig) -> anyhow::Result<HistoryStore> {
    let backend = storage::open_backend(cfg).with_context(|| {
        format!(
            "cannot open {:?} storage at {}",
            cfg.backend,
            cfg.data_dir.display()
        )
    })?;
    let store = HistoryStore::open(cfg.repo_url.clone(), backend)
        .with_context(|| format!("cannot load history from {}", cfg.data_dir.display()))?;
    tracing::info!(groups = store.groups().len(), "opened history store");
    Ok(store)
}

fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read entry: {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read entry from stdin")?;
            Ok(buf)
        }
    }
}

pub fn cmd_append(cfg: &HistoryConfig, group: &str, file: Option<&Path>) -> anyhow::Result<i32> {
    let text = read_input(file)?;
    let value: serde_json::Value =
        serde_json::from_str(&text).context("entry is not valid JSON")?;

    let store = open_store(cfg)?;
    store.append_json(group, &value)?;

    let log = store.entries_for(group);
    if let Some(entry) = log.last() {
        eprintln!(
            "[bench-history] appended {} benches to {group} (entry {}, commit {})",
            entry.benches.len(),
            log.len(),
            short_id(&entry.commit.id)
        );
    }
    Ok(0)
}

pub fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

fn log_findings(prefix: &str, audit: &LogAudit) -> Vec<String> {
    let mut findings: Vec<String> = audit
        .out_of_order
        .iter()
        .map(|i| format!("{prefix}entry {} is dated before entry {}", i + 1, i))
        .collect();
    findings.extend(audit.duplicate_commits.iter().map(|(id, n)| {
        format!("{prefix}commit {} appended {n} times", short_id(id))
    }));
    findings
}

/// Findings for one document. A `lastUpdate` ahead of the newest entry is
/// how the dashboard producer stamps its write time, so it is only noted.
fn document_findings(audit: &DocumentAudit) -> (Vec<String>, Vec<String>) {
    let mut notes = Vec::new();
    let mut findings = Vec::new();
    match audit.last_update_drift() {
        Some(drift) if drift > 0 => {
            notes.push(format!("lastUpdate is {drift} ms after the newest entry"));
        }
        Some(drift) if drift < 0 => findings.push(format!(
            "lastUpdate is {} ms before the newest entry",
            drift.unsigned_abs()
        )),
        _ => {}
    }
    for (suite, log) in &audit.suites {
        findings.extend(log_findings(&format!("{suite}: "), log));
    }
    (notes, findings)
}

fn print_group(group: &str, entries: usize, notes: &[String], findings: &[String]) {
    if findings.is_empty() {
        println!("{group}: ok ({entries} entries)");
    } else {
        println!("{group}: {} finding(s) ({entries} entries)", findings.len());
    }
    for finding in findings {
        println!("  - {finding}");
    }
    for note in notes {
        println!("  note: {note}");
    }
}

pub fn cmd_check(cfg: &HistoryConfig, strict: bool) -> anyhow::Result<i32> {
    let mut total = 0usize;

    match cfg.backend {
        BackendKind::Json => {
            let backend = JsonDirBackend::new(cfg.data_dir.clone()).with_suite(cfg.suite.clone());
            let documents = backend
                .documents()
                .with_context(|| format!("cannot read documents under {}", cfg.data_dir.display()))?;
            if documents.is_empty() {
                eprintln!("[bench-history] no groups found in {}", cfg.data_dir.display());
            }
            for (group, doc) in &documents {
                let audit = audit::audit_document(doc);
                let (notes, findings) = document_findings(&audit);
                print_group(group, doc.suite(&cfg.suite).len(), &notes, &findings);
                total += findings.len();
            }
        }
        BackendKind::Sqlite => {
            let store = open_store(cfg)?;
            let groups = store.groups();
            if groups.is_empty() {
                eprintln!("[bench-history] no groups found in {}", cfg.sqlite_path().display());
            }
            for group in groups {
                let log = store.entries_for(&group);
                let audit = audit::audit_log(log.iter().map(|e| &**e));
                let findings = log_findings("", &audit);
                print_group(&group, audit.entries, &[], &findings);
                total += findings.len();
            }
        }
    }

    if strict && total > 0 {
        eprintln!("[bench-history] check failed: {total} finding(s)");
        return Ok(1);
    }
    Ok(0)
}
