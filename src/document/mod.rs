//! The persisted per-group benchmark document.
//!
//! The dashboard loads it as a script (`window.BENCHMARK_DATA = {...}`), so
//! both that form and plain JSON are accepted on read.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::entry::{EntryRecord, entry_from_json};
use crate::error::DocumentError;

/// Assignment the dashboard expects in front of the JSON body.
pub const SCRIPT_PREFIX: &str = "window.BENCHMARK_DATA = ";

/// Suite name written by the harness when none is configured.
pub const DEFAULT_SUITE: &str = "Benchmark";

#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkDocument {
    /// Declared update time in ms. Producers stamp the write time here, which
    /// may run ahead of the newest entry; see [`Self::computed_last_update`].
    pub last_update: i64,
    pub repo_url: String,
    pub suites: BTreeMap<String, Vec<EntryRecord>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Wire<'a> {
    last_update: i64,
    repo_url: &'a str,
    entries: &'a BTreeMap<String, Vec<EntryRecord>>,
}

/// Strip an optional `window.BENCHMARK_DATA =` assignment and trailing `;`.
fn json_body(text: &str) -> &str {
    let trimmed = text.trim();
    let body = match trimmed.strip_prefix("window.BENCHMARK_DATA") {
        Some(rest) => rest.trim_start().strip_prefix('=').unwrap_or(rest),
        None => trimmed,
    };
    body.trim().trim_end_matches(';').trim_end()
}

impl BenchmarkDocument {
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            last_update: 0,
            repo_url: repo_url.into(),
            suites: BTreeMap::new(),
        }
    }

    /// Parse a document in script or plain-JSON form, validating every entry.
    ///
    /// # Errors
    /// [`DocumentError::Json`] for syntax errors, [`DocumentError::Shape`] for
    /// a wrong top-level layout, [`DocumentError::Entry`] for an invalid entry
    /// (its path starts with `entries.<suite>[<index>]`).
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let root: Value = serde_json::from_str(json_body(text))?;
        let obj = root
            .as_object()
            .ok_or_else(|| DocumentError::Shape("document root must be an object".into()))?;

        let last_update = obj
            .get("lastUpdate")
            .and_then(Value::as_i64)
            .ok_or_else(|| DocumentError::Shape("`lastUpdate` must be an integer".into()))?;
        let repo_url = match obj.get("repoUrl") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(DocumentError::Shape("`repoUrl` must be a string".into())),
        };

        let mut suites = BTreeMap::new();
        if let Some(entries) = obj.get("entries") {
            let entries = entries
                .as_object()
                .ok_or_else(|| DocumentError::Shape("`entries` must be an object".into()))?;
            for (suite, list) in entries {
                let list = list.as_array().ok_or_else(|| {
                    DocumentError::Shape(format!("`entries.{suite}` must be an array"))
                })?;
                let parsed = list
                    .iter()
                    .enumerate()
                    .map(|(i, e)| {
                        entry_from_json(e)
                            .map_err(|err| err.within(&format!("entries.{suite}[{i}]")))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                suites.insert(suite.clone(), parsed);
            }
        }

        Ok(Self {
            last_update,
            repo_url,
            suites,
        })
    }

    /// Pretty JSON body without the script assignment.
    ///
    /// # Errors
    /// Only if serialization itself fails.
    pub fn render_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Wire {
            last_update: self.last_update,
            repo_url: &self.repo_url,
            entries: &self.suites,
        })
    }

    /// The script form the dashboard loads.
    ///
    /// # Errors
    /// Only if serialization itself fails.
    pub fn render_script(&self) -> Result<String, serde_json::Error> {
        Ok(format!("{SCRIPT_PREFIX}{}", self.render_json()?))
    }

    /// Max `date` over every suite, or `None` for an empty document.
    pub fn computed_last_update(&self) -> Option<i64> {
        self.suites.values().flatten().map(|e| e.date).max()
    }

    pub fn suite(&self, name: &str) -> &[EntryRecord] {
        self.suites.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Replace one suite's log and restamp `last_update` from the entries.
    pub fn set_suite(&mut self, name: &str, entries: Vec<EntryRecord>) {
        self.suites.insert(name.to_string(), entries);
        self.last_update = self.computed_last_update().unwrap_or(0);
    }
}
