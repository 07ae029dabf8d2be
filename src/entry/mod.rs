//! The unit of storage: one CI run's benchmark record.

mod tool;
mod validate;

pub use tool::{Direction, direction_of};
pub use validate::entry_from_json;

use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::error::ValidationError;

/// A git identity as reported by the CI event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Commit provenance of a run. Field order follows the persisted layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub author: Person,
    pub committer: Person,
    pub distinct: bool,
    pub id: String,
    pub message: String,
    /// ISO-8601 timestamp kept verbatim so documents round-trip unchanged.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A single named measurement.
///
/// `value` keeps the JSON number as written (integer throughput stays an
/// integer on disk); use [`Bench::value`] for arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bench {
    pub name: String,
    #[serde(rename = "value")]
    pub raw_value: Number,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl Bench {
    pub fn new(name: impl Into<String>, value: impl Into<Number>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_value: value.into(),
            range: None,
            unit: unit.into(),
            extra: None,
        }
    }

    /// Build a bench from a float. Returns `None` for NaN or infinities,
    /// which JSON cannot represent.
    pub fn from_f64(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Option<Self> {
        let raw_value = Number::from_f64(value)?;
        Some(Self {
            name: name.into(),
            raw_value,
            range: None,
            unit: unit.into(),
            extra: None,
        })
    }

    #[must_use]
    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    #[must_use]
    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    /// The metric as a float. Every finite JSON number converts.
    pub fn value(&self) -> f64 {
        self.raw_value.as_f64().unwrap_or(f64::NAN)
    }
}

/// One CI run's complete benchmark record for a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub commit: Commit,
    /// Completion time in milliseconds since the Unix epoch.
    pub date: i64,
    pub tool: String,
    pub benches: Vec<Bench>,
}

impl EntryRecord {
    /// Semantic checks on an already-typed entry.
    ///
    /// # Errors
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.commit.id.trim().is_empty() {
            return Err(ValidationError::invalid("commit.id", "must not be empty"));
        }
        if chrono::DateTime::parse_from_rfc3339(&self.commit.timestamp).is_err() {
            return Err(ValidationError::invalid(
                "commit.timestamp",
                format!("`{}` is not an ISO-8601 timestamp", self.commit.timestamp),
            ));
        }
        if self.date <= 0 {
            return Err(ValidationError::invalid(
                "date",
                "must be a positive integer",
            ));
        }
        if self.tool.trim().is_empty() {
            return Err(ValidationError::invalid("tool", "must not be empty"));
        }
        for (i, bench) in self.benches.iter().enumerate() {
            if bench.name.trim().is_empty() {
                return Err(ValidationError::invalid(
                    format!("benches[{i}].name"),
                    "must not be empty",
                ));
            }
            if !bench.value().is_finite() {
                return Err(ValidationError::invalid(
                    format!("benches[{i}].value"),
                    "must be a finite number",
                ));
            }
        }
        Ok(())
    }

    /// First bench with the given name. Names are free-form and may repeat;
    /// the first occurrence wins.
    pub fn bench(&self, name: &str) -> Option<&Bench> {
        self.benches.iter().find(|b| b.name == name)
    }

    pub fn bench_names(&self) -> impl Iterator<Item = &str> {
        self.benches.iter().map(|b| b.name.as_str())
    }

    /// Comparison direction implied by `tool`, if the tag is a known one.
    pub fn direction(&self) -> Option<Direction> {
        direction_of(&self.tool)
    }
}
