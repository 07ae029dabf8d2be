use std::fmt;
use std::path::PathBuf;

/// What was wrong with the field at a [`ValidationError`]'s path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    Missing,
    WrongType { expected: &'static str },
    Invalid(String),
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "required field is missing"),
            Self::WrongType { expected } => write!(f, "expected {expected}"),
            Self::Invalid(msg) => write!(f, "{msg}"),
        }
    }
}

/// A rejected entry. `path` is a dotted/indexed location such as
/// `benches[2].value`; an empty path refers to the entry itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid entry at `{path}`: {kind}")]
pub struct ValidationError {
    pub path: String,
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    pub fn missing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ValidationErrorKind::Missing,
        }
    }

    pub fn wrong_type(path: impl Into<String>, expected: &'static str) -> Self {
        Self {
            path: path.into(),
            kind: ValidationErrorKind::WrongType { expected },
        }
    }

    pub fn invalid(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ValidationErrorKind::Invalid(msg.into()),
        }
    }

    /// Prefix the path with an outer location, e.g. `entries.Benchmark[3]`.
    #[must_use]
    pub fn within(mut self, outer: &str) -> Self {
        self.path = if self.path.is_empty() {
            outer.to_string()
        } else if self.path.starts_with('[') {
            format!("{outer}{}", self.path)
        } else {
            format!("{outer}.{}", self.path)
        };
        self
    }
}

/// Why a persisted benchmark document could not be read.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Shape(String),

    #[error(transparent)]
    Entry(#[from] ValidationError),
}

/// Failures of the persistence layer. Never retried internally.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed document {}: {source}", path.display())]
    Document {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("entry payload (de)serialization failed: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("corrupt history for group `{group}`: {source}")]
    Corrupt {
        group: String,
        #[source]
        source: ValidationError,
    },
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Error returned by [`crate::store::HistoryStore`] mutations.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
