use std::path::{Path, PathBuf};

use crate::document::DEFAULT_SUITE;

/// Directory name holding the project-level config file.
pub const PROJECT_DIR: &str = ".bench-history";

/// Overrides the data directory from any config file.
pub const DATA_DIR_ENV: &str = "BENCH_HISTORY_DATA_DIR";

/// Data directory used when no config file sets one, relative to the project root.
pub const DEFAULT_DATA_DIR: &str = "dev/bench";

/// File name of the database under the data directory for the `sqlite` backend.
pub const SQLITE_FILE: &str = "history.db";

/// Where history is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// One `data.js` document per group directory.
    #[default]
    Json,
    /// A single `history.db` in the data directory.
    Sqlite,
}

/// Resolved store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    pub data_dir: PathBuf,
    pub backend: BackendKind,
    pub suite: String,
    pub repo_url: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            backend: BackendKind::default(),
            suite: DEFAULT_SUITE.to_string(),
            repo_url: String::new(),
        }
    }
}

/// Private: parsed representation of a config file.
#[derive(serde::Deserialize, Default)]
struct ConfigFile {
    store: Option<StoreSection>,
}

#[derive(serde::Deserialize, Default)]
struct StoreSection {
    data_dir: Option<PathBuf>,
    backend: Option<BackendKind>,
    suite: Option<String>,
    repo_url: Option<String>,
}

/// Read the `[store]` section of a TOML config file. Missing files yield
/// `None`; unreadable or malformed ones are logged and yield `None`.
fn read_store_section(path: &Path) -> Option<StoreSection> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), "cannot read config: {e}");
            return None;
        }
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(cfg) => cfg.store,
        Err(e) => {
            tracing::warn!(path = %path.display(), "ignoring malformed config: {e}");
            None
        }
    }
}

impl HistoryConfig {
    /// Load config using auto-detected paths, then apply environment
    /// overrides. Priority per field:
    /// 1. `BENCH_HISTORY_DATA_DIR` (data directory only)
    /// 2. `{project_root}/.bench-history/config.toml` `[store]`
    /// 3. `{config_dir}/bench-history/config.toml` `[store]`
    /// 4. Defaults
    pub fn load(project_root: Option<&Path>) -> Self {
        let global = dirs::config_dir().map(|d| d.join("bench-history").join("config.toml"));
        Self::load_from(project_root, global.as_deref()).with_env_overrides()
    }

    /// Load config from explicit paths, without consulting the environment.
    /// A relative `data_dir` is resolved against `project_root` when given.
    pub fn load_from(project_root: Option<&Path>, global_config: Option<&Path>) -> Self {
        let project = project_root
            .and_then(|root| read_store_section(&root.join(PROJECT_DIR).join("config.toml")))
            .unwrap_or_default();
        let global = global_config
            .and_then(read_store_section)
            .unwrap_or_default();
        let defaults = Self::default();

        let data_dir = project
            .data_dir
            .or(global.data_dir)
            .unwrap_or(defaults.data_dir);
        let data_dir = match project_root {
            Some(root) if data_dir.is_relative() => root.join(data_dir),
            _ => data_dir,
        };

        Self {
            data_dir,
            backend: project
                .backend
                .or(global.backend)
                .unwrap_or(defaults.backend),
            suite: project.suite.or(global.suite).unwrap_or(defaults.suite),
            repo_url: project
                .repo_url
                .or(global.repo_url)
                .unwrap_or(defaults.repo_url),
        }
    }

    /// Apply `BENCH_HISTORY_DATA_DIR` if set and non-empty.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV)
            && !dir.is_empty()
        {
            self.data_dir = PathBuf::from(dir);
        }
        self
    }

    /// Database path for the `sqlite` backend.
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join(SQLITE_FILE)
    }
}

/// Walk up from `dir` to find the nearest ancestor containing `.git` or
/// `.bench-history/`. Falls back to `dir` itself if neither is found.
pub fn project_root_for(dir: &Path) -> PathBuf {
    let mut current = dir.to_path_buf();
    loop {
        if current.join(".git").exists() || current.join(PROJECT_DIR).is_dir() {
            return current;
        }
        if !current.pop() {
            break;
        }
    }
    dir.to_path_buf()
}
