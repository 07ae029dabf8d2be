mod query_cmd;
mod store_cmd;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bench_history::config::{self, BackendKind, HistoryConfig};

#[derive(Parser)]
#[command(
    name = "bench-history",
    version,
    about = "Append-only benchmark history, one log per platform group"
)]
struct Cli {
    /// Data directory (overrides config files and BENCH_HISTORY_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Storage backend
    #[arg(long, global = true, value_enum)]
    backend: Option<BackendKind>,

    /// Suite read from and written to each group document
    #[arg(long, global = true)]
    suite: Option<String>,

    /// Repository URL recorded alongside the history
    #[arg(long, global = true)]
    repo_url: Option<String>,

    /// Log store activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an entry and append it to a group's log
    Append {
        /// Group key, e.g. linux-x64-simd4
        #[arg(long)]
        group: String,
        /// Entry JSON file (reads stdin when omitted)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Show the most recently appended entry of a group
    Latest {
        #[arg(long)]
        group: String,
        /// Print the entry as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the (date, value) series of one bench
    Series {
        #[arg(long)]
        group: String,
        /// Bench name
        #[arg(long)]
        bench: String,
        /// Print the series as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// List every bench name seen in a group
    Names {
        #[arg(long)]
        group: String,
    },
    /// List groups with at least one entry
    Groups,
    /// Audit persisted history for ordering and provenance problems
    Check {
        /// Exit 1 when any finding is reported
        #[arg(long)]
        strict: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "bench_history=info"
    } else {
        "bench_history=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Config files and environment first, then command-line flags on top.
fn resolve_config(cli: &Cli) -> HistoryConfig {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let root = config::project_root_for(&cwd);
    let mut cfg = HistoryConfig::load(Some(&root));
    if let Some(dir) = &cli.data_dir {
        cfg.data_dir.clone_from(dir);
    }
    if let Some(backend) = cli.backend {
        cfg.backend = backend;
    }
    if let Some(suite) = &cli.suite {
        cfg.suite.clone_from(suite);
    }
    if let Some(url) = &cli.repo_url {
        cfg.repo_url.clone_from(url);
    }
    tracing::info!(
        data_dir = %cfg.data_dir.display(),
        backend = ?cfg.backend,
        suite = %cfg.suite,
        "resolved config"
    );
    cfg
}

fn report(result: anyhow::Result<i32>) -> i32 {
    result.unwrap_or_else(|e| {
        eprintln!("[bench-history] error: {e:#}");
        1
    })
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let cfg = resolve_config(&cli);

    let exit_code = match &cli.command {
        Commands::Append { group, file } => {
            report(store_cmd::cmd_append(&cfg, group, file.as_deref()))
        }
        Commands::Latest { group, json } => report(query_cmd::cmd_latest(&cfg, group, *json)),
        Commands::Series { group, bench, json } => {
            report(query_cmd::cmd_series(&cfg, group, bench, *json))
        }
        Commands::Names { group } => report(query_cmd::cmd_names(&cfg, group)),
        Commands::Groups => report(query_cmd::cmd_groups(&cfg)),
        Commands::Check { strict } => report(store_cmd::cmd_check(&cfg, *strict)),
    };
    std::process::exit(exit_code);
}
