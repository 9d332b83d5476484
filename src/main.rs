//! # contextify CLI
//!
//! ```bash
//! contextify --config ./config/contextify.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `contextify init` | Create the SQLite database and schema |
//! | `contextify sources` | List contexts, root health and indexed counts |
//! | `contextify scan` | Re-index every context (or one with `--context`) |
//! | `contextify query "<text>" --context <name>` | Nearest chunks as JSON |

use clap::builder::TypedValueParser;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use contextify::progress::ProgressMode;
use contextify::sqlite_store::SqliteStore;
use contextify::{config, search, sources, sync};
use contextify_core::query::DEFAULT_N_RESULTS;

/// contextify: keep a vector index of your files in sync for
/// retrieval-augmented prompting.
#[derive(Parser)]
#[command(name = "contextify", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/contextify.toml")]
    config: PathBuf,

    /// Log more detail to stderr (same as RUST_LOG=debug).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and schema. Safe to run repeatedly.
    Init,

    /// List configured contexts, whether their roots exist, and how much
    /// of each is indexed.
    Sources,

    /// Scan context roots and bring the index in line with disk.
    ///
    /// New files are embedded, changed files are replaced, unchanged files
    /// are skipped, and files that disappeared are removed.
    Scan {
        /// Only scan this context.
        #[arg(long)]
        context: Option<String>,

        /// Scan and classify files without embedding or writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Progress output on stderr. Defaults to `human` on a terminal.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Query one context for the chunks nearest to TEXT.
    Query {
        /// The query text.
        text: String,

        /// Context to search.
        #[arg(long, short)]
        context: String,

        /// Maximum number of matches.
        #[arg(short = 'n', long = "n-results", default_value_t = DEFAULT_N_RESULTS,
              value_parser = clap::value_parser!(u64).range(1..).map(|n| n as usize))]
        n_results: usize,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let store = SqliteStore::open(&cfg.db.path).await?;
            store.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Sources => {
            sources::list_sources(&cfg).await?;
        }
        Commands::Scan {
            context,
            dry_run,
            progress,
        } => {
            let progress = progress.unwrap_or_else(ProgressMode::default_for_tty);
            sync::run_scan(&cfg, context.as_deref(), dry_run, progress).await?;
        }
        Commands::Query {
            text,
            context,
            n_results,
        } => {
            search::run_query(&cfg, &context, &text, n_results).await?;
        }
    }

    Ok(())
}
