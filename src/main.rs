//! # Review Sync CLI (`review-sync`)
//!
//! Reconciles the ingestion metrics store with the human review store.
//!
//! ## Usage
//!
//! ```bash
//! review-sync [--config ./config/review-sync.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `review-sync init` | Create both stores with the expected tables |
//! | `review-sync sync` | Run the three reconciliation passes |
//! | `review-sync stats` | Print per-store counts |
//!
//! ## Examples
//!
//! ```bash
//! # Sync the default layout under the current directory
//! review-sync sync
//!
//! # Sync explicit store files
//! review-sync sync --metrics /data/metrics.db --review /srv/review/review.db
//! ```

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use review_sync::config::{self, Config};
use review_sync::db::{self, Store, StorePaths};
use review_sync::events::TracingLog;
use review_sync::schema;
use review_sync::stats;
use review_sync::sync::{sync_stores, SyncOutcome};

/// Review Sync CLI — reconciles the metrics store and the review store.
///
/// Store locations come from the config file (if any), then from
/// `--metrics` / `--review`, falling back to `data/metrics.db` and
/// `review/review.db` under the project root.
#[derive(Parser)]
#[command(
    name = "review-sync",
    about = "Review Sync — reconciles the ingestion metrics store with the human review store",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/review-sync.toml` when that file exists;
    /// otherwise built-in defaults are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Per-command store path overrides.
#[derive(Args)]
struct StoreArgs {
    /// Metrics store path (overrides config).
    #[arg(long)]
    metrics: Option<PathBuf>,

    /// Review store path (overrides config).
    #[arg(long)]
    review: Option<PathBuf>,
}

impl StoreArgs {
    fn resolve(&self, cfg: &Config) -> anyhow::Result<StorePaths> {
        let mut paths = cfg.store_paths();
        if let Some(metrics) = &self.metrics {
            paths.metrics = metrics.clone();
        }
        if let Some(review) = &self.review {
            paths.review = review.clone();
        }
        config::validate_paths(&paths)?;
        Ok(paths)
    }
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Create both stores and their tables.
    ///
    /// Creates missing store files and parent directories. Existing tables
    /// and rows are left as they are, so running it twice is safe.
    Init {
        #[command(flatten)]
        stores: StoreArgs,
    },

    /// Reconcile the metrics store and the review store.
    ///
    /// Copies new documents and issues into the review store, refreshes
    /// ingestion-owned fields, and writes finished review verdicts back to
    /// the metrics store. Does nothing if either store is absent.
    Sync {
        #[command(flatten)]
        stores: StoreArgs,
    },

    /// Show document, issue, and review status counts for both stores.
    Stats {
        #[command(flatten)]
        stores: StoreArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Init { stores } => {
            let paths = stores.resolve(&cfg)?;
            run_init(&paths).await?;
            println!("Stores initialized successfully.");
        }
        Commands::Sync { stores } => {
            let paths = stores.resolve(&cfg)?;
            run_sync(&paths).await?;
        }
        Commands::Stats { stores } => {
            let paths = stores.resolve(&cfg)?;
            stats::run_stats(&paths).await?;
        }
    }

    Ok(())
}

async fn run_init(paths: &StorePaths) -> anyhow::Result<()> {
    let metrics = db::create_store(Store::Metrics, &paths.metrics).await?;
    let created = schema::create_metrics_schema(&metrics).await;
    metrics.close().await;
    created?;
    info!(path = %paths.metrics.display(), "metrics store ready");

    let review = db::create_store(Store::Review, &paths.review).await?;
    let created = schema::create_review_schema(&review).await;
    review.close().await;
    created?;
    info!(path = %paths.review.display(), "review store ready");

    Ok(())
}

async fn run_sync(paths: &StorePaths) -> anyhow::Result<()> {
    let outcome = sync_stores(paths, &TracingLog).await;

    match outcome {
        Ok(SyncOutcome::Synced(report)) => {
            println!("sync");
            println!("  documents inserted: {}", report.documents_inserted);
            println!("  documents refreshed: {}", report.documents_refreshed);
            println!("  issues inserted: {}", report.issues_inserted);
            println!("  statuses propagated: {}", report.statuses_propagated);
            println!("ok");
            Ok(())
        }
        Ok(SyncOutcome::Skipped(absence)) => {
            println!("sync skipped: {}", absence);
            println!("  metrics: {}", paths.metrics.display());
            println!("  review: {}", paths.review.display());
            Ok(())
        }
        Err(failure) => {
            println!("sync failed during {}", failure.stage);
            println!("  documents inserted before failure: {}", failure.progress.documents_inserted);
            println!("  issues inserted before failure: {}", failure.progress.issues_inserted);
            println!(
                "  review store committed: {}",
                if failure.review_committed { "yes" } else { "no" }
            );
            let retry_hint = if failure.is_busy() {
                " (store busy, retry later)"
            } else {
                ""
            };
            Err(failure).with_context(|| format!("sync did not complete{}", retry_hint))
        }
    }
}
