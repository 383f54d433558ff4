use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use govfeed_core::expand::create_expander;
use govfeed_core::feed::HttpFeedFetcher;
use govfeed_core::storage::{Database, PersistenceQueue, SqliteArticleStore};
use govfeed_core::{Aggregator, AppConfig, SourceCatalog};

mod commands;

#[derive(Parser)]
#[command(name = "govfeed")]
#[command(author, version, about = "Search government, defense and grant feeds")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Load configuration from this file instead of ~/.config/govfeed/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search every source for matching items
    Search {
        /// Query terms; separate with commas to match any term
        query: String,
        /// Also match descriptions (with term expansion when enabled)
        #[arg(long)]
        deep: bool,
        /// Do not retry with a deep search when the quick search finds nothing
        #[arg(long)]
        no_fallback: bool,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
        /// Show at most this many results
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Print per-run counters to stderr
        #[arg(long)]
        stats: bool,
    },
    /// List configured sources
    Sources,
    /// Fetch every source once and report item counts
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::load()?,
    };

    // Initialize logging; stderr keeps stdout clean for --json
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let catalog = SourceCatalog::from_config(&config).context("Invalid source catalog")?;
    let fetcher = Arc::new(HttpFeedFetcher::new(&config.fetch)?);

    match cli.command {
        Commands::Search {
            query,
            deep,
            no_fallback,
            json,
            limit,
            stats,
        } => {
            let (persistence, writer) = open_persistence(&config).await;
            let mut builder = Aggregator::builder(catalog, fetcher)
                .with_config(&config)
                .expander(create_expander(&config.expansion)?);
            if let Some(queue) = persistence {
                builder = builder.persistence(queue);
            }
            let aggregator = builder.build();

            let options = commands::search::SearchOptions {
                deep,
                fallback: !no_fallback,
                json,
                limit,
                stats,
            };
            commands::search::run(&aggregator, &query, &options).await?;

            // Dropping the aggregator closes the queue; wait for pending writes
            drop(aggregator);
            if let Some(writer) = writer {
                match writer.await {
                    Ok(stored) => tracing::debug!(stored, "Persisted articles"),
                    Err(e) => tracing::warn!(error = %e, "Persistence writer crashed"),
                }
            }
            Ok(())
        }
        Commands::Sources => commands::sources::run(&catalog),
        Commands::Check => commands::check::run(&catalog, fetcher, &config).await,
    }
}

/// Open the article store; a failure disables persistence for this run
async fn open_persistence(config: &AppConfig) -> (Option<PersistenceQueue>, Option<JoinHandle<u64>>) {
    if !config.storage.enabled {
        return (None, None);
    }

    match Database::new(config).await {
        Ok(db) => {
            let (queue, handle) = PersistenceQueue::spawn(Arc::new(SqliteArticleStore::new(db)));
            (Some(queue), Some(handle))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to open database; running without persistence");
            (None, None)
        }
    }
}
