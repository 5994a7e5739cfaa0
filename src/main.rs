//! Kin-Harvest main entry point
//!
//! This is the command-line interface for the Kin-Harvest listing harvester.

use anyhow::Context;
use clap::Parser;
use kin_harvest::config::{load_config_with_hash, Config};
use kin_harvest::storage::open_storage;
use kin_harvest::Coordinator;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Kin-Harvest: harvest a Q&A search listing into SQLite
///
/// Fetches the configured listing once, skips entries already stored,
/// fetches the rest of the detail pages concurrently and upserts them.
#[derive(Parser, Debug)]
#[command(name = "kin-harvest")]
#[command(version)]
#[command(about = "Harvest a Q&A search listing into SQLite", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be fetched without fetching
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show stored record count and recent runs, then exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_harvest(config, config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("kin_harvest=info,warn"),
            1 => EnvFilter::new("kin_harvest=debug,info"),
            2 => EnvFilter::new("kin_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows what a run would fetch
fn handle_dry_run(config: &Config) {
    println!("=== Kin-Harvest Dry Run ===\n");

    println!("Listing:");
    println!("  URL: {}", config.listing.url);
    println!("  Item selector: {}", config.listing.item_selector);
    println!("  Title selector: {}", config.listing.title_selector);
    println!("  Date selector: {}", config.listing.date_selector);
    println!("  Wait timeout: {}s", config.listing.wait_timeout_secs);

    println!("\nDetail selectors:");
    println!("  Title: {}", config.detail.title_selector);
    println!("  Author: {}", config.detail.author_selector);
    println!("  Views: {}", config.detail.views_selector);
    println!("  Created at: {}", config.detail.created_at_selector);
    println!("  Description: {}", config.detail.description_selector);
    println!("  Tags: {}", config.detail.tags_selector);

    println!("\nFetch:");
    println!("  Max attempts: {}", config.fetch.max_retries);
    println!("  Retry delay: {}s", config.fetch.retry_delay_secs);
    println!("  Request timeout: {}s", config.fetch.request_timeout_secs);
    println!("  User agent: {}", config.fetch.user_agent);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows what the database holds
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    println!("Stored records: {}", storage.count_records()?);

    let runs = storage.latest_runs(10)?;
    println!("\nRecent runs ({}):", runs.len());
    for run in runs {
        println!(
            "  #{} {} [{}] listed={} duplicates={} persisted={} failed={}",
            run.id,
            run.started_at,
            run.status.to_db_string(),
            run.listed,
            run.duplicates,
            run.persisted,
            run.detail_failed + run.persist_failed
        );
    }

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, config_hash: String) -> anyhow::Result<()> {
    let storage = open_storage(Path::new(&config.output.database_path))
        .context("failed to open the database")?;
    let listing_url = config.listing.url.clone();

    let coordinator =
        Coordinator::new(config, Arc::new(storage))?.with_config_hash(config_hash);

    match coordinator.run_once(&listing_url).await {
        Ok(summary) => {
            tracing::info!("Harvest completed: {}", summary);
            println!("{}", summary);
            for item in summary.items.iter().filter(|i| i.outcome.is_failure()) {
                println!("  {} {}", item.url, item.outcome);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
