//! Spider-Index main entry point
//!
//! This is the command-line interface for the Spider-Index crawler.

use anyhow::Context;
use clap::Parser;
use spider_index::config::{load_config_with_hash, Config};
use spider_index::crawler::run_crawl;
use spider_index::output::{load_statistics, print_statistics};
use spider_index::seeds::load_seeds;
use spider_index::storage::open_storage;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Spider-Index: a breadth-first crawler that builds a keyword index
///
/// Spider-Index fetches each seed address, follows outbound links up to the
/// configured depth, and records how often every keyword appears on every
/// page it indexes.
#[derive(Parser, Debug)]
#[command(name = "spider-index")]
#[command(version)]
#[command(about = "A breadth-first crawler that builds a keyword index", long_about = None)]
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

    /// Validate config and seeds without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the index database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("spider_index=info,warn"),
            1 => EnvFilter::new("spider_index=debug,info"),
            2 => EnvFilter::new("spider_index=trace,debug"),
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

/// Handles the --dry-run mode: validates config and lists the seeds
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Spider-Index Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Workers: {}", config.crawler.workers);
    println!("  Fetch timeout: {}s", config.crawler.fetch_timeout_secs);
    println!("  Connect timeout: {}s", config.crawler.connect_timeout_secs);
    match config.crawler.deadline() {
        Some(deadline) => println!("  Deadline: {:?}", deadline),
        None => println!("  Deadline: none"),
    }
    println!("  Fold case: {}", config.crawler.fold_case);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    let seeds = load_seeds(Path::new(&config.input.seed_file))
        .with_context(|| format!("failed to load seeds from {}", config.input.seed_file))?;
    println!("\nSeeds ({}):", seeds.len());
    for seed in &seeds {
        println!("  - {}", seed.address);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling with {} seed addresses", seeds.len());

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))
        .with_context(|| format!("failed to open {}", config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, finishing in-flight tasks");
                cancel.cancel();
            }
        });
    }

    let report = run_crawl(config, config_hash, cancel)
        .await
        .context("crawl failed")?;

    println!("Crawling took {:?}", report.elapsed);
    println!(
        "{} task(s): {} indexed, {} already visited, {} failed, {} beyond max depth",
        report.tasks, report.indexed, report.skipped, report.fetch_failed, report.depth_exceeded
    );
    if report.keyword_errors > 0 {
        println!("{} keyword update(s) failed", report.keyword_errors);
    }
    if report.cancelled {
        println!("Crawl was cancelled; {} task(s) left unprocessed", report.abandoned);
    }

    Ok(())
}
