// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments, build the crawl config and check the seed
// 2. Load the URLs visited by previous runs from the state file
// 3. Crawl from the seed URL until nothing is left (or Ctrl-C)
// 4. Write the full visited set back to the state file
// 5. Exit with proper code (0 = done, 1 = interrupted but saved, 2 = error)
// =============================================================================

// Module declarations - tells Rust about our other source files
mod canonical; // src/canonical.rs - URL canonicalization
mod cli; // src/cli.rs - command-line parsing
mod config; // src/config.rs - validated runtime settings
mod crawl; // src/crawl/ - the crawl engine
mod error; // src/error.rs - error types
mod logging; // src/logging.rs - tracing setup
mod store; // src/store.rs - visited-set persistence

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use config::{parse_seed, CrawlConfig};
use crawl::{CrawlReport, Crawler, HtmlLinkExtractor, HttpFetcher, LinkExtractor, PageFetcher};
use std::sync::Arc;
use store::VisitedStore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    logging::init_logging();

    let outcome = run().await;
    if let Err(e) = &outcome {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
    }

    std::process::exit(exit_code(&outcome));
}

// Maps how the run ended to the process exit code:
//   0 = crawl finished and state saved
//   1 = crawl interrupted, state saved
//   2 = bad config or seed, unreadable state, or the state could not be saved
fn exit_code(outcome: &Result<CrawlReport>) -> i32 {
    match outcome {
        Ok(report) if report.cancelled => 1,
        Ok(_) => 0,
        Err(_) => 2,
    }
}

// This is the main application logic
async fn run() -> Result<CrawlReport> {
    let cli = Cli::parse();
    let config = CrawlConfig::from_cli(&cli)?;

    println!("🔍 Crawling website: {}", cli.seed_url);
    println!(
        "📊 Max depth: {}, max concurrent requests: {}",
        config.max_depth, config.max_concurrent_requests
    );

    let fetcher = HttpFetcher::new(config.fetch_timeout, &config.user_agent)?;
    let extractor = HtmlLinkExtractor::new()?;

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let (report, saved) = crawl_and_save(
        &cli.seed_url,
        &config,
        Arc::new(fetcher),
        Arc::new(extractor),
        cancel,
    )
    .await?;

    print_report(&report, saved, &VisitedStore::new(&config.state_file), cli.json)?;
    Ok(report)
}

// One full run against the state file: check the seed, load, crawl, flush
//
// The state file is loaded and written back even when nothing new is found,
// and also when the crawl is cancelled.
// Returns the run report and the number of URLs written.
async fn crawl_and_save(
    seed: &str,
    config: &CrawlConfig,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn LinkExtractor>,
    cancel: CancellationToken,
) -> Result<(CrawlReport, usize)> {
    parse_seed(seed)?;

    let store = VisitedStore::new(&config.state_file);
    let previously_visited = store
        .load()
        .with_context(|| format!("cannot load state from {}", store.path().display()))?;
    println!("📄 {} URL(s) already visited", previously_visited.len());

    let crawler = Crawler::new(config, fetcher, extractor, previously_visited);
    let report = crawler.run(&[seed.trim().to_string()], cancel).await;

    let saved = store
        .flush(&crawler.visited_urls())
        .with_context(|| format!("cannot save state to {}", store.path().display()))?;

    Ok((report, saved))
}

// Cancels the crawl on the first Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("interrupt received, finishing running fetches and saving state");
                cancel.cancel();
            }
            Err(e) => warn!(error = %e, "cannot listen for Ctrl-C"),
        }
    });
}

// Prints the report either as a summary or JSON
fn print_report(report: &CrawlReport, saved: usize, store: &VisitedStore, json: bool) -> Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(report)?;
        println!("{}", json_output);
        return Ok(());
    }

    println!();
    println!("📊 Summary:");
    println!("   ✅ Fetched: {}", report.fetched);
    println!("   ❌ Failed: {}", report.failed);
    println!("   🆕 New URLs: {}", report.newly_visited);
    println!("   📋 Total visited: {}", report.visited);
    println!("   ⏱️  Took: {} ms", report.elapsed_ms);
    if report.cancelled {
        println!("   ⚠️  Interrupted before the crawl finished");
    }
    println!("💾 Saved {} URL(s) to {}", saved, store.path().display());

    info!(saved, "state flushed");
    Ok(())
}
