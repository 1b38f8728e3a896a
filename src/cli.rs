// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things). With the `env` feature,
// every option can also come from an environment variable, which is handy
// in cron jobs and containers.
// =============================================================================

use crate::config::{
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_MAX_DEPTH,
    DEFAULT_REQUEST_DELAY_MS, DEFAULT_STATE_FILE, DEFAULT_USER_AGENT,
};
use clap::Parser;
use std::path::PathBuf;

// This struct represents our entire CLI application
#[derive(Parser, Debug)]
#[command(
    name = "site-crawler",
    version,
    about = "Crawl every page of a website reachable from a seed URL",
    long_about = "site-crawler follows same-domain links from a seed URL up to a maximum depth, \
                  fetching a bounded number of pages at a time. The set of visited URLs is saved \
                  to a CSV file, so running it again only visits pages it hasn't seen before."
)]
pub struct Cli {
    /// Website URL to start from (e.g., https://example.com)
    pub seed_url: String,

    /// Maximum number of pages fetched at the same time
    #[arg(long, env = "MAX_CONCURRENT_REQUESTS", default_value_t = DEFAULT_MAX_CONCURRENT_REQUESTS)]
    pub max_concurrent_requests: usize,

    /// Maximum crawl depth (0 = just the seed page, 1 = the seed and the pages it links to, ...)
    #[arg(long, env = "MAX_DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// CSV file holding the URLs visited by previous runs
    #[arg(long, env = "STATE_FILE_PATH", default_value = DEFAULT_STATE_FILE)]
    pub state_file: PathBuf,

    /// Give up on a single page after this many seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    pub fetch_timeout_secs: u64,

    /// Pause after each fetch, per worker, in milliseconds
    #[arg(long, env = "REQUEST_DELAY_MS", default_value_t = DEFAULT_REQUEST_DELAY_MS)]
    pub request_delay_ms: u64,

    /// User-Agent header sent with every request
    #[arg(long, env = "CRAWLER_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Print the run report as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["site-crawler", "https://example.com"]);
        assert_eq!(cli.seed_url, "https://example.com");
        assert!(!cli.json);
        assert_eq!(cli.state_file, PathBuf::from(DEFAULT_STATE_FILE));
    }

    #[test]
    fn test_seed_is_required() {
        assert!(Cli::try_parse_from(["site-crawler"]).is_err());
    }
}
