// src/config.rs
// =============================================================================
// Runtime settings for one crawl.
//
// Values come from the command line (see cli.rs), where every option can also
// be set through an environment variable:
//
//   MAX_CONCURRENT_REQUESTS   how many pages may be fetched at once
//   MAX_DEPTH                 how many link hops from the seed to follow
//   STATE_FILE_PATH           where the visited set is kept between runs
//   FETCH_TIMEOUT_SECS        per-fetch timeout
//   REQUEST_DELAY_MS          pause after each fetch, per worker
//   CRAWLER_USER_AGENT        User-Agent header sent with every request
// =============================================================================

use crate::canonical::{canonicalize, CanonicalUrl};
use crate::cli::Cli;
use crate::error::{CrawlError, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 5;
pub const DEFAULT_MAX_DEPTH: usize = 10;
pub const DEFAULT_STATE_FILE: &str = "./output/crawled_urls.csv";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 100;
pub const DEFAULT_USER_AGENT: &str = concat!("site-crawler/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlConfig {
    /// Global ceiling on concurrent fetches
    pub max_concurrent_requests: usize,
    /// Deepest link hop that is still fetched (the seed is depth 0)
    pub max_depth: usize,
    /// Visited-set CSV file
    pub state_file: PathBuf,
    /// A fetch still running after this long is abandoned
    pub fetch_timeout: Duration,
    /// Politeness pause each worker takes after a successful fetch
    pub request_delay: Duration,
    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            max_depth: DEFAULT_MAX_DEPTH,
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CrawlConfig {
    /// Builds and validates the config from parsed command-line arguments
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = Self {
            max_concurrent_requests: cli.max_concurrent_requests,
            max_depth: cli.max_depth,
            state_file: cli.state_file.clone(),
            fetch_timeout: Duration::from_secs(cli.fetch_timeout_secs),
            request_delay: Duration::from_millis(cli.request_delay_ms),
            user_agent: cli.user_agent.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_requests == 0 {
            return Err(CrawlError::Config(
                "MAX_CONCURRENT_REQUESTS must be at least 1".to_string(),
            ));
        }
        // Without a timeout a hung server could hold a worker slot forever
        if self.fetch_timeout.is_zero() {
            return Err(CrawlError::Config(
                "FETCH_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }
        if self.state_file.as_os_str().is_empty() {
            return Err(CrawlError::Config("STATE_FILE_PATH must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Checks the seed before anything is loaded or fetched
///
/// The seed must be an absolute http(s) URL; `example.com` without a scheme
/// is refused instead of silently crawling nothing.
pub fn parse_seed(raw: &str) -> Result<CanonicalUrl> {
    let seed = canonicalize(raw.trim(), None)
        .map_err(|e| CrawlError::Config(format!("invalid seed URL: {}", e)))?;

    if !seed.is_web_page() || seed.host().is_none() {
        return Err(CrawlError::Config(format!(
            "seed URL must be an absolute http(s) URL, got '{}'",
            raw
        )));
    }
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults_are_valid() {
        let config = CrawlConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_concurrent_requests, 5);
        assert_eq!(config.max_depth, 10);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = CrawlConfig {
            max_concurrent_requests: 0,
            ..CrawlConfig::default()
        };
        assert!(matches!(config.validate(), Err(CrawlError::Config(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = CrawlConfig {
            fetch_timeout: Duration::ZERO,
            ..CrawlConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_cli_flags() {
        let cli = Cli::parse_from([
            "site-crawler",
            "https://example.com",
            "--max-concurrent-requests",
            "3",
            "--max-depth",
            "2",
            "--state-file",
            "/tmp/visited.csv",
            "--request-delay-ms",
            "0",
        ]);
        let config = CrawlConfig::from_cli(&cli).unwrap();
        assert_eq!(config.max_concurrent_requests, 3);
        assert_eq!(config.max_depth, 2);
        assert_eq!(config.state_file, PathBuf::from("/tmp/visited.csv"));
        assert_eq!(config.request_delay, Duration::ZERO);
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_from_cli_rejects_zero_concurrency() {
        let cli = Cli::parse_from([
            "site-crawler",
            "https://example.com",
            "--max-concurrent-requests",
            "0",
        ]);
        assert!(CrawlConfig::from_cli(&cli).is_err());
    }

    #[test]
    fn test_parse_seed() {
        let seed = parse_seed("https://Example.com/start?ref=x").unwrap();
        assert_eq!(seed.as_str(), "https://example.com/start");
        assert!(parse_seed("  http://example.com/ ").is_ok());
    }

    #[test]
    fn test_parse_seed_rejects_non_web_urls() {
        for raw in ["example.com", "", "not a url", "ftp://example.com/", "mailto:a@example.com"] {
            let err = parse_seed(raw).unwrap_err();
            assert!(matches!(err, CrawlError::Config(_)), "accepted {:?}", raw);
        }
    }
}
