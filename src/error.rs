// src/error.rs
// =============================================================================
// Error types for the crawl engine.
//
// Only two of these ever stop a run: a state file we refuse to overwrite
// (CorruptState / Persistence at load) and a failed flush at the end.
// Everything else is per-task: the task is marked failed, a warning is
// logged, and the crawl moves on.
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlError {
    /// The string could not be parsed as a URL (skip, never enqueue)
    #[error("unparsable URL '{url}': {source}")]
    UnparsableUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Network or HTTP-level failure while fetching a page
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    /// The fetch did not finish inside the per-fetch timeout
    #[error("fetch of {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },

    /// The page body could not be turned into links
    #[error("failed to extract links from {url}: {message}")]
    Extraction { url: String, message: String },

    /// The state file could not be read or written
    #[error("state file {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The state file exists but is not something we can safely treat as ours
    #[error("state file {path} is not a visited-URL list: {reason}")]
    CorruptState { path: PathBuf, reason: String },

    /// Invalid runtime configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CrawlError {
    /// Fetch-side failures (including timeouts) are all reported the same way
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, CrawlError::Fetch { .. } | CrawlError::Timeout { .. })
    }
}

pub type Result<T, E = CrawlError> = std::result::Result<T, E>;
