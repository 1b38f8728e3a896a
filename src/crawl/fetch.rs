// src/crawl/fetch.rs
// =============================================================================
// Fetching pages over HTTP.
//
// The crawler only talks to the network through the `PageFetcher` trait, so
// tests can swap in an in-memory fake and count exactly which URLs were
// requested.
//
// Rust concepts:
// - Traits: a shared interface with several implementations
// - async-trait: lets traits have async methods behind Arc<dyn ...>
// =============================================================================

use crate::error::{CrawlError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Anything that can turn a URL into a page body
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the page and returns its body as text
    async fn fetch(&self, url: &str) -> Result<String>;
}

// Fetches pages with reqwest
//
// Redirects are followed; the body returned is whatever the final URL served.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| CrawlError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(url, e))?;

        if !response.status().is_success() {
            return Err(CrawlError::Fetch {
                url: url.to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        response.text().await.map_err(|e| fetch_error(url, e))
    }
}

// Turns a reqwest error into one of our fetch failures
fn fetch_error(url: &str, error: reqwest::Error) -> CrawlError {
    let message = if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_redirect() {
        "too many redirects".to_string()
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    };

    CrawlError::Fetch {
        url: url.to_string(),
        message,
    }
}
