// src/crawl/mod.rs
// =============================================================================
// This module handles website crawling.
//
// Submodules:
// - task: a single (url, depth) unit of work and its lifecycle states
// - visited: the shared, claim-once set of visited URLs
// - pool: bounded worker pool that runs tasks and detects quiescence
// - fetch: downloads pages (PageFetcher trait + reqwest implementation)
// - links: finds links in a page (LinkExtractor trait + scraper implementation)
// - driver: ties it all together into a crawl run
// =============================================================================

mod driver;
mod fetch;
mod links;
mod pool;
mod task;
mod visited;

// Re-export the pieces main.rs needs
pub use driver::{CrawlReport, Crawler};
pub use fetch::{HttpFetcher, PageFetcher};
pub use links::{HtmlLinkExtractor, LinkExtractor};
