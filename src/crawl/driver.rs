// src/crawl/driver.rs
// =============================================================================
// The crawl driver: what a worker does with one task, and how a whole run is
// started, drained and stopped.
//
// A URL is claimed in the visited set when it is discovered (seeds before
// they are submitted, links before they become tasks). Only the claimer
// creates a task, so every task in the pool stands for a URL nobody else is
// working on, and a duplicate never takes a worker slot. Two pages that both
// link to /about can race to it, but only one of them gets a task for it.
//
// For each task:
// 1. Past the depth bound?            -> done, nothing fetched
// 2. Fetch (with a hard timeout)      -> error means failed, crawl goes on
// 3. At the depth bound?              -> done, links are not followed
// 4. Extract links, resolve them against this page, canonicalize, keep the
//    same-domain http(s) ones, and claim them
// 5. Hand the claimed ones back to the pool as tasks one level deeper
// =============================================================================

use super::fetch::PageFetcher;
use super::links::LinkExtractor;
use super::pool::{PoolStats, WorkerPool};
use super::task::{CrawlTask, TaskOutcome, TaskState};
use super::visited::VisitedSet;
use crate::canonical::{canonical_from_url, canonicalize, same_domain, CanonicalUrl};
use crate::config::CrawlConfig;
use crate::error::{CrawlError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

/// Summary of one crawl run
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub seeds: Vec<String>,
    /// URLs already known from previous runs
    pub previously_visited: usize,
    /// Size of the visited set at the end of this run
    pub visited: usize,
    /// URLs claimed during this run
    pub newly_visited: usize,
    /// Pages fetched successfully
    pub fetched: usize,
    /// Rejected seeds plus tasks that failed (fetch or extraction errors)
    pub failed: usize,
    /// Seeds and discovered links skipped because their URL was already claimed
    pub already_visited: usize,
    /// Tasks dropped at dispatch because they were past the depth bound
    pub beyond_max_depth: usize,
    /// The run was stopped before the queue drained
    pub cancelled: bool,
    pub elapsed_ms: u128,
    pub pool: PoolStats,
}

#[derive(Debug, Default)]
struct Counters {
    fetched: AtomicUsize,
    rejected_seeds: AtomicUsize,
    already_visited: AtomicUsize,
    beyond_max_depth: AtomicUsize,
}

// Everything a worker needs, shared between all running tasks
struct CrawlContext {
    max_depth: usize,
    fetch_timeout: Duration,
    request_delay: Duration,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn LinkExtractor>,
    visited: VisitedSet,
    counters: Counters,
}

pub struct Crawler {
    concurrency: usize,
    previously_visited: usize,
    context: Arc<CrawlContext>,
}

impl Crawler {
    // Creates a crawler
    //
    // Parameters:
    //   config: limits and timeouts for the run
    //   fetcher: how pages are downloaded
    //   extractor: how links are found in a page
    //   previously_visited: URLs loaded from the state file; never fetched again
    pub fn new(
        config: &CrawlConfig,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn LinkExtractor>,
        previously_visited: HashSet<CanonicalUrl>,
    ) -> Self {
        Self {
            concurrency: config.max_concurrent_requests,
            previously_visited: previously_visited.len(),
            context: Arc::new(CrawlContext {
                max_depth: config.max_depth,
                fetch_timeout: config.fetch_timeout,
                request_delay: config.request_delay,
                fetcher,
                extractor,
                visited: VisitedSet::new(previously_visited),
                counters: Counters::default(),
            }),
        }
    }

    // Crawls from the seeds until there is nothing left to do, or until
    // `cancel` fires
    //
    // On cancellation queued tasks are discarded and the tasks already
    // running are allowed to finish. Either way the visited set (including
    // URLs that were claimed but never fetched) is complete when this returns.
    pub async fn run(&self, seeds: &[String], cancel: CancellationToken) -> CrawlReport {
        let started = Instant::now();

        let context = Arc::clone(&self.context);
        let pool = WorkerPool::new(self.concurrency, move |task: CrawlTask| {
            let context = Arc::clone(&context);
            async move { context.process(task).await }
        });

        info!(
            seeds = seeds.len(),
            max_depth = self.context.max_depth,
            max_concurrent_requests = self.concurrency,
            previously_visited = self.previously_visited,
            "starting crawl"
        );

        for seed in seeds {
            if let Some(task) = self.context.claim_seed(seed) {
                pool.submit(task);
            }
        }

        let cancelled = tokio::select! {
            _ = pool.wait_idle() => false,
            _ = cancel.cancelled() => {
                let dropped = pool.shutdown();
                info!(
                    dropped,
                    in_flight = pool.in_flight(),
                    "crawl cancelled, waiting for running fetches"
                );
                pool.wait_idle().await;
                true
            }
        };

        debug_assert!(pool.is_idle());

        let counters = &self.context.counters;
        let pool_stats = pool.stats();
        let visited = self.context.visited.len();

        let report = CrawlReport {
            seeds: seeds.to_vec(),
            previously_visited: self.previously_visited,
            visited,
            newly_visited: visited - self.previously_visited,
            fetched: counters.fetched.load(Ordering::SeqCst),
            failed: pool_stats.failed + counters.rejected_seeds.load(Ordering::SeqCst),
            already_visited: counters.already_visited.load(Ordering::SeqCst),
            beyond_max_depth: counters.beyond_max_depth.load(Ordering::SeqCst),
            cancelled,
            elapsed_ms: started.elapsed().as_millis(),
            pool: pool_stats,
        };

        info!(
            visited = report.visited,
            newly_visited = report.newly_visited,
            fetched = report.fetched,
            failed = report.failed,
            cancelled,
            "crawl finished"
        );
        report
    }

    /// Everything visited so far, previous runs included
    pub fn visited_urls(&self) -> HashSet<CanonicalUrl> {
        self.context.visited.snapshot()
    }
}

impl CrawlContext {
    // Claims a seed URL; None when it is unparsable or already visited
    fn claim_seed(&self, seed: &str) -> Option<CrawlTask> {
        let canonical = match canonicalize(seed, None) {
            Ok(canonical) => canonical,
            Err(e) => {
                warn!(error = %e, "skipping seed");
                self.counters.rejected_seeds.fetch_add(1, Ordering::SeqCst);
                return None;
            }
        };

        if !self.visited.claim(&canonical) {
            info!(url = %canonical, "seed already visited, skipping");
            self.counters.already_visited.fetch_add(1, Ordering::SeqCst);
            return None;
        }

        Some(CrawlTask::seed(seed))
    }

    // Runs one task; Ok carries the follow-up tasks for the pool
    async fn process(&self, task: CrawlTask) -> Result<Vec<CrawlTask>> {
        trace!(task = %task, state = %TaskState::Pending);

        let outcome = self.visit(&task).await;
        match &outcome {
            Ok((TaskOutcome::Crawled { children }, _)) => {
                debug!(task = %task, state = %TaskState::Dispatched(*children));
                debug!(task = %task, state = %TaskState::Done);
            }
            Ok((skipped, _)) => debug!(task = %task, state = %TaskState::Done, reason = ?skipped),
            Err(e) if e.is_fetch_failure() => {
                debug!(task = %task, state = %TaskState::Failed, error = %e, "fetch failed")
            }
            Err(e) => debug!(task = %task, state = %TaskState::Failed, error = %e),
        }

        outcome.map(|(_, children)| children)
    }

    // The task's URL has already been claimed by whoever created the task
    async fn visit(&self, task: &CrawlTask) -> Result<(TaskOutcome, Vec<CrawlTask>)> {
        // Children are never created past the bound; this is a second
        // ceiling, checked before any I/O.
        if task.depth > self.max_depth {
            self.counters.beyond_max_depth.fetch_add(1, Ordering::SeqCst);
            return Ok((TaskOutcome::BeyondMaxDepth, Vec::new()));
        }

        let page = Url::parse(&task.url).map_err(|source| CrawlError::UnparsableUrl {
            url: task.url.clone(),
            source,
        })?;
        let canonical = canonical_from_url(page.clone());

        info!(url = %canonical, depth = task.depth, "crawling");
        debug!(task = %task, state = %TaskState::Fetching);

        let body = self.fetch(&task.url).await?;
        self.counters.fetched.fetch_add(1, Ordering::SeqCst);

        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        if task.depth >= self.max_depth {
            return Ok((TaskOutcome::Crawled { children: 0 }, Vec::new()));
        }

        debug!(task = %task, state = %TaskState::Extracting);
        let hrefs = self.extractor.extract_links(&body, &task.url)?;
        let children = self.new_links(&page, &canonical, hrefs);

        let tasks: Vec<CrawlTask> = children
            .into_iter()
            .map(|link| task.child(link.to_string()))
            .collect();

        Ok((TaskOutcome::Crawled { children: tasks.len() }, tasks))
    }

    // Fetches with a hard deadline on top of whatever the transport does
    async fn fetch(&self, url: &str) -> Result<String> {
        match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(CrawlError::Timeout {
                url: url.to_string(),
                after: self.fetch_timeout,
            }),
        }
    }

    // Turns raw hrefs into canonical same-domain links, claiming each one
    //
    // Only links this call managed to claim are returned; a link already
    // claimed (by this page, another page, or a previous run) is dropped.
    fn new_links(
        &self,
        page: &Url,
        canonical: &CanonicalUrl,
        hrefs: Vec<String>,
    ) -> Vec<CanonicalUrl> {
        let mut links = Vec::new();

        for href in hrefs {
            let link = match canonicalize(&href, Some(page)) {
                Ok(link) => link,
                Err(e) => {
                    trace!(error = %e, "skipping unparsable link");
                    continue;
                }
            };

            if !link.is_web_page() || !same_domain(&link, canonical) {
                continue;
            }
            if !self.visited.claim(&link) {
                self.counters.already_visited.fetch_add(1, Ordering::SeqCst);
                continue;
            }
            links.push(link);
        }

        links
    }
}
