// src/crawl/task.rs
// =============================================================================
// A unit of crawl work and the states it moves through.
//
//   Pending -> Fetching -> Extracting -> Dispatched(n) -> Done
//   Pending -> Fetching -> Failed
//   Pending -> Done                  (beyond max depth)
//
// Tasks are created by the driver only for URLs it has just claimed in the
// visited set, consumed exactly once by a worker, and never mutated in
// between.
// =============================================================================

use std::fmt;

// Represents a page waiting to be crawled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    /// The URL to visit (as discovered, canonicalized again on dispatch)
    pub url: String,
    /// How many link hops from the seed (the seed itself is depth 0)
    pub depth: usize,
}

impl CrawlTask {
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: 0,
        }
    }

    /// A task for a link found on this task's page
    pub fn child(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: self.depth + 1,
        }
    }
}

impl fmt::Display for CrawlTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (depth {})", self.url, self.depth)
    }
}

/// Where a task currently is in its lifecycle (used in debug logs)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Fetching,
    Extracting,
    Dispatched(usize),
    Failed,
    Done,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Pending => f.write_str("pending"),
            TaskState::Fetching => f.write_str("fetching"),
            TaskState::Extracting => f.write_str("extracting"),
            TaskState::Dispatched(n) => write!(f, "dispatched({})", n),
            TaskState::Failed => f.write_str("failed"),
            TaskState::Done => f.write_str("done"),
        }
    }
}

/// How a task that didn't fail came to be done
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Depth bound reached before any I/O
    BeyondMaxDepth,
    /// Page fetched; `children` new tasks were handed back to the pool
    Crawled { children: usize },
}
