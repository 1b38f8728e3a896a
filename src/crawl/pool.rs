// src/crawl/pool.rs
// =============================================================================
// A bounded worker pool: the scheduler half of the crawler.
//
// How it works:
// 1. submit() pushes a task onto an unbounded queue (never blocks)
// 2. dispatch() starts queued tasks while fewer than `capacity` are running
// 3. Each task's handler returns follow-up tasks; those are queued *before*
//    the finished task gives its slot back
// 4. Giving a slot back re-runs dispatch(), or wakes wait_idle() once
//    nothing is running and nothing is queued (quiescence)
//
// Because children are queued before the parent's slot is released, there is
// never a moment where the pool looks idle while work is still on its way.
//
// Rust concepts:
// - Arc<Mutex<..>>: shared state between the pool handle and running tasks
// - Drop guards: the slot is released even if the handler panics
// - Notify: wakes waiters instead of polling on a timer
// =============================================================================

use crate::error::Result;
use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{trace, warn};

type Handler<T> = Arc<dyn Fn(T) -> BoxFuture<'static, Result<Vec<T>>> + Send + Sync>;

/// Counters describing what the pool has done so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Tasks accepted into the queue (seeds plus children)
    pub submitted: usize,
    /// Handlers that returned Ok
    pub completed: usize,
    /// Handlers that returned Err or panicked
    pub failed: usize,
    /// Highest number of tasks that were running at once
    pub peak_in_flight: usize,
}

struct PoolState<T> {
    queue: VecDeque<T>,
    active: usize,
    closed: bool,
    stats: PoolStats,
}

impl<T> PoolState<T> {
    fn is_idle(&self) -> bool {
        self.active == 0 && self.queue.is_empty()
    }
}

struct Shared<T> {
    capacity: usize,
    handler: Handler<T>,
    runtime: Handle,
    state: Mutex<PoolState<T>>,
    idle: Notify,
}

pub struct WorkerPool<T> {
    shared: Arc<Shared<T>>,
}

impl<T> WorkerPool<T>
where
    T: fmt::Display + Send + 'static,
{
    // Creates a pool that runs at most `capacity` handlers at once
    //
    // Must be called from inside a tokio runtime; tasks are spawned onto it.
    pub fn new<F, Fut>(capacity: usize, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>>> + Send + 'static,
    {
        let handler: Handler<T> = Arc::new(move |task| handler(task).boxed());

        Self {
            shared: Arc::new(Shared {
                capacity: capacity.max(1),
                handler,
                runtime: Handle::current(),
                state: Mutex::new(PoolState {
                    queue: VecDeque::new(),
                    active: 0,
                    closed: false,
                    stats: PoolStats::default(),
                }),
                idle: Notify::new(),
            }),
        }
    }

    /// Queues a task; returns false if the pool has been shut down
    pub fn submit(&self, task: T) -> bool {
        {
            let mut state = self.shared.lock();
            if state.closed {
                return false;
            }
            state.queue.push_back(task);
            state.stats.submitted += 1;
        }
        self.shared.dispatch();
        true
    }

    /// Resolves once no task is running and none is queued
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            // Register before checking, so a wakeup between the check and
            // the await is not lost.
            notified.as_mut().enable();

            if self.shared.lock().is_idle() {
                return;
            }
            notified.await;
        }
    }

    // Stops accepting work and throws away everything still queued
    //
    // Running tasks are left to finish; whatever they return is dropped.
    // Returns how many queued tasks were discarded.
    pub fn shutdown(&self) -> usize {
        let (dropped, idle) = {
            let mut state = self.shared.lock();
            state.closed = true;
            let dropped = state.queue.len();
            state.queue.clear();
            (dropped, state.is_idle())
        };
        if idle {
            self.shared.idle.notify_waiters();
        }
        dropped
    }

    pub fn is_idle(&self) -> bool {
        self.shared.lock().is_idle()
    }

    pub fn in_flight(&self) -> usize {
        self.shared.lock().active
    }

    pub fn stats(&self) -> PoolStats {
        self.shared.lock().stats
    }
}

impl<T> Shared<T>
where
    T: fmt::Display + Send + 'static,
{
    // A panicking handler poisons nothing we care about: counters and the
    // queue are always left consistent between statements.
    fn lock(&self) -> MutexGuard<'_, PoolState<T>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn dispatch(self: &Arc<Self>) {
        let mut started = Vec::new();
        {
            let mut state = self.lock();
            while state.active < self.capacity {
                let Some(task) = state.queue.pop_front() else {
                    break;
                };
                state.active += 1;
                state.stats.peak_in_flight = state.stats.peak_in_flight.max(state.active);
                started.push(task);
            }
        }

        for task in started {
            self.start(task);
        }
    }

    fn start(self: &Arc<Self>, task: T) {
        let mut slot = Slot {
            shared: Arc::clone(self),
            finished: false,
        };
        let handler = Arc::clone(&self.handler);

        self.runtime.spawn(async move {
            let label = task.to_string();
            trace!(task = %label, "task started");

            match handler(task).await {
                Ok(children) => slot.finish(children, true),
                Err(e) => {
                    warn!(task = %label, error = %e, "task failed");
                    slot.finish(Vec::new(), false);
                }
            }
        });
    }

    // Records the outcome and queues children; the slot is still held here
    fn record(&self, children: Vec<T>, succeeded: bool) {
        let mut state = self.lock();
        if succeeded {
            state.stats.completed += 1;
        } else {
            state.stats.failed += 1;
        }
        if !state.closed {
            state.stats.submitted += children.len();
            state.queue.extend(children);
        }
    }

    fn release(self: &Arc<Self>, abandoned: bool) {
        let idle = {
            let mut state = self.lock();
            state.active -= 1;
            if abandoned {
                state.stats.failed += 1;
            }
            state.is_idle()
        };

        if idle {
            self.idle.notify_waiters();
        } else {
            self.dispatch();
        }
    }
}

// Holds one unit of pool capacity for a running task
//
// If the task future is dropped without finishing (the handler panicked, or
// the runtime is going away) the slot is still released, and the task is
// counted as failed.
struct Slot<T>
where
    T: fmt::Display + Send + 'static,
{
    shared: Arc<Shared<T>>,
    finished: bool,
}

impl<T> Slot<T>
where
    T: fmt::Display + Send + 'static,
{
    fn finish(&mut self, children: Vec<T>, succeeded: bool) {
        self.shared.record(children, succeeded);
        self.finished = true;
    }
}

impl<T> Drop for Slot<T>
where
    T: fmt::Display + Send + 'static,
{
    fn drop(&mut self) {
        if !self.finished {
            warn!("task did not finish, reclaiming its slot");
        }
        self.shared.release(!self.finished);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrawlError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // Tracks how many handlers run at once
    #[derive(Default)]
    struct Gauge {
        current: AtomicUsize,
        max: AtomicUsize,
        total: AtomicUsize,
    }

    impl Gauge {
        fn enter(&self) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max.fetch_max(now, Ordering::SeqCst);
            self.total.fetch_add(1, Ordering::SeqCst);
        }

        fn exit(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn sleepy_pool(capacity: usize, gauge: Arc<Gauge>, delay: Duration) -> WorkerPool<u32> {
        WorkerPool::new(capacity, move |_task: u32| {
            let gauge = Arc::clone(&gauge);
            async move {
                gauge.enter();
                tokio::time::sleep(delay).await;
                gauge.exit();
                Ok::<_, CrawlError>(Vec::new())
            }
        })
    }

    #[tokio::test]
    async fn test_concurrency_ceiling() {
        for capacity in [1, 3, 5] {
            let gauge = Arc::new(Gauge::default());
            let pool = sleepy_pool(capacity, Arc::clone(&gauge), Duration::from_millis(20));

            for n in 0..12 {
                assert!(pool.submit(n));
            }
            pool.wait_idle().await;

            assert_eq!(gauge.total.load(Ordering::SeqCst), 12);
            assert_eq!(gauge.max.load(Ordering::SeqCst), capacity);
            assert_eq!(pool.stats().peak_in_flight, capacity);
            assert_eq!(pool.in_flight(), 0);
            assert!(pool.is_idle());
        }
    }

    #[tokio::test]
    async fn test_children_are_run_before_idle() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);

        // Binary tree 0..=14: every node spawns two children until 14
        let pool = WorkerPool::new(3, move |n: u32| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                let children: Vec<u32> = [n * 2 + 1, n * 2 + 2]
                    .into_iter()
                    .filter(|child| *child <= 14)
                    .collect();
                Ok::<_, CrawlError>(children)
            }
        });

        pool.submit(0);
        pool.wait_idle().await;

        assert_eq!(seen.load(Ordering::SeqCst), 15);
        let stats = pool.stats();
        assert_eq!(stats.submitted, 15);
        assert_eq!(stats.completed, 15);
        assert_eq!(stats.failed, 0);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_pool() {
        let pool = WorkerPool::new(2, |n: u32| async move {
            if n % 2 == 1 {
                Err(CrawlError::Fetch {
                    url: format!("task-{}", n),
                    message: "boom".to_string(),
                })
            } else {
                Ok(Vec::<u32>::new())
            }
        });

        for n in 0..10 {
            pool.submit(n);
        }
        pool.wait_idle().await;

        let stats = pool.stats();
        assert_eq!(stats.completed, 5);
        assert_eq!(stats.failed, 5);
        assert!(pool.is_idle());
    }

    #[tokio::test]
    async fn test_panicking_task_releases_its_slot() {
        let pool = WorkerPool::new(1, |n: u32| async move {
            if n == 1 {
                panic!("handler blew up");
            }
            Ok::<_, CrawlError>(Vec::new())
        });

        for n in 0..4 {
            pool.submit(n);
        }
        pool.wait_idle().await;

        let stats = pool.stats();
        assert_eq!(stats.completed, 3);
        assert_eq!(stats.failed, 1);
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_discards_pending() {
        let gauge = Arc::new(Gauge::default());
        let pool = sleepy_pool(1, Arc::clone(&gauge), Duration::from_millis(50));

        for n in 0..5 {
            pool.submit(n);
        }
        // Let the first task start
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(pool.shutdown(), 4);
        assert!(!pool.submit(99));
        pool.wait_idle().await;

        assert_eq!(gauge.total.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wait_idle_on_empty_pool() {
        let gauge = Arc::new(Gauge::default());
        let pool = sleepy_pool(2, gauge, Duration::from_millis(1));
        pool.wait_idle().await;
        assert_eq!(pool.stats(), PoolStats::default());
    }
}
