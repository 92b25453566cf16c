//! Bounded concurrency for remote requests.
//!
//! At most `limit` scheduled tasks run at once; the rest wait in submission order
//! on a fair semaphore. Queued and running counts can be read at any time for
//! progress reporting.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;

/// Default ceiling on simultaneously outstanding analysis requests.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 20;

#[derive(Debug, Default)]
struct Counters {
    pending: AtomicUsize,
    active: AtomicUsize,
}

/// Point-in-time view of a limiter's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterSnapshot {
    pub pending: usize,
    pub active: usize,
}

impl LimiterSnapshot {
    /// Tasks out of `total` that have settled.
    pub fn completed(&self, total: usize) -> usize {
        total.saturating_sub(self.pending + self.active)
    }
}

/// Caps the number of concurrently executing futures.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    counters: Arc<Counters>,
    limit: usize,
}

impl ConcurrencyLimiter {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            counters: Arc::new(Counters::default()),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn pending_count(&self) -> usize {
        self.counters.pending.load(Ordering::SeqCst)
    }

    pub fn active_count(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> LimiterSnapshot {
        LimiterSnapshot {
            pending: self.pending_count(),
            active: self.active_count(),
        }
    }

    /// Queue `task` behind the limiter.
    ///
    /// The task counts as pending from this call on, so progress computed right
    /// after submission is accurate even before the returned future is polled.
    /// Whatever the task returns (errors included) is handed back unchanged; it
    /// never affects other queued tasks.
    pub fn schedule<F>(&self, task: F) -> impl Future<Output = F::Output> + Send + 'static
    where
        F: Future + Send + 'static,
        F::Output: Send,
    {
        let semaphore = Arc::clone(&self.semaphore);
        let queued = QueuedGuard::new(Arc::clone(&self.counters));
        async move {
            // The semaphore is never closed, so acquisition only fails on shutdown.
            let _permit = semaphore.acquire_owned().await.ok();
            let _running = queued.start();
            task.await
        }
    }
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT_REQUESTS)
    }
}

/// Holds a pending slot until the task starts or is dropped unstarted.
struct QueuedGuard {
    counters: Arc<Counters>,
}

impl QueuedGuard {
    fn new(counters: Arc<Counters>) -> Self {
        counters.pending.fetch_add(1, Ordering::SeqCst);
        Self { counters }
    }

    fn start(self) -> RunningGuard {
        self.counters.active.fetch_add(1, Ordering::SeqCst);
        let counters = Arc::clone(&self.counters);
        drop(self);
        RunningGuard { counters }
    }
}

impl Drop for QueuedGuard {
    fn drop(&mut self) {
        self.counters.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Holds an active slot until the task finishes or is cancelled.
struct RunningGuard {
    counters: Arc<Counters>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
    }
}
