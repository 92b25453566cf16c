//! Progress reporting for long-running zone runs.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use super::limiter::ConcurrencyLimiter;

/// Receives `(completed, total)` counts while a run is in flight.
///
/// `report(0, 0)` means the run has settled and progress should reset.
pub trait ProgressSink: Send + Sync {
    fn report(&self, completed: usize, total: usize);
}

impl<F> ProgressSink for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn report(&self, completed: usize, total: usize) {
        self(completed, total)
    }
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _completed: usize, _total: usize) {}
}

/// A progress update as exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(completed: usize, total: usize) -> Self {
        Self { completed, total }
    }

    /// Completion in percent, 0 when nothing is being tracked.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 * 100.0 / self.total as f64
        }
    }
}

/// Await `work`, reporting limiter progress to `sink` every `interval`.
///
/// Reports `(total, total)` once `work` settles, then `(0, 0)` to clear.
pub async fn drive_with_progress<F>(
    work: F,
    limiter: &ConcurrencyLimiter,
    total: usize,
    interval: Duration,
    sink: &dyn ProgressSink,
) -> F::Output
where
    F: Future,
{
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(work);

    let output = loop {
        tokio::select! {
            output = &mut work => break output,
            _ = ticker.tick() => sink.report(limiter.snapshot().completed(total), total),
        }
    };

    sink.report(total, total);
    sink.report(0, 0);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_percent() {
        assert_eq!(Progress::new(0, 0).percent(), 0.0);
        assert_eq!(Progress::new(5, 20).percent(), 25.0);
    }

    #[tokio::test]
    async fn test_reports_converge_then_reset() {
        let limiter = ConcurrencyLimiter::new(2);
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let reports = Arc::clone(&reports);
            move |completed: usize, total: usize| reports.lock().push((completed, total))
        };

        let tasks: Vec<_> = (0..6)
            .map(|_| limiter.schedule(tokio::time::sleep(Duration::from_millis(20))))
            .collect();
        drive_with_progress(
            futures::future::join_all(tasks),
            &limiter,
            6,
            Duration::from_millis(5),
            &sink,
        )
        .await;

        let reports = reports.lock();
        assert!(reports.len() >= 3);
        assert_eq!(reports[reports.len() - 2], (6, 6));
        assert_eq!(reports[reports.len() - 1], (0, 0));
        let counts: Vec<usize> = reports[..reports.len() - 1].iter().map(|r| r.0).collect();
        assert!(counts.windows(2).all(|w| w[0] <= w[1]), "{:?}", counts);
        assert!(reports[..reports.len() - 1].iter().all(|r| r.1 == 6));
    }

    #[tokio::test]
    async fn test_no_progress_sink() {
        let limiter = ConcurrencyLimiter::default();
        let value = drive_with_progress(async { 3 }, &limiter, 0, Duration::from_millis(10), &NoProgress).await;
        assert_eq!(value, 3);
    }
}
