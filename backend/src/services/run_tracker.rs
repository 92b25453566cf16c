//! In-memory registry of zone runs.
//!
//! Every started run gets a generation number. Starting a run supersedes all
//! older runs still in flight: they keep running to completion, but only the
//! newest generation's result becomes [`RunTracker::current`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use super::progress::{Progress, ProgressSink};
use crate::models::{RequestState, Resource, ZoneCollection};

/// Settled runs beyond this many are evicted, oldest first.
pub const MAX_RETAINED_RUNS: usize = 64;

/// One run and its lifecycle state.
#[derive(Debug, Clone)]
pub struct ZoneRun {
    pub run_id: String,
    pub area_id: String,
    pub resource: Resource,
    pub state: RequestState<Arc<ZoneCollection>>,
    pub progress: Progress,
    pub generation: u64,
    /// A newer run was started before this one settled.
    pub superseded: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Registry {
    runs: HashMap<String, ZoneRun>,
    latest_generation: u64,
    current: Option<String>,
}

impl Registry {
    fn evict_settled(&mut self) {
        if self.runs.len() <= MAX_RETAINED_RUNS {
            return;
        }
        let mut settled: Vec<(u64, String)> = self
            .runs
            .values()
            .filter(|r| r.state.is_settled() && Some(&r.run_id) != self.current.as_ref())
            .map(|r| (r.generation, r.run_id.clone()))
            .collect();
        settled.sort();
        let excess = self.runs.len() - MAX_RETAINED_RUNS;
        for (_, run_id) in settled.into_iter().take(excess) {
            self.runs.remove(&run_id);
        }
    }
}

/// Shared handle to the run registry.
#[derive(Clone, Default)]
pub struct RunTracker {
    inner: Arc<RwLock<Registry>>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending run and supersede every older unsettled one.
    pub fn start_run(&self, area_id: impl Into<String>, resource: Resource) -> String {
        let run_id = Uuid::new_v4().to_string();
        let mut registry = self.inner.write();
        registry.latest_generation += 1;
        let generation = registry.latest_generation;

        for run in registry.runs.values_mut() {
            if run.state.is_pending() {
                run.superseded = true;
            }
        }

        registry.runs.insert(
            run_id.clone(),
            ZoneRun {
                run_id: run_id.clone(),
                area_id: area_id.into(),
                resource,
                state: RequestState::Idle.request(),
                progress: Progress::default(),
                generation,
                superseded: false,
                created_at: Utc::now(),
                completed_at: None,
            },
        );
        registry.evict_settled();
        run_id
    }

    pub fn report_progress(&self, run_id: &str, completed: usize, total: usize) {
        if let Some(run) = self.inner.write().runs.get_mut(run_id) {
            run.progress = Progress::new(completed, total);
        }
    }

    /// A [`ProgressSink`] that records into `run_id`.
    pub fn progress_sink(&self, run_id: &str) -> RunProgress {
        RunProgress {
            tracker: self.clone(),
            run_id: run_id.to_string(),
        }
    }

    /// Store the result. It becomes current only if no newer run was started.
    pub fn complete_run(&self, run_id: &str, collection: ZoneCollection) {
        let mut registry = self.inner.write();
        let latest = registry.latest_generation;
        let Some(run) = registry.runs.get_mut(run_id) else {
            return;
        };

        run.state = std::mem::take(&mut run.state).receive(Arc::new(collection));
        run.completed_at = Some(Utc::now());
        let is_newest = run.generation == latest;

        if is_newest {
            registry.current = Some(run_id.to_string());
        } else {
            log::debug!("Run {} finished after being superseded; result not surfaced", run_id);
        }
    }

    pub fn fail_run(&self, run_id: &str, error: impl Into<String>) {
        let mut registry = self.inner.write();
        if let Some(run) = registry.runs.get_mut(run_id) {
            run.state = std::mem::take(&mut run.state).fail(error);
            run.completed_at = Some(Utc::now());
        }
    }

    pub fn get_run(&self, run_id: &str) -> Option<ZoneRun> {
        self.inner.read().runs.get(run_id).cloned()
    }

    /// The newest completed, non-superseded result.
    pub fn current(&self) -> Option<(String, Arc<ZoneCollection>)> {
        let registry = self.inner.read();
        let run_id = registry.current.as_ref()?;
        let collection = registry.runs.get(run_id)?.state.data()?.clone();
        Some((run_id.clone(), collection))
    }

    pub fn len(&self) -> usize {
        self.inner.read().runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Progress sink bound to one run.
#[derive(Clone)]
pub struct RunProgress {
    tracker: RunTracker,
    run_id: String,
}

impl ProgressSink for RunProgress {
    fn report(&self, completed: usize, total: usize) {
        self.tracker.report_progress(&self.run_id, completed, total);
    }
}
