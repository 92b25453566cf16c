#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use rezoning_zones::error::ZoneResult;
use rezoning_zones::geometry::topology::Topology;
use rezoning_zones::models::{AreaOfInterest, AreaType, Bounds, ZoneId, ZonePolygon, ZoneSummary, ZoneType};
use rezoning_zones::services::{
    BoundarySource, FetchError, PipelineSettings, SummaryFetcher, ZonePipeline, ZoneQuery,
};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// This is panic-safe (restores variables on unwind) and also serializes access to
/// process-global env vars to avoid flaky tests when Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

// =============================================================================
// Stub collaborators
// =============================================================================

/// Summary fetcher with scripted scores and failures, keyed by integer zone id.
///
/// Successful summaries carry `lcoe = -5` so clamping can be observed.
pub struct StubFetcher {
    scores: HashMap<u64, f64>,
    failing: HashSet<u64>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self {
            scores: HashMap::new(),
            failing: HashSet::new(),
            delay: Duration::from_millis(1),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn score(mut self, id: u64, score: f64) -> Self {
        self.scores.insert(id, score);
        self
    }

    pub fn fail(mut self, id: u64) -> Self {
        self.failing.insert(id);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SummaryFetcher for StubFetcher {
    async fn fetch_summary(
        &self,
        zone: &ZonePolygon,
        _query: &ZoneQuery,
    ) -> Result<ZoneSummary, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let id = match zone.id {
            ZoneId::Index(id) => id,
            ZoneId::Code(_) => return Err(FetchError::Malformed("unexpected string id".into())),
        };
        if self.failing.contains(&id) {
            return Err(FetchError::Status {
                status: 500,
                body: "internal error".into(),
            });
        }
        Ok(ZoneSummary {
            lcoe: -5.0,
            zone_score: Some(self.scores.get(&id).copied().unwrap_or(1.0)),
            generation_potential: 120.0,
            cf: 0.3,
            ..Default::default()
        })
    }
}

/// Serves one fixed topology for every area.
pub struct StaticBoundaries {
    raw: String,
}

impl StaticBoundaries {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

#[async_trait]
impl BoundarySource for StaticBoundaries {
    async fn load_topology(&self, _area: &AreaOfInterest, _zone_type: ZoneType) -> ZoneResult<Topology> {
        Ok(Topology::from_json(&self.raw)?)
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// `count` adjacent unit squares under `object`, with ids `0..count`.
pub fn unit_squares_topology(object: &str, count: usize) -> String {
    let arcs: Vec<serde_json::Value> = (0..count)
        .map(|i| {
            let x = i as f64;
            serde_json::json!([[x, 0.0], [x + 1.0, 0.0], [x + 1.0, 1.0], [x, 1.0], [x, 0.0]])
        })
        .collect();
    let geometries: Vec<serde_json::Value> = (0..count)
        .map(|i| {
            serde_json::json!({
                "type": "Polygon",
                "arcs": [[i]],
                "properties": {"id": i, "name": format!("Unit {}", i)}
            })
        })
        .collect();

    let mut objects = serde_json::Map::new();
    objects.insert(
        object.to_string(),
        serde_json::json!({"type": "GeometryCollection", "geometries": geometries}),
    );
    serde_json::json!({"type": "Topology", "arcs": arcs, "objects": objects}).to_string()
}

pub fn country(id: &str, bounds: Bounds) -> AreaOfInterest {
    AreaOfInterest::new(id, AreaType::Country, bounds)
}

/// Fast-reporting pipeline settings for tests.
pub fn test_settings() -> PipelineSettings {
    PipelineSettings {
        progress_interval: Duration::from_millis(5),
        ..Default::default()
    }
}

pub fn pipeline(boundaries: StaticBoundaries, fetcher: Arc<StubFetcher>) -> ZonePipeline {
    ZonePipeline::new(Arc::new(boundaries), fetcher, test_settings())
}

/// Progress sink that records every report.
#[derive(Clone, Default)]
pub struct RecordingProgress {
    reports: Arc<Mutex<Vec<(usize, usize)>>>,
}

impl RecordingProgress {
    pub fn reports(&self) -> Vec<(usize, usize)> {
        self.reports.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl rezoning_zones::services::ProgressSink for RecordingProgress {
    fn report(&self, completed: usize, total: usize) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push((completed, total));
        }
    }
}
