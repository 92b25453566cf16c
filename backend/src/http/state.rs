//! Application state for the HTTP server.

use std::sync::Arc;

use crate::models::AreaCatalog;
use crate::services::{RunTracker, ZonePipeline};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<AreaCatalog>,
    pub pipeline: Arc<ZonePipeline>,
    /// Background runs started through `/v1/zones/runs`
    pub runs: RunTracker,
}

impl AppState {
    pub fn new(catalog: AreaCatalog, pipeline: ZonePipeline) -> Self {
        Self {
            catalog: Arc::new(catalog),
            pipeline: Arc::new(pipeline),
            runs: RunTracker::new(),
        }
    }
}
