//! Service layer: tessellation, remote scoring, and run orchestration.
//!
//! The pipeline in [`aggregation`] ties the other services together. It talks to
//! the outside world only through the [`tessellation::BoundarySource`] and
//! [`fetcher::SummaryFetcher`] traits, so tests substitute both.

pub mod aggregation;
pub mod colors;
pub mod fetcher;
pub mod limiter;
pub mod progress;
pub mod run_tracker;
pub mod tessellation;

pub use aggregation::{finalize_zones, PipelineSettings, ZonePipeline, ZoneRunRequest};
pub use colors::{color_for, legend, zone_score_color};
pub use fetcher::{score_zone, FetchError, HttpSummaryFetcher, SummaryFetcher, ZoneQuery};
pub use limiter::ConcurrencyLimiter;
pub use progress::{NoProgress, Progress, ProgressSink};
pub use run_tracker::{RunTracker, ZoneRun};
pub use tessellation::{tessellate, BoundarySource, FsBoundarySource, TessellationOptions};
