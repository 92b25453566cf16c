//! HTTP server module for the zones backend.
//!
//! Exposes the area catalog, the color legend, and zone runs as a REST API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP Layer (axum handlers)                               │
//! │  - Request parsing and validation                         │
//! │  - JSON / GeoJSON serialization                           │
//! │  - CORS, compression, error handling                      │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Service Layer (services/)                                │
//! │  - ZonePipeline: tessellate, fetch, score                 │
//! │  - RunTracker: background runs and progress               │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Datasets and remote analysis API                         │
//! │  - TopoJSON boundaries, areas.json                        │
//! │  - POST {api}/zone/{area}/{resource}                      │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;
