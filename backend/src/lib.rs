//! # Rezoning Zones Backend
//!
//! Zone generation and aggregation for renewable-energy site planning.
//!
//! An area of interest is partitioned into zones (a regular grid or its
//! administrative sub-units), every zone is scored by a remote analysis API,
//! and the scored zones are normalized and colored for display.
//!
//! ## Features
//!
//! - **Tessellation**: grids clipped to land and maritime boundaries, or TopoJSON boundary datasets
//! - **Bounded fan-out**: at most 20 outstanding analysis requests, with live progress
//! - **Fault isolation**: a failing zone request never fails the run
//! - **Scoring**: score rescaling and a perceptual color ramp with a matching legend
//! - **HTTP API**: axum endpoints for areas, synchronous runs, and tracked background runs
//!
//! ## Architecture
//!
//! - [`config`]: `zones.toml` and environment configuration
//! - [`error`]: run-level error taxonomy
//! - [`models`]: areas, zones, filters, and request state
//! - [`geometry`]: grid construction and TopoJSON decoding
//! - [`services`]: tessellation, fetching, aggregation, and run tracking
//! - [`http`]: Axum-based HTTP server and request handlers
//!

pub mod config;
pub mod error;
pub mod geometry;
pub mod models;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;

pub use config::ZonesConfig;
pub use error::{ErrorContext, ZoneError, ZoneResult};
pub use services::{ZonePipeline, ZoneRunRequest};
