//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        .route("/areas", get(handlers::list_areas))
        .route("/legend", get(handlers::get_legend))
        .route("/zones", post(handlers::generate_zones))
        .route("/zones/current", get(handlers::get_current_zones))
        .route("/zones/runs", post(handlers::start_zone_run))
        .route("/zones/runs/{run_id}", get(handlers::get_zone_run))
        .route("/zones/runs/{run_id}/progress", get(handlers::stream_run_progress));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        // Inline area boundaries and filter lists stay well below this.
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
