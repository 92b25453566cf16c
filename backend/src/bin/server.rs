//! Zones HTTP Server Binary
//!
//! Loads the configuration and the area catalog, builds the zone pipeline, and
//! serves the REST API.
//!
//! # Usage
//!
//! ```bash
//! REZONING_API_URL=https://api.example.org/api/v1 \
//!   cargo run --bin zones-server
//! ```
//!
//! # Environment Variables
//!
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8080)
//! - `REZONING_API_URL`: analysis API base URL
//! - `REZONING_DATASETS`: dataset directory (default: public/zones)
//! - `REZONING_MAX_CONCURRENCY`: outstanding analysis requests per run (default: 20)
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::net::SocketAddr;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rezoning_zones::http::{create_router, AppState};
use rezoning_zones::models::AreaCatalog;
use rezoning_zones::{ZonePipeline, ZonesConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting zones HTTP server");

    let config = ZonesConfig::load()?;
    info!("Analysis API: {}", config.api.endpoint);

    let catalog = AreaCatalog::load(&config.datasets.root)?;
    info!(
        "Area catalog loaded from {} ({} areas)",
        config.datasets.root.display(),
        catalog.len()
    );

    let pipeline = ZonePipeline::from_config(&config)?;
    let state = AppState::new(catalog, pipeline);
    let app = create_router(state);

    let addr: SocketAddr = config.bind_address().parse()?;
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
