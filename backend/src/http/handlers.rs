//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! service layer for business logic.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;

use super::dto::{
    AreaDto, AreaListResponse, HealthResponse, LegendResponse, RunStatusResponse,
    StartRunResponse, ZoneCollectionResponse, ZoneRunRequestDto,
};
use super::error::AppError;
use super::state::AppState;
use crate::services::colors::{legend, POWER_SCALING_FACTOR};
use crate::services::NoProgress;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// Poll period of the progress stream.
const PROGRESS_POLL_INTERVAL: Duration = Duration::from_millis(100);

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        areas: state.catalog.len(),
    }))
}

// =============================================================================
// Catalog and legend
// =============================================================================

/// GET /v1/areas
pub async fn list_areas(State(state): State<AppState>) -> HandlerResult<AreaListResponse> {
    let areas: Vec<AreaDto> = state.catalog.areas().iter().map(AreaDto::from).collect();
    let total = areas.len();
    Ok(Json(AreaListResponse { areas, total }))
}

/// GET /v1/legend
pub async fn get_legend() -> HandlerResult<LegendResponse> {
    Ok(Json(LegendResponse {
        colors: legend(),
        power: POWER_SCALING_FACTOR,
    }))
}

// =============================================================================
// Zone runs
// =============================================================================

/// POST /v1/zones
///
/// Run the pipeline and answer with the finished collection.
pub async fn generate_zones(
    State(state): State<AppState>,
    Json(body): Json<ZoneRunRequestDto>,
) -> HandlerResult<ZoneCollectionResponse> {
    let request = body.into_request(&state.catalog)?;
    let collection = state.pipeline.run(&request, &NoProgress).await?;
    Ok(Json(ZoneCollectionResponse::from(&collection)))
}

/// POST /v1/zones/runs
///
/// Start a run in the background. Poll `/v1/zones/runs/{run_id}` or stream
/// `/v1/zones/runs/{run_id}/progress` to follow it.
pub async fn start_zone_run(
    State(state): State<AppState>,
    Json(body): Json<ZoneRunRequestDto>,
) -> Result<(StatusCode, Json<StartRunResponse>), AppError> {
    let request = body.into_request(&state.catalog)?;
    let run_id = state.runs.start_run(&request.area.id, request.resource);

    let runs = state.runs.clone();
    let pipeline = state.pipeline.clone();
    let task_run_id = run_id.clone();
    tokio::spawn(async move {
        let sink = runs.progress_sink(&task_run_id);
        match pipeline.run(&request, &sink).await {
            Ok(collection) => runs.complete_run(&task_run_id, collection),
            Err(e) => {
                log::warn!("Zone run {} failed: {}", task_run_id, e);
                runs.fail_run(&task_run_id, e.to_string());
            }
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(StartRunResponse {
            run_id,
            message: "Zone run started".to_string(),
        }),
    ))
}

/// GET /v1/zones/runs/{run_id}
pub async fn get_zone_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> HandlerResult<RunStatusResponse> {
    let run = state
        .runs
        .get_run(&run_id)
        .ok_or_else(|| AppError::NotFound(format!("Run {} not found", run_id)))?;
    Ok(Json(RunStatusResponse::from(&run)))
}

/// GET /v1/zones/current
///
/// The newest run's result, unless a newer run has been started since.
pub async fn get_current_zones(State(state): State<AppState>) -> HandlerResult<ZoneCollectionResponse> {
    let (_, collection) = state
        .runs
        .current()
        .ok_or_else(|| AppError::NotFound("No completed zone run".to_string()))?;
    Ok(Json(ZoneCollectionResponse::from(collection.as_ref())))
}

/// GET /v1/zones/runs/{run_id}/progress
///
/// Server-Sent Events with `{completed, total}` on every change, then a final
/// `complete` event carrying the run status.
pub async fn stream_run_progress(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if state.runs.get_run(&run_id).is_none() {
        return Err(AppError::NotFound(format!("Run {} not found", run_id)));
    }

    let tracker = state.runs.clone();
    let stream = async_stream::stream! {
        let mut last_progress = None;
        loop {
            let run = match tracker.get_run(&run_id) {
                Some(run) => run,
                None => break,
            };

            if last_progress != Some(run.progress) {
                last_progress = Some(run.progress);
                let data = serde_json::to_string(&run.progress).unwrap_or_default();
                yield Ok(Event::default().event("progress").data(data));
            }

            if run.state.is_settled() {
                let final_event = serde_json::json!({
                    "status": run.state.label(),
                    "error": run.state.error(),
                    "superseded": run.superseded,
                });
                yield Ok(Event::default()
                    .event("complete")
                    .data(serde_json::to_string(&final_event).unwrap_or_default()));
                break;
            }

            tokio::time::sleep(PROGRESS_POLL_INTERVAL).await;
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(1))
            .text("keep-alive"),
    ))
}
