//! Per-zone summary requests against the remote analysis API.
//!
//! [`SummaryFetcher`] is the transport seam; [`score_zone`] is the failure
//! boundary. Whatever goes wrong for one zone is logged and turned into an
//! invalid, zero-filled [`ScoredZone`] so the run can continue.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::models::{Resource, ScoredZone, ZonePolygon, ZoneSummary};
use crate::services::colors::DEFAULT_ZONE_COLOR;

/// Everything besides the geometry that a zone request carries.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneQuery {
    pub area_id: String,
    pub resource: Resource,
    /// Encoded filters, sent as the URL query string.
    pub filter_query: String,
    pub weights: BTreeMap<String, f64>,
    pub lcoe: BTreeMap<String, f64>,
}

impl ZoneQuery {
    /// `/{area}/{resource}` suffix of the zone endpoint.
    pub fn resource_path(&self) -> String {
        format!("/{}/{}", self.area_id, self.resource.api_name())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("analysis API returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed summary: {0}")]
    Malformed(String),
}

/// Fetches one zone summary.
#[async_trait]
pub trait SummaryFetcher: Send + Sync {
    async fn fetch_summary(
        &self,
        zone: &ZonePolygon,
        query: &ZoneQuery,
    ) -> Result<ZoneSummary, FetchError>;
}

#[derive(Serialize)]
struct ZoneRequestBody<'a> {
    aoi: geojson::Geometry,
    weights: &'a BTreeMap<String, f64>,
    lcoe: &'a BTreeMap<String, f64>,
}

/// [`SummaryFetcher`] over HTTP: `POST {endpoint}/zone/{area}/{resource}?{filters}`.
#[derive(Debug, Clone)]
pub struct HttpSummaryFetcher {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSummaryFetcher {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn zone_url(&self, query: &ZoneQuery) -> String {
        format!(
            "{}/zone{}?{}",
            self.endpoint,
            query.resource_path(),
            query.filter_query
        )
    }
}

#[async_trait]
impl SummaryFetcher for HttpSummaryFetcher {
    async fn fetch_summary(
        &self,
        zone: &ZonePolygon,
        query: &ZoneQuery,
    ) -> Result<ZoneSummary, FetchError> {
        let body = ZoneRequestBody {
            aoi: zone.geometry.to_geojson(),
            weights: &query.weights,
            lcoe: &query.lcoe,
        };

        let response = self
            .client
            .post(self.zone_url(query))
            .json(&body)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).chars().take(200).collect(),
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

/// Request the summary for `zone`, absorbing any failure.
///
/// Successful summaries are clamped to non-negative values and marked valid.
/// Failures yield [`ZoneSummary::zeroed`] with `is_valid_summary = false`.
pub async fn score_zone(
    fetcher: &dyn SummaryFetcher,
    zone: ZonePolygon,
    query: &ZoneQuery,
) -> ScoredZone {
    let (summary, is_valid_summary) = match fetcher.fetch_summary(&zone, query).await {
        Ok(mut summary) => {
            summary.clamp_non_negative();
            (summary, true)
        }
        Err(e) => {
            log::warn!("Error fetching zone {} analysis: {}", zone.id, e);
            (ZoneSummary::zeroed(), false)
        }
    };

    ScoredZone {
        zone,
        summary,
        color: DEFAULT_ZONE_COLOR.to_string(),
        is_valid_summary,
    }
}
