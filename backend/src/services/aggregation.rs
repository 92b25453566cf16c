//! The zone aggregation pipeline.
//!
//! One run goes through these steps:
//!
//! 1. tessellate the area into zones,
//! 2. request a summary for every zone through a bounded limiter, reporting progress,
//! 3. drop zones whose request failed,
//! 4. rescale positive scores by the run's maximum and color every zone.
//!
//! Only tessellation can fail a run. Per-zone failures are absorbed by
//! [`score_zone`] and only show up in [`ZoneCollection::invalid_zone_ids`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use super::colors::{color_for, DEFAULT_ZONE_COLOR};
use super::fetcher::{score_zone, HttpSummaryFetcher, SummaryFetcher, ZoneQuery};
use super::limiter::{ConcurrencyLimiter, DEFAULT_MAX_CONCURRENT_REQUESTS};
use super::progress::{drive_with_progress, ProgressSink};
use super::tessellation::{tessellate, BoundarySource, FsBoundarySource, TessellationOptions};
use crate::config::ZonesConfig;
use crate::error::{ZoneError, ZoneResult};
use crate::models::{
    filter_query_string, AreaOfInterest, FilterSetting, Resource, ScoredZone, ZoneCollection, ZoneType,
};

/// Default cadence of progress reports while requests are outstanding.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(50);

/// Everything a single run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRunRequest {
    pub area: AreaOfInterest,
    pub resource: Resource,
    pub zone_type: ZoneType,
    pub filters: Vec<FilterSetting>,
    pub weights: BTreeMap<String, f64>,
    pub lcoe: BTreeMap<String, f64>,
}

impl ZoneRunRequest {
    pub fn new(area: AreaOfInterest, resource: Resource, zone_type: ZoneType) -> Self {
        Self {
            area,
            resource,
            zone_type,
            filters: Vec::new(),
            weights: BTreeMap::new(),
            lcoe: BTreeMap::new(),
        }
    }

    pub fn query(&self) -> ZoneQuery {
        ZoneQuery {
            area_id: self.area.id.clone(),
            resource: self.resource,
            filter_query: filter_query_string(&self.filters, self.resource),
            weights: self.weights.clone(),
            lcoe: self.lcoe.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub max_concurrent_requests: usize,
    pub progress_interval: Duration,
    pub tessellation: TessellationOptions,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            tessellation: TessellationOptions::default(),
        }
    }
}

/// Runs tessellation, fan-out and scoring against pluggable collaborators.
#[derive(Clone)]
pub struct ZonePipeline {
    boundaries: Arc<dyn BoundarySource>,
    fetcher: Arc<dyn SummaryFetcher>,
    settings: PipelineSettings,
}

impl ZonePipeline {
    pub fn new(
        boundaries: Arc<dyn BoundarySource>,
        fetcher: Arc<dyn SummaryFetcher>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            boundaries,
            fetcher,
            settings,
        }
    }

    /// Pipeline backed by the filesystem datasets and the HTTP analysis API.
    pub fn from_config(config: &ZonesConfig) -> ZoneResult<Self> {
        let fetcher = HttpSummaryFetcher::new(config.api.endpoint.clone(), config.request_timeout())
            .map_err(|e| ZoneError::configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::new(
            Arc::new(FsBoundarySource::new(config.datasets.root.clone())),
            Arc::new(fetcher),
            config.pipeline_settings(),
        ))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Execute one run.
    ///
    /// Each run gets its own limiter so progress counts only its own requests.
    pub async fn run(&self, request: &ZoneRunRequest, progress: &dyn ProgressSink) -> ZoneResult<ZoneCollection> {
        log::info!(
            "Starting zone run for {} ({}, {})",
            request.area.id,
            request.resource,
            request.zone_type
        );

        let zones = tessellate(
            self.boundaries.as_ref(),
            &request.area,
            request.zone_type,
            request.resource,
            &self.settings.tessellation,
        )
        .await?;

        let total = zones.len();
        let limiter = ConcurrencyLimiter::new(self.settings.max_concurrent_requests);
        let query = Arc::new(request.query());

        let tasks: Vec<_> = zones
            .into_iter()
            .map(|zone| {
                let fetcher = Arc::clone(&self.fetcher);
                let query = Arc::clone(&query);
                limiter.schedule(async move { score_zone(fetcher.as_ref(), zone, &query).await })
            })
            .collect();

        let scored = drive_with_progress(
            join_all(tasks),
            &limiter,
            total,
            self.settings.progress_interval,
            progress,
        )
        .await;

        let collection = finalize_zones(scored, request.weights.clone(), request.lcoe.clone());
        log::info!(
            "Zone run for {} finished: {} of {} zones valid",
            request.area.id,
            collection.len(),
            collection.tessellated_count
        );
        Ok(collection)
    }
}

/// Filter, rescale and color the settled zones of one run.
///
/// Scores are rescaled to `score / max` only when positive; zones without a
/// score keep [`DEFAULT_ZONE_COLOR`]. Tessellation order is preserved.
pub fn finalize_zones(
    scored: Vec<ScoredZone>,
    weights: BTreeMap<String, f64>,
    lcoe: BTreeMap<String, f64>,
) -> ZoneCollection {
    let tessellated_count = scored.len();
    let (valid, invalid): (Vec<_>, Vec<_>) = scored.into_iter().partition(|z| z.is_valid_summary);

    let scores = valid.iter().filter_map(|z| z.summary.zone_score);
    let (min_score, max_score) = scores.fold((None, None), |(min, max): (Option<f64>, Option<f64>), s| {
        (
            Some(min.map_or(s, |m| m.min(s))),
            Some(max.map_or(s, |m| m.max(s))),
        )
    });

    let zones = valid
        .into_iter()
        .map(|mut zone| {
            match zone.summary.zone_score {
                Some(score) => {
                    if score > 0.0 {
                        if let Some(max) = max_score.filter(|m| *m > 0.0) {
                            zone.summary.zone_score = Some(score / max);
                        }
                    }
                    zone.color = color_for(zone.summary.zone_score.unwrap_or(score));
                }
                None => zone.color = DEFAULT_ZONE_COLOR.to_string(),
            }
            zone
        })
        .collect();

    ZoneCollection {
        zones,
        tessellated_count,
        invalid_zone_ids: invalid.into_iter().map(|z| z.zone.id).collect(),
        min_score,
        max_score,
        weights,
        lcoe,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AreaType, Bounds, ZoneGeometry, ZoneId, ZonePolygon, ZoneSummary};
    use geo::polygon;

    fn scored(id: u64, score: Option<f64>, valid: bool) -> ScoredZone {
        ScoredZone {
            zone: ZonePolygon::new(
                id,
                ZoneGeometry::Polygon(polygon![
                    (x: 0.0, y: 0.0),
                    (x: 1.0, y: 0.0),
                    (x: 1.0, y: 1.0),
                    (x: 0.0, y: 0.0),
                ]),
            ),
            summary: ZoneSummary {
                zone_score: score,
                ..Default::default()
            },
            color: DEFAULT_ZONE_COLOR.to_string(),
            is_valid_summary: valid,
        }
    }

    #[test]
    fn test_rescales_positive_scores_by_max() {
        let collection = finalize_zones(
            vec![
                scored(0, Some(20.0), true),
                scored(1, Some(10.0), true),
                scored(2, Some(0.0), false),
                scored(3, Some(40.0), true),
            ],
            BTreeMap::new(),
            BTreeMap::new(),
        );

        let scores: Vec<_> = collection.zones.iter().map(|z| z.summary.zone_score).collect();
        assert_eq!(scores, vec![Some(0.5), Some(0.25), Some(1.0)]);
        assert_eq!(collection.max_score, Some(40.0));
        assert_eq!(collection.min_score, Some(10.0));
        assert_eq!(collection.invalid_zone_ids, vec![ZoneId::Index(2)]);
        assert_eq!(collection.tessellated_count, 4);
        assert_eq!(collection.zones[2].color, color_for(1.0));
    }

    #[test]
    fn test_zero_and_missing_scores_are_untouched() {
        let collection = finalize_zones(
            vec![scored(0, Some(0.0), true), scored(1, None, true), scored(2, Some(8.0), true)],
            BTreeMap::new(),
            BTreeMap::new(),
        );

        assert_eq!(collection.zones[0].summary.zone_score, Some(0.0));
        assert_eq!(collection.zones[0].color, color_for(0.0));
        assert_eq!(collection.zones[1].summary.zone_score, None);
        assert_eq!(collection.zones[1].color, DEFAULT_ZONE_COLOR);
        assert_eq!(collection.zones[2].summary.zone_score, Some(1.0));
    }

    #[test]
    fn test_all_zero_scores_do_not_divide() {
        let collection = finalize_zones(
            vec![scored(0, Some(0.0), true), scored(1, Some(0.0), true)],
            BTreeMap::new(),
            BTreeMap::new(),
        );
        assert!(collection
            .zones
            .iter()
            .all(|z| z.summary.zone_score == Some(0.0)));
    }

    #[test]
    fn test_no_valid_zones() {
        let mut weights = BTreeMap::new();
        weights.insert("slope".to_string(), 0.5);
        let collection = finalize_zones(vec![scored(0, Some(3.0), false)], weights.clone(), BTreeMap::new());

        assert!(collection.is_empty());
        assert_eq!(collection.min_score, None);
        assert_eq!(collection.max_score, None);
        assert_eq!(collection.weights, weights);
    }

    #[test]
    fn test_query_encodes_filters_for_resource() {
        let area = AreaOfInterest::new("KEN", AreaType::Country, Bounds::new(0.0, 0.0, 1.0, 1.0));
        let mut request = ZoneRunRequest::new(area, Resource::Solar, ZoneType::Boundaries);
        request.filters = serde_json::from_str(
            r#"[{"id": "f_slope", "active": true, "input": {"type": "range", "value": {"min": 0, "max": 10}}}]"#,
        )
        .unwrap();

        let query = request.query();
        assert_eq!(query.resource_path(), "/KEN/solar");
        assert_eq!(query.filter_query, "f_slope=0,10");
    }
}
