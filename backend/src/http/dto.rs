//! Data Transfer Objects for the HTTP API.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::AppError;
use crate::models::{AreaCatalog, AreaOfInterest, Bounds, FilterSetting, Resource, ZoneCollection, ZoneId, ZoneType};
use crate::services::{Progress, ZoneRun, ZoneRunRequest};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Number of areas in the loaded catalog
    pub areas: usize,
}

/// Catalog entry as listed to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaDto {
    pub id: String,
    #[serde(rename = "type")]
    pub area_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub bounds: Bounds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    pub merged_exist: bool,
    /// Whether offshore grids of this area are clipped to a maritime boundary
    pub has_maritime_boundary: bool,
}

impl From<&AreaOfInterest> for AreaDto {
    fn from(area: &AreaOfInterest) -> Self {
        Self {
            id: area.id.clone(),
            area_type: area.area_type.as_str().to_string(),
            name: area.name.clone(),
            bounds: area.bounds,
            size: area.size.clone(),
            merged_exist: area.merged_exist,
            has_maritime_boundary: area.maritime_boundary().is_some(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaListResponse {
    pub areas: Vec<AreaDto>,
    pub total: usize,
}

/// Discrete legend shown next to the zone map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegendResponse {
    pub colors: Vec<String>,
    pub power: i32,
}

/// Body of `POST /v1/zones` and `POST /v1/zones/runs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneRunRequestDto {
    pub area_id: String,
    pub resource: Resource,
    pub zone_type: ZoneType,
    #[serde(default)]
    pub filters: Vec<FilterSetting>,
    /// Weight id to a value in `[0, 1]`
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub lcoe: BTreeMap<String, f64>,
}

impl ZoneRunRequestDto {
    /// Resolve the area and check the parameters.
    pub fn into_request(self, catalog: &AreaCatalog) -> Result<ZoneRunRequest, AppError> {
        let area = catalog
            .get(&self.area_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Area {} not found", self.area_id)))?;

        if let Some(size) = self.zone_type.cell_size_km() {
            if !(size > 0.0) || !size.is_finite() {
                return Err(AppError::BadRequest(format!(
                    "Grid size must be a positive number of kilometres, got {}",
                    size
                )));
            }
        }
        if let Some((id, value)) = self
            .weights
            .iter()
            .find(|(_, v)| !v.is_finite() || !(0.0..=1.0).contains(*v))
        {
            return Err(AppError::BadRequest(format!(
                "Weight {} must be between 0 and 1, got {}",
                id, value
            )));
        }
        if let Some((id, _)) = self.lcoe.iter().find(|(_, v)| !v.is_finite()) {
            return Err(AppError::BadRequest(format!("LCOE parameter {} must be a number", id)));
        }

        Ok(ZoneRunRequest {
            area,
            resource: self.resource,
            zone_type: self.zone_type,
            filters: self.filters,
            weights: self.weights,
            lcoe: self.lcoe,
        })
    }
}

/// A finished zone collection.
#[derive(Debug, Clone, Serialize)]
pub struct ZoneCollectionResponse {
    /// GeoJSON features with `weights` and `lcoe` as foreign members
    pub zones: geojson::FeatureCollection,
    pub tessellated_count: usize,
    pub invalid_zone_ids: Vec<ZoneId>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
}

impl From<&ZoneCollection> for ZoneCollectionResponse {
    fn from(collection: &ZoneCollection) -> Self {
        Self {
            zones: collection.to_feature_collection(),
            tessellated_count: collection.tessellated_count,
            invalid_zone_ids: collection.invalid_zone_ids.clone(),
            min_score: collection.min_score,
            max_score: collection.max_score,
        }
    }
}

/// Response for starting a background run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRunResponse {
    pub run_id: String,
    pub message: String,
}

/// State of a background run.
#[derive(Debug, Clone, Serialize)]
pub struct RunStatusResponse {
    pub run_id: String,
    /// `pending`, `ready` or `error`
    pub status: String,
    pub area_id: String,
    pub resource: Resource,
    pub progress: Progress,
    pub superseded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ZoneCollectionResponse>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&ZoneRun> for RunStatusResponse {
    fn from(run: &ZoneRun) -> Self {
        Self {
            run_id: run.run_id.clone(),
            status: run.state.label().to_string(),
            area_id: run.area_id.clone(),
            resource: run.resource,
            progress: run.progress,
            superseded: run.superseded,
            error: run.state.error().map(str::to_string),
            result: run.state.data().map(|c| ZoneCollectionResponse::from(c.as_ref())),
            created_at: run.created_at,
            completed_at: run.completed_at,
        }
    }
}
