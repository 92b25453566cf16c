//! Partitioning an area of interest into zones.
//!
//! Offshore runs always produce a grid clipped to the land boundary OR the
//! maritime boundary. Onshore runs produce either a grid clipped to the land
//! boundary or one zone per administrative unit of the area's boundary dataset.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{ErrorContext, ZoneError, ZoneResult};
use crate::geometry::topology::{TopoFeature, Topology};
use crate::geometry::{build_grid, square_bounds_around};
use crate::models::{AreaOfInterest, Resource, ZoneGeometry, ZoneId, ZonePolygon, ZoneType};

/// Fallback identifier field of administrative features.
pub const FALLBACK_ID_FIELD: &str = "GID_0";
/// Fallback display-name field of administrative features.
pub const FALLBACK_NAME_FIELD: &str = "NAME_0";

/// Grid cell size used when offshore runs request administrative boundaries.
pub const DEFAULT_OFFSHORE_GRID_KM: f64 = 25.0;

/// Supplies decoded boundary datasets.
#[async_trait]
pub trait BoundarySource: Send + Sync {
    async fn load_topology(&self, area: &AreaOfInterest, zone_type: ZoneType) -> ZoneResult<Topology>;
}

/// Reads `{root}/{area type}/{area id}[_merged].topojson` from disk.
#[derive(Debug, Clone)]
pub struct FsBoundarySource {
    root: PathBuf,
}

impl FsBoundarySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The merged dataset is used for grids when the catalog says one exists.
    pub fn dataset_path(&self, area: &AreaOfInterest, zone_type: ZoneType) -> PathBuf {
        let file = if area.merged_exist && zone_type.is_grid() {
            format!("{}_merged.topojson", area.id)
        } else {
            format!("{}.topojson", area.id)
        };
        self.root.join(area.area_type.as_str()).join(file)
    }
}

#[async_trait]
impl BoundarySource for FsBoundarySource {
    async fn load_topology(&self, area: &AreaOfInterest, zone_type: ZoneType) -> ZoneResult<Topology> {
        let path = self.dataset_path(area, zone_type);
        let raw = tokio::fs::read_to_string(&path).await.map_err(|e| {
            ZoneError::dataset(
                format!("Failed to read boundary dataset: {}", e),
                ErrorContext::new("load_topology")
                    .with_entity("area")
                    .with_entity_id(&area.id)
                    .with_details(path.display().to_string()),
            )
        })?;
        Topology::from_json(&raw).map_err(|e| {
            ZoneError::dataset(
                format!("Failed to parse boundary dataset: {}", e),
                ErrorContext::new("load_topology")
                    .with_entity("area")
                    .with_entity_id(&area.id)
                    .with_details(path.display().to_string()),
            )
        })
    }
}

/// Knobs that shape tessellation beyond the request itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TessellationOptions {
    /// Start onshore grids from a square, cell-aligned extent.
    pub square_grid_extent: bool,
    pub default_offshore_grid_km: f64,
}

impl Default for TessellationOptions {
    fn default() -> Self {
        Self {
            square_grid_extent: false,
            default_offshore_grid_km: DEFAULT_OFFSHORE_GRID_KM,
        }
    }
}

/// Offshore wind never uses administrative boundaries.
pub fn effective_zone_type(zone_type: ZoneType, resource: Resource, options: &TessellationOptions) -> ZoneType {
    match zone_type {
        ZoneType::Boundaries if resource.is_offshore() => ZoneType::Grid {
            size_km: options.default_offshore_grid_km,
        },
        other => other,
    }
}

/// Whether the exact land boundary is worth clipping against.
pub fn uses_area_limit(area: &AreaOfInterest, resource: Resource) -> bool {
    resource.is_offshore() || !area.is_extra_small()
}

/// Produce the zones for one run. Ids are unique within the result.
pub async fn tessellate(
    source: &dyn BoundarySource,
    area: &AreaOfInterest,
    zone_type: ZoneType,
    resource: Resource,
    options: &TessellationOptions,
) -> ZoneResult<Vec<ZonePolygon>> {
    let zone_type = effective_zone_type(zone_type, resource, options);

    let zones = match zone_type {
        ZoneType::Grid { size_km } => {
            let area_limit = if uses_area_limit(area, resource) {
                area_limit(source, area, zone_type).await?
            } else {
                None
            };

            let (extent, offshore_limit) = if resource.is_offshore() {
                (area.extent_for(resource), area.maritime_boundary())
            } else if options.square_grid_extent {
                (square_bounds_around(&area.bounds, size_km)?, None)
            } else {
                (area.bounds, None)
            };

            build_grid(&extent, size_km, area_limit.as_ref(), offshore_limit)?
        }
        ZoneType::Boundaries => {
            let topology = source.load_topology(area, zone_type).await?;
            let features = topology.features(&area.id).map_err(|e| {
                ZoneError::dataset(
                    e.to_string(),
                    ErrorContext::new("tessellate").with_entity("area").with_entity_id(&area.id),
                )
            })?;
            features
                .into_iter()
                .enumerate()
                .map(|(index, feature)| boundary_zone(index, feature))
                .collect()
        }
    };

    ensure_unique_ids(&zones, area)?;
    log::info!("Tessellated {} into {} zones ({})", area.id, zones.len(), zone_type);
    Ok(zones)
}

async fn area_limit(
    source: &dyn BoundarySource,
    area: &AreaOfInterest,
    zone_type: ZoneType,
) -> ZoneResult<Option<ZoneGeometry>> {
    if let Some(boundary) = &area.boundary {
        return Ok(Some(boundary.clone()));
    }
    let topology = source.load_topology(area, zone_type).await?;
    Ok(topology.merge(&area.id)?)
}

fn boundary_zone(index: usize, feature: TopoFeature) -> ZonePolygon {
    let TopoFeature {
        id,
        properties,
        geometry,
    } = feature;

    let zone_id = [properties.get("id"), properties.get(FALLBACK_ID_FIELD), id.as_ref()]
        .into_iter()
        .flatten()
        .find_map(ZoneId::from_json)
        .unwrap_or(ZoneId::Index(index as u64));

    let zone = ZonePolygon::new(zone_id, geometry);
    match feature_name(&properties) {
        Some(raw) => zone.with_name(repair_name(raw)),
        None => zone,
    }
}

fn feature_name(properties: &Map<String, Value>) -> Option<&str> {
    ["name", FALLBACK_NAME_FIELD]
        .into_iter()
        .find_map(|key| properties.get(key).and_then(Value::as_str))
}

/// Undo UTF-8 text that was decoded as Latin-1 (`"CÃ´te"` → `"Côte"`).
///
/// Names that do not decode are kept as they are.
pub fn repair_name(raw: &str) -> String {
    if raw.is_ascii() {
        return raw.to_string();
    }
    let bytes: Option<Vec<u8>> = raw.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect();
    match bytes.map(String::from_utf8) {
        Some(Ok(decoded)) => decoded,
        _ => {
            log::warn!("Could not decode zone name {:?}; keeping it as is", raw);
            raw.to_string()
        }
    }
}

fn ensure_unique_ids(zones: &[ZonePolygon], area: &AreaOfInterest) -> ZoneResult<()> {
    let mut seen = HashSet::with_capacity(zones.len());
    for zone in zones {
        if !seen.insert(&zone.id) {
            return Err(ZoneError::tessellation(
                format!("Duplicate zone id {}", zone.id),
                ErrorContext::new("tessellate")
                    .with_entity("area")
                    .with_entity_id(&area.id),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tessellation_tests.rs"]
mod tessellation_tests;
