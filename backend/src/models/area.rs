//! Areas of interest and the area catalog.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use geo::{coord, Rect};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::resource::Resource;
use super::zone::ZoneGeometry;
use crate::error::{ErrorContext, ZoneError, ZoneResult};
use crate::geometry::topology::Topology;

/// Catalog file listing the selectable areas.
pub const AREAS_FILE: &str = "areas.json";
/// Exclusive economic zones, one feature per territory part.
pub const EEZ_FILE: &str = "eez_v11.topojson";
const EEZ_OBJECT: &str = "eez_v11";
const EEZ_COUNTRY_FIELD: &str = "ISO_TER1";

/// Geographic bounding box in degrees.
///
/// Deserializes from `[west, south, east, north]` or the same values as a
/// comma-separated string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoundsRepr", into = "[f64; 4]")]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoundsRepr {
    Array([f64; 4]),
    Text(String),
}

impl TryFrom<BoundsRepr> for Bounds {
    type Error = String;

    fn try_from(repr: BoundsRepr) -> Result<Self, Self::Error> {
        match repr {
            BoundsRepr::Array(a) => Ok(Bounds::from(a)),
            BoundsRepr::Text(s) => {
                let values = s
                    .split(',')
                    .map(|v| v.trim().parse::<f64>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| format!("Invalid bounds '{}': {}", s, e))?;
                let array: [f64; 4] = values
                    .try_into()
                    .map_err(|_| format!("Bounds '{}' must have 4 values", s))?;
                Ok(Bounds::from(array))
            }
        }
    }
}

impl From<[f64; 4]> for Bounds {
    fn from([west, south, east, north]: [f64; 4]) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }
}

impl From<Bounds> for [f64; 4] {
    fn from(b: Bounds) -> Self {
        [b.west, b.south, b.east, b.north]
    }
}

impl Bounds {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Center as `(lng, lat)`.
    pub fn center(&self) -> (f64, f64) {
        ((self.west + self.east) / 2.0, (self.south + self.north) / 2.0)
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            west: self.west.min(other.west),
            south: self.south.min(other.south),
            east: self.east.max(other.east),
            north: self.north.max(other.north),
        }
    }

    pub fn contains(&self, other: &Bounds, epsilon: f64) -> bool {
        other.west >= self.west - epsilon
            && other.south >= self.south - epsilon
            && other.east <= self.east + epsilon
            && other.north <= self.north + epsilon
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.west, y: self.south },
            coord! { x: self.east, y: self.north },
        )
    }
}

impl From<Rect<f64>> for Bounds {
    fn from(rect: Rect<f64>) -> Self {
        Bounds::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.west, self.south, self.east, self.north)
    }
}

/// Kind of area; also the dataset sub-directory holding its boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaType {
    Country,
    Region,
    #[serde(other)]
    Other,
}

impl AreaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AreaType::Country => "country",
            AreaType::Region => "region",
            AreaType::Other => "other",
        }
    }
}

/// A selected area. Replaced wholesale when the selection changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaOfInterest {
    pub id: String,
    #[serde(rename = "type")]
    pub area_type: AreaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub bounds: Bounds,
    /// Size class from the catalog (`xs`, `s`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Whether a `_merged` boundary dataset exists for grid tessellation.
    #[serde(default)]
    pub merged_exist: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_km2: Option<f64>,
    /// Exact land boundary, when supplied inline instead of via a dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary: Option<ZoneGeometry>,
    /// Maritime (EEZ) parts of the area.
    #[serde(default, skip_serializing)]
    pub eez: Vec<ZoneGeometry>,
}

impl AreaOfInterest {
    pub fn new(id: impl Into<String>, area_type: AreaType, bounds: Bounds) -> Self {
        Self {
            id: id.into(),
            area_type,
            name: None,
            bounds,
            size: None,
            merged_exist: false,
            area_km2: None,
            boundary: None,
            eez: Vec::new(),
        }
    }

    pub fn is_extra_small(&self) -> bool {
        self.size.as_deref() == Some("xs")
    }

    /// The maritime boundary used to clip offshore grids: the first EEZ part.
    pub fn maritime_boundary(&self) -> Option<&ZoneGeometry> {
        self.eez.first()
    }

    /// Bounding box to tessellate for `resource`.
    ///
    /// Offshore runs cover the union of the land bounds and every EEZ part.
    pub fn extent_for(&self, resource: Resource) -> Bounds {
        if !resource.is_offshore() {
            return self.bounds;
        }
        self.eez
            .iter()
            .filter_map(|g| g.bounding_rect())
            .fold(self.bounds, |acc, rect| acc.union(&Bounds::from(rect)))
    }
}

/// Raw catalog entry; countries are keyed by `gid`.
#[derive(Debug, Deserialize)]
struct AreaRecord {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    gid: Option<String>,
    #[serde(rename = "type")]
    area_type: AreaType,
    #[serde(default)]
    name: Option<String>,
    bounds: Bounds,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    merged_exist: bool,
    #[serde(default)]
    area_km2: Option<f64>,
}

impl AreaRecord {
    fn into_area(self) -> Option<AreaOfInterest> {
        let id = match (self.area_type, self.gid, self.id) {
            (AreaType::Country, Some(gid), _) => gid,
            (_, _, Some(Value::String(s))) => s,
            (_, _, Some(Value::Number(n))) => n.to_string(),
            (_, Some(gid), _) => gid,
            _ => return None,
        };
        Some(AreaOfInterest {
            id,
            area_type: self.area_type,
            name: self.name,
            bounds: self.bounds,
            size: self.size,
            merged_exist: self.merged_exist,
            area_km2: self.area_km2,
            boundary: None,
            eez: Vec::new(),
        })
    }
}

/// All selectable areas, with EEZ parts attached to countries.
#[derive(Debug, Clone, Default)]
pub struct AreaCatalog {
    areas: Vec<AreaOfInterest>,
}

impl AreaCatalog {
    pub fn new(areas: Vec<AreaOfInterest>) -> Self {
        Self { areas }
    }

    /// Load `areas.json` and, when present, `eez_v11.topojson` from `root`.
    pub fn load(root: &Path) -> ZoneResult<Self> {
        let areas_path = root.join(AREAS_FILE);
        let content = std::fs::read_to_string(&areas_path).map_err(|e| {
            ZoneError::dataset(
                format!("Failed to read area catalog: {}", e),
                ErrorContext::new("load_catalog").with_entity_id(areas_path.display()),
            )
        })?;

        let eez_path = root.join(EEZ_FILE);
        let eez = if eez_path.exists() {
            let raw = std::fs::read_to_string(&eez_path).map_err(|e| {
                ZoneError::dataset(
                    format!("Failed to read EEZ dataset: {}", e),
                    ErrorContext::new("load_catalog").with_entity_id(eez_path.display()),
                )
            })?;
            Some(Topology::from_json(&raw)?)
        } else {
            log::warn!("No EEZ dataset at {}; offshore grids will not be clipped", eez_path.display());
            None
        };

        Self::from_json(&content, eez.as_ref())
    }

    /// Build the catalog from `areas.json` content and an optional EEZ topology.
    pub fn from_json(areas_json: &str, eez: Option<&Topology>) -> ZoneResult<Self> {
        let records: Vec<AreaRecord> = serde_json::from_str(areas_json).map_err(|e| {
            ZoneError::dataset(
                format!("Invalid area catalog: {}", e),
                ErrorContext::new("load_catalog"),
            )
        })?;

        let mut eez_by_country: HashMap<String, Vec<ZoneGeometry>> = HashMap::new();
        if let Some(topology) = eez {
            for feature in topology.features(EEZ_OBJECT)? {
                if let Some(Value::String(country)) = feature.properties.get(EEZ_COUNTRY_FIELD) {
                    eez_by_country
                        .entry(country.clone())
                        .or_default()
                        .push(feature.geometry);
                }
            }
        }

        let areas = records
            .into_iter()
            .filter_map(AreaRecord::into_area)
            .map(|mut area| {
                if area.area_type == AreaType::Country {
                    area.eez = eez_by_country.remove(&area.id).unwrap_or_default();
                }
                area
            })
            .collect::<Vec<_>>();

        log::info!("Loaded area catalog with {} areas", areas.len());
        Ok(Self { areas })
    }

    pub fn areas(&self) -> &[AreaOfInterest] {
        &self.areas
    }

    pub fn get(&self, id: &str) -> Option<&AreaOfInterest> {
        self.areas.iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}
