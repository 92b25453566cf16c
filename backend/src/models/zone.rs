//! Zone types: tessellation output, remote summaries, and scored results.

use std::collections::BTreeMap;
use std::fmt;

use geo::{BoundingRect, MultiPolygon, Polygon, Rect};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How an area is partitioned into zones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoneType {
    /// Regular grid with cells of roughly `size_km` kilometres per edge.
    Grid {
        #[serde(rename = "size", deserialize_with = "deserialize_size_km")]
        size_km: f64,
    },
    /// Administrative sub-units from a prepared boundary dataset.
    Boundaries,
}

impl ZoneType {
    pub fn is_grid(&self) -> bool {
        matches!(self, ZoneType::Grid { .. })
    }

    pub fn cell_size_km(&self) -> Option<f64> {
        match self {
            ZoneType::Grid { size_km } => Some(*size_km),
            ZoneType::Boundaries => None,
        }
    }
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneType::Grid { size_km } => write!(f, "{} km grid", size_km),
            ZoneType::Boundaries => write!(f, "administrative boundaries"),
        }
    }
}

/// Grid sizes arrive either as numbers or as numeric strings (`"25"`).
fn deserialize_size_km<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SizeRepr {
        Number(f64),
        Text(String),
    }

    match SizeRepr::deserialize(deserializer)? {
        SizeRepr::Number(n) => Ok(n),
        SizeRepr::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Zone identifier, unique within one tessellation run.
///
/// Grid cells use sequential integers; boundary datasets may carry string codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ZoneId {
    Index(u64),
    Code(String),
}

impl ZoneId {
    /// Interpret a JSON property value as a zone id.
    ///
    /// Non-negative integral numbers become [`ZoneId::Index`], everything else
    /// non-null is kept as its textual form.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(n) => Some(
                n.as_u64()
                    .map(ZoneId::Index)
                    .unwrap_or_else(|| ZoneId::Code(n.to_string())),
            ),
            Value::String(s) => Some(ZoneId::Code(s.clone())),
            other => Some(ZoneId::Code(other.to_string())),
        }
    }

    fn to_feature_id(&self) -> geojson::feature::Id {
        match self {
            ZoneId::Index(i) => geojson::feature::Id::Number((*i).into()),
            ZoneId::Code(s) => geojson::feature::Id::String(s.clone()),
        }
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneId::Index(i) => write!(f, "{}", i),
            ZoneId::Code(s) => write!(f, "{}", s),
        }
    }
}

impl From<u64> for ZoneId {
    fn from(v: u64) -> Self {
        ZoneId::Index(v)
    }
}

impl From<&str> for ZoneId {
    fn from(v: &str) -> Self {
        ZoneId::Code(v.to_string())
    }
}

/// Areal geometry of a zone or boundary: one polygon or a multi-polygon.
///
/// Serialized as a GeoJSON geometry object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "geojson::Geometry", into = "geojson::Geometry")]
pub enum ZoneGeometry {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl ZoneGeometry {
    /// Constituent polygons (one for a plain polygon).
    pub fn polygons(&self) -> Vec<&Polygon<f64>> {
        match self {
            ZoneGeometry::Polygon(p) => vec![p],
            ZoneGeometry::MultiPolygon(mp) => mp.0.iter().collect(),
        }
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        match self {
            ZoneGeometry::Polygon(p) => p.bounding_rect(),
            ZoneGeometry::MultiPolygon(mp) => mp.bounding_rect(),
        }
    }

    pub fn to_geojson(&self) -> geojson::Geometry {
        let value = match self {
            ZoneGeometry::Polygon(p) => geojson::Value::from(p),
            ZoneGeometry::MultiPolygon(mp) => geojson::Value::from(mp),
        };
        geojson::Geometry::new(value)
    }
}

impl TryFrom<geo::Geometry<f64>> for ZoneGeometry {
    type Error = String;

    fn try_from(geometry: geo::Geometry<f64>) -> Result<Self, Self::Error> {
        match geometry {
            geo::Geometry::Polygon(p) => Ok(ZoneGeometry::Polygon(p)),
            geo::Geometry::MultiPolygon(mp) => Ok(ZoneGeometry::MultiPolygon(mp)),
            geo::Geometry::Rect(r) => Ok(ZoneGeometry::Polygon(r.to_polygon())),
            _ => Err("expected a Polygon or MultiPolygon geometry".to_string()),
        }
    }
}

impl TryFrom<geojson::Geometry> for ZoneGeometry {
    type Error = String;

    fn try_from(geometry: geojson::Geometry) -> Result<Self, Self::Error> {
        let geom: geo::Geometry<f64> = geometry.value.try_into().map_err(|e| format!("{}", e))?;
        ZoneGeometry::try_from(geom)
    }
}

impl From<ZoneGeometry> for geojson::Geometry {
    fn from(geometry: ZoneGeometry) -> Self {
        geometry.to_geojson()
    }
}

/// One tessellated zone. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonePolygon {
    pub id: ZoneId,
    pub name: Option<String>,
    pub geometry: ZoneGeometry,
}

impl ZonePolygon {
    pub fn new(id: impl Into<ZoneId>, geometry: ZoneGeometry) -> Self {
        Self {
            id: id.into(),
            name: None,
            geometry,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Per-zone summary returned by the remote analysis endpoint.
///
/// Unknown numeric fields (e.g. `suitable_area`) are carried in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ZoneSummary {
    #[serde(default)]
    pub lcoe: f64,
    /// `None` when the endpoint omitted the score; such zones pass through unscored.
    #[serde(default)]
    pub zone_score: Option<f64>,
    #[serde(default)]
    pub generation_potential: f64,
    #[serde(default)]
    pub zone_output_density: f64,
    #[serde(default)]
    pub cf: f64,
    /// Installed capacity potential, passed through without sign clamping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icp: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ZoneSummary {
    /// The all-zero summary attached to zones whose request failed.
    pub fn zeroed() -> Self {
        Self {
            zone_score: Some(0.0),
            ..Default::default()
        }
    }

    /// Coerce every negative model output to zero. `icp` is left untouched.
    pub fn clamp_non_negative(&mut self) {
        for field in [
            &mut self.lcoe,
            &mut self.generation_potential,
            &mut self.zone_output_density,
            &mut self.cf,
        ] {
            if *field < 0.0 {
                *field = 0.0;
            }
        }
        if let Some(score) = self.zone_score.as_mut() {
            if *score < 0.0 {
                *score = 0.0;
            }
        }
        for value in self.extra.values_mut() {
            if value.as_f64().is_some_and(|v| v < 0.0) {
                *value = Value::from(0);
            }
        }
    }
}

/// A zone paired with its summary and display color.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredZone {
    pub zone: ZonePolygon,
    pub summary: ZoneSummary,
    pub color: String,
    pub is_valid_summary: bool,
}

impl ScoredZone {
    pub fn id(&self) -> &ZoneId {
        &self.zone.id
    }

    fn to_feature(&self) -> geojson::Feature {
        let mut properties = Map::new();
        properties.insert("id".to_string(), serde_json::to_value(&self.zone.id).unwrap_or(Value::Null));
        if let Some(name) = &self.zone.name {
            properties.insert("name".to_string(), Value::String(name.clone()));
        }
        properties.insert("color".to_string(), Value::String(self.color.clone()));
        properties.insert(
            "summary".to_string(),
            serde_json::to_value(&self.summary).unwrap_or(Value::Null),
        );

        geojson::Feature {
            bbox: None,
            geometry: Some(self.zone.geometry.to_geojson()),
            id: Some(self.zone.id.to_feature_id()),
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// The immutable result of one aggregation run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ZoneCollection {
    /// Valid, rescaled and colored zones in tessellation order.
    pub zones: Vec<ScoredZone>,
    /// Number of zones produced by tessellation, failed ones included.
    pub tessellated_count: usize,
    /// Ids of zones whose summary request failed.
    pub invalid_zone_ids: Vec<ZoneId>,
    /// Score range across valid zones before rescaling.
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub weights: BTreeMap<String, f64>,
    pub lcoe: BTreeMap<String, f64>,
}

impl ZoneCollection {
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn get(&self, id: &ZoneId) -> Option<&ScoredZone> {
        self.zones.iter().find(|z| z.id() == id)
    }

    /// GeoJSON view of the collection, with `weights` and `lcoe` as foreign members.
    pub fn to_feature_collection(&self) -> geojson::FeatureCollection {
        let mut foreign = Map::new();
        foreign.insert(
            "weights".to_string(),
            serde_json::to_value(&self.weights).unwrap_or(Value::Null),
        );
        foreign.insert(
            "lcoe".to_string(),
            serde_json::to_value(&self.lcoe).unwrap_or(Value::Null),
        );

        geojson::FeatureCollection {
            bbox: None,
            features: self.zones.iter().map(ScoredZone::to_feature).collect(),
            foreign_members: Some(foreign),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square() -> ZoneGeometry {
        ZoneGeometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ])
    }

    #[test]
    fn test_zone_type_serde() {
        let grid: ZoneType = serde_json::from_str(r#"{"type":"GRID","size":25}"#).unwrap();
        assert_eq!(grid, ZoneType::Grid { size_km: 25.0 });
        let text: ZoneType = serde_json::from_str(r#"{"type":"GRID","size":"50"}"#).unwrap();
        assert_eq!(text.cell_size_km(), Some(50.0));
        let boundaries: ZoneType = serde_json::from_str(r#"{"type":"BOUNDARIES"}"#).unwrap();
        assert_eq!(boundaries, ZoneType::Boundaries);
        assert_eq!(boundaries.cell_size_km(), None);
    }

    #[test]
    fn test_zone_id_from_json() {
        assert_eq!(ZoneId::from_json(&serde_json::json!(7)), Some(ZoneId::Index(7)));
        assert_eq!(
            ZoneId::from_json(&serde_json::json!("KEN.1_1")),
            Some(ZoneId::Code("KEN.1_1".into()))
        );
        assert_eq!(
            ZoneId::from_json(&serde_json::json!(-3)),
            Some(ZoneId::Code("-3".into()))
        );
        assert_eq!(ZoneId::from_json(&Value::Null), None);
    }

    #[test]
    fn test_summary_clamps_negative_fields_but_not_icp() {
        let mut summary: ZoneSummary = serde_json::from_value(serde_json::json!({
            "lcoe": -5,
            "zone_score": -0.2,
            "generation_potential": 12.5,
            "zone_output_density": -1,
            "cf": 0.3,
            "icp": -4,
            "suitable_area": -10
        }))
        .unwrap();

        summary.clamp_non_negative();

        assert_eq!(summary.lcoe, 0.0);
        assert_eq!(summary.zone_score, Some(0.0));
        assert_eq!(summary.generation_potential, 12.5);
        assert_eq!(summary.zone_output_density, 0.0);
        assert_eq!(summary.cf, 0.3);
        assert_eq!(summary.icp, Some(-4.0));
        assert_eq!(summary.extra["suitable_area"], serde_json::json!(0));
    }

    #[test]
    fn test_missing_score_stays_undefined() {
        let summary: ZoneSummary = serde_json::from_str(r#"{"lcoe": 40.0}"#).unwrap();
        assert_eq!(summary.zone_score, None);
        assert_eq!(ZoneSummary::zeroed().zone_score, Some(0.0));
    }

    #[test]
    fn test_geometry_geojson_round_trip() {
        let geometry = square();
        let json = serde_json::to_value(&geometry).unwrap();
        assert_eq!(json["type"], "Polygon");
        let back: ZoneGeometry = serde_json::from_value(json).unwrap();
        assert_eq!(back, geometry);
    }

    #[test]
    fn test_geometry_rejects_points() {
        let json = serde_json::json!({"type": "Point", "coordinates": [1.0, 2.0]});
        assert!(serde_json::from_value::<ZoneGeometry>(json).is_err());
    }

    #[test]
    fn test_feature_collection_carries_parameters() {
        let mut collection = ZoneCollection::default();
        collection.weights.insert("lcoe_gen".into(), 0.5);
        collection.lcoe.insert("capacity_factor".into(), 1.0);
        collection.zones.push(ScoredZone {
            zone: ZonePolygon::new(3u64, square()).with_name("Nairobi"),
            summary: ZoneSummary::zeroed(),
            color: "#c2ffe2".into(),
            is_valid_summary: true,
        });

        let fc = collection.to_feature_collection();
        assert_eq!(fc.features.len(), 1);
        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["name"], "Nairobi");
        assert_eq!(props["color"], "#c2ffe2");
        assert_eq!(props["id"], 3);
        let foreign = fc.foreign_members.unwrap();
        assert_eq!(foreign["weights"]["lcoe_gen"], 0.5);
        assert_eq!(foreign["lcoe"]["capacity_factor"], 1.0);
    }
}
