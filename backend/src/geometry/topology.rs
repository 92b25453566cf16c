//! TopoJSON boundary datasets.
//!
//! Decoding goes through the `topojson` crate: each object is converted to a
//! GeoJSON feature collection and then to `geo` geometries. Only areal geometries
//! are kept (`Polygon`, `MultiPolygon`, and the areal parts of nested
//! `GeometryCollection`s).

use geo::{Geometry, MultiPolygon, Polygon};
use serde_json::{Map, Value};
use topojson::{TopoJson, Value as TopoValue};

use crate::models::ZoneGeometry;

#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("invalid topology: {0}")]
    Decode(#[from] topojson::Error),
    #[error("expected a Topology, found a bare geometry")]
    NotTopology,
    #[error("topology has no object named '{0}'")]
    MissingObject(String),
    #[error("arc index {0} is out of range")]
    ArcOutOfRange(i64),
    #[error("undecodable geometry: {0}")]
    Geometry(String),
}

/// One decoded areal feature of a topology object.
#[derive(Debug, Clone, PartialEq)]
pub struct TopoFeature {
    /// Geometry-level `id`, if any.
    pub id: Option<Value>,
    pub properties: Map<String, Value>,
    pub geometry: ZoneGeometry,
}

/// A parsed TopoJSON topology.
#[derive(Debug, Clone)]
pub struct Topology {
    inner: topojson::Topology,
}

impl Topology {
    pub fn from_json(raw: &str) -> Result<Self, TopologyError> {
        match raw.parse::<TopoJson>()? {
            TopoJson::Topology(inner) => Ok(Self { inner }),
            TopoJson::Geometry(_) => Err(TopologyError::NotTopology),
        }
    }

    /// Decode every areal geometry of `object` into a feature.
    pub fn features(&self, object: &str) -> Result<Vec<TopoFeature>, TopologyError> {
        let named = self
            .inner
            .objects
            .iter()
            .find(|o| o.name == object)
            .ok_or_else(|| TopologyError::MissingObject(object.to_string()))?;
        check_arcs(&named.geometry, self.inner.arcs.len())?;

        let collection = topojson::to_geojson(&self.inner, object)?;
        let mut out = Vec::with_capacity(collection.features.len());
        for feature in collection.features {
            let Some(geometry) = feature.geometry else {
                continue;
            };
            let geometry = Geometry::<f64>::try_from(geometry.value)
                .map_err(|e| TopologyError::Geometry(e.to_string()))?;
            let Some(geometry) = areal(geometry) else {
                continue;
            };
            out.push(TopoFeature {
                id: feature.id.and_then(|id| serde_json::to_value(id).ok()),
                properties: feature.properties.unwrap_or_default(),
                geometry,
            });
        }
        Ok(out)
    }

    /// Every polygon of `object` gathered into one multipolygon, or `None` if it
    /// has none.
    ///
    /// Parts are collected side by side, not dissolved into a union; the result is
    /// only used for point containment, where the two agree.
    pub fn merge(&self, object: &str) -> Result<Option<ZoneGeometry>, TopologyError> {
        let polygons: Vec<Polygon<f64>> = self
            .features(object)?
            .into_iter()
            .flat_map(|f| match f.geometry {
                ZoneGeometry::Polygon(p) => vec![p],
                ZoneGeometry::MultiPolygon(mp) => mp.0,
            })
            .collect();
        Ok(match polygons.len() {
            0 => None,
            _ => Some(ZoneGeometry::MultiPolygon(MultiPolygon(polygons))),
        })
    }
}

/// Areal part of a decoded geometry. Collections keep only their polygons.
fn areal(geometry: Geometry<f64>) -> Option<ZoneGeometry> {
    match geometry {
        Geometry::Polygon(p) => Some(ZoneGeometry::Polygon(p)),
        Geometry::MultiPolygon(mp) => Some(ZoneGeometry::MultiPolygon(mp)),
        Geometry::GeometryCollection(gc) => {
            let polygons: Vec<Polygon<f64>> = gc
                .into_iter()
                .filter_map(areal)
                .flat_map(|g| match g {
                    ZoneGeometry::Polygon(p) => vec![p],
                    ZoneGeometry::MultiPolygon(mp) => mp.0,
                })
                .collect();
            (!polygons.is_empty()).then(|| ZoneGeometry::MultiPolygon(MultiPolygon(polygons)))
        }
        _ => None,
    }
}

/// Reject arc references the topology does not have before converting it.
fn check_arcs(geometry: &topojson::Geometry, arc_count: usize) -> Result<(), TopologyError> {
    let indices: Vec<i64> = match &geometry.value {
        TopoValue::GeometryCollection(geometries) => {
            for g in geometries {
                check_arcs(g, arc_count)?;
            }
            return Ok(());
        }
        TopoValue::LineString(arcs) => arcs.iter().map(|&i| i64::from(i)).collect(),
        TopoValue::MultiLineString(lines) | TopoValue::Polygon(lines) => {
            lines.iter().flatten().map(|&i| i64::from(i)).collect()
        }
        TopoValue::MultiPolygon(polygons) => {
            polygons.iter().flatten().flatten().map(|&i| i64::from(i)).collect()
        }
        _ => return Ok(()),
    };

    match indices.into_iter().find(|&i| {
        let position = if i < 0 { !i } else { i };
        usize::try_from(position).map_or(true, |p| p >= arc_count)
    }) {
        Some(bad) => Err(TopologyError::ArcOutOfRange(bad)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two unit squares sharing the edge x = 1, quantized with scale 1.
    const SHARED_EDGE: &str = r#"{
        "type": "Topology",
        "transform": {"scale": [1, 1], "translate": [10, 20]},
        "arcs": [
            [[1, 0], [0, 1]],
            [[1, 1], [-1, 0], [0, -1], [1, 0]],
            [[1, 0], [1, 0], [0, 1], [-1, 0]]
        ],
        "objects": {
            "KEN": {
                "type": "GeometryCollection",
                "geometries": [
                    {"type": "Polygon", "arcs": [[0, 1]], "properties": {"id": 1, "name": "West"}},
                    {"type": "MultiPolygon", "arcs": [[[2, -1]]], "properties": {"GID_0": "E"}},
                    {"type": "Point", "coordinates": [0, 0]}
                ]
            }
        }
    }"#;

    fn exterior(geometry: &ZoneGeometry) -> Vec<(f64, f64)> {
        let polygon = geometry.polygons()[0];
        polygon.exterior().0.iter().map(|c| (c.x, c.y)).collect()
    }

    #[test]
    fn test_decode_quantized_arcs() {
        let topology = Topology::from_json(SHARED_EDGE).unwrap();
        let features = topology.features("KEN").unwrap();
        assert_eq!(features.len(), 2);

        assert_eq!(
            exterior(&features[0].geometry),
            vec![(11.0, 20.0), (11.0, 21.0), (10.0, 21.0), (10.0, 20.0), (11.0, 20.0)]
        );
        assert_eq!(features[0].properties["name"], "West");
    }

    #[test]
    fn test_negative_index_reverses_shared_arc() {
        let topology = Topology::from_json(SHARED_EDGE).unwrap();
        let features = topology.features("KEN").unwrap();
        assert!(matches!(features[1].geometry, ZoneGeometry::MultiPolygon(_)));
        assert_eq!(
            exterior(&features[1].geometry),
            vec![(11.0, 20.0), (12.0, 20.0), (12.0, 21.0), (11.0, 21.0), (11.0, 20.0)]
        );
    }

    #[test]
    fn test_merge_collects_all_parts() {
        let topology = Topology::from_json(SHARED_EDGE).unwrap();
        match topology.merge("KEN").unwrap() {
            Some(ZoneGeometry::MultiPolygon(mp)) => assert_eq!(mp.0.len(), 2),
            other => panic!("unexpected merge result: {:?}", other),
        }
    }

    #[test]
    fn test_geometry_id_is_kept() {
        let raw = r#"{"type": "Topology", "arcs": [[[0, 0], [1, 0], [1, 1], [0, 0]]], "objects": {
            "X": {"type": "GeometryCollection", "geometries": [
                {"type": "Polygon", "id": "X.1", "arcs": [[0]]}
            ]}
        }}"#;
        let features = Topology::from_json(raw).unwrap().features("X").unwrap();
        assert_eq!(features[0].id, Some(Value::String("X.1".into())));
        assert!(features[0].properties.is_empty());
    }

    #[test]
    fn test_missing_object() {
        let topology = Topology::from_json(SHARED_EDGE).unwrap();
        assert!(matches!(
            topology.features("TZA"),
            Err(TopologyError::MissingObject(name)) if name == "TZA"
        ));
    }

    #[test]
    fn test_rejects_non_topology() {
        assert!(Topology::from_json(r#"{"type": "FeatureCollection", "features": []}"#).is_err());
        assert!(matches!(Topology::from_json("nope"), Err(TopologyError::Decode(_))));
    }

    #[test]
    fn test_arc_out_of_range() {
        let raw = r#"{"type": "Topology", "arcs": [], "objects": {
            "X": {"type": "Polygon", "arcs": [[3]]}
        }}"#;
        let topology = Topology::from_json(raw).unwrap();
        assert!(matches!(
            topology.features("X"),
            Err(TopologyError::ArcOutOfRange(3))
        ));

        let reversed = r#"{"type": "Topology", "arcs": [], "objects": {
            "X": {"type": "MultiPolygon", "arcs": [[[-1]]]}
        }}"#;
        assert!(matches!(
            Topology::from_json(reversed).unwrap().features("X"),
            Err(TopologyError::ArcOutOfRange(-1))
        ));
    }
}
