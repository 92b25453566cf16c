//! Geographic helpers used by tessellation.
//!
//! Longitudes and latitudes are in degrees, distances in kilometres. Great-circle
//! computations use the haversine formula on the mean Earth radius.

pub mod grid;
pub mod topology;

use geo::{HaversineDestination, Intersects, Point};

use crate::models::{Bounds, ZoneGeometry};

pub use grid::build_grid;

/// Fixed approximate conversion used when sizing square extents.
pub const KM_PER_DEGREE: f64 = 111.32;

/// Vertices used to approximate the circle in [`square_bounds_around`].
const CIRCLE_STEPS: usize = 64;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("cell size must be a positive number of kilometres, got {0}")]
    InvalidCellSize(f64),
    #[error("bounding box {0} has no area")]
    DegenerateBounds(Bounds),
    #[error("grid of {cells} cells exceeds the limit of {limit}")]
    TooManyCells { cells: u64, limit: u64 },
}

/// Map a longitude into `[-180, 180]` by repeated ±360 shifts.
///
/// Exactly `-180.0` maps to `175.0`, matching the antimeridian convention of the
/// boundary datasets.
pub fn normalize_longitude(lng: f64) -> f64 {
    if !lng.is_finite() {
        return lng;
    }
    let mut out = if lng == -180.0 { 175.0 } else { lng };
    while !(-180.0..=180.0).contains(&out) {
        if out < 0.0 {
            out += 360.0;
        } else {
            out -= 360.0;
        }
    }
    out
}

/// True if `point` lies inside (or on the edge of) `zone`.
///
/// Multi-polygons contain a point when any of their parts does.
pub fn point_in_zone(point: &Point<f64>, zone: &ZoneGeometry) -> bool {
    match zone {
        ZoneGeometry::Polygon(polygon) => polygon.intersects(point),
        ZoneGeometry::MultiPolygon(parts) => parts.0.iter().any(|p| p.intersects(point)),
    }
}

/// Square, cell-aligned extent around an irregular bounding box.
///
/// The larger side of `bounds` (converted at [`KM_PER_DEGREE`]) is halved into a
/// radius, rounded to the nearest multiple of `cell_size_km`, and the bounding
/// box of a circle of that radius around the center is returned.
pub fn square_bounds_around(bounds: &Bounds, cell_size_km: f64) -> Result<Bounds, GeometryError> {
    if !(cell_size_km > 0.0) || !cell_size_km.is_finite() {
        return Err(GeometryError::InvalidCellSize(cell_size_km));
    }

    let (center_lng, center_lat) = bounds.center();
    let max_diff = bounds.width().max(bounds.height());
    let radius_km = (max_diff * KM_PER_DEGREE / 2.0 / cell_size_km).round() * cell_size_km;

    let center = Point::new(center_lng, center_lat);
    let mut out = Bounds::new(center_lng, center_lat, center_lng, center_lat);
    for step in 0..CIRCLE_STEPS {
        let bearing = -(step as f64) * 360.0 / CIRCLE_STEPS as f64;
        let vertex = center.haversine_destination(bearing, radius_km * 1000.0);
        out = out.union(&Bounds::new(vertex.x(), vertex.y(), vertex.x(), vertex.y()));
    }
    Ok(out)
}
