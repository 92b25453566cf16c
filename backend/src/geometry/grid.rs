//! Regular grid tessellation over a bounding box.

use geo::{polygon, HaversineDistance, Point};

use super::{normalize_longitude, point_in_zone, GeometryError};
use crate::models::{Bounds, ZoneGeometry, ZonePolygon};

/// Hard cap on the number of cells one grid may contain.
pub const MAX_GRID_CELLS: u64 = 250_000;

/// Tolerance applied before taking the ceiling of the cell count, so extents that
/// divide evenly do not gain a sliver column from floating-point error.
const CELL_COUNT_EPSILON: f64 = 1e-9;

/// Partition `bbox` into cells of roughly `cell_size_km` per edge.
///
/// Cell dimensions in degrees come from the great-circle length of the southern
/// and western edges of `bbox`. With no limits every cell is emitted. Otherwise a
/// cell is kept when its (longitude-normalized) center lies inside
/// `offshore_limit` or inside `area_limit`. Kept cells get sequential ids in
/// traversal order: all rows of the first column, then the next column.
pub fn build_grid(
    bbox: &Bounds,
    cell_size_km: f64,
    area_limit: Option<&ZoneGeometry>,
    offshore_limit: Option<&ZoneGeometry>,
) -> Result<Vec<ZonePolygon>, GeometryError> {
    if !(cell_size_km > 0.0) || !cell_size_km.is_finite() {
        return Err(GeometryError::InvalidCellSize(cell_size_km));
    }

    let origin = Point::new(bbox.west, bbox.south);
    let x_distance_km = origin.haversine_distance(&Point::new(bbox.east, bbox.south)) / 1000.0;
    let y_distance_km = origin.haversine_distance(&Point::new(bbox.west, bbox.north)) / 1000.0;
    if !(x_distance_km > 0.0) || !(y_distance_km > 0.0) {
        return Err(GeometryError::DegenerateBounds(*bbox));
    }

    let x_fraction = cell_size_km / x_distance_km;
    let y_fraction = cell_size_km / y_distance_km;
    let cell_width = x_fraction * bbox.width();
    let cell_height = y_fraction * bbox.height();

    let x_cells = (1.0 / x_fraction - CELL_COUNT_EPSILON).ceil().max(1.0) as u64;
    let y_cells = (1.0 / y_fraction - CELL_COUNT_EPSILON).ceil().max(1.0) as u64;
    let total = x_cells.saturating_mul(y_cells);
    if total > MAX_GRID_CELLS {
        return Err(GeometryError::TooManyCells {
            cells: total,
            limit: MAX_GRID_CELLS,
        });
    }

    let clipped = area_limit.is_some() || offshore_limit.is_some();
    let mut cells = Vec::new();

    for i in 0..x_cells {
        for j in 0..y_cells {
            let min_lon = bbox.west + i as f64 * cell_width;
            let min_lat = bbox.south + j as f64 * cell_height;
            let max_lon = min_lon + cell_width;
            let max_lat = min_lat + cell_height;

            if clipped {
                let center = Point::new(
                    normalize_longitude((min_lon + max_lon) / 2.0),
                    (min_lat + max_lat) / 2.0,
                );
                let offshore = offshore_limit.is_some_and(|limit| point_in_zone(&center, limit));
                let onshore = area_limit.is_some_and(|limit| point_in_zone(&center, limit));
                if !offshore && !onshore {
                    continue;
                }
            }

            let id = cells.len() as u64;
            cells.push(ZonePolygon::new(
                id,
                ZoneGeometry::Polygon(polygon![
                    (x: min_lon, y: min_lat),
                    (x: max_lon, y: min_lat),
                    (x: max_lon, y: max_lat),
                    (x: min_lon, y: max_lat),
                    (x: min_lon, y: min_lat),
                ]),
            ));
        }
    }

    log::debug!(
        "Built grid of {}x{} cells over {}, kept {}",
        x_cells,
        y_cells,
        bbox,
        cells.len()
    );
    Ok(cells)
}

#[cfg(test)]
#[path = "grid_tests.rs"]
mod grid_tests;
