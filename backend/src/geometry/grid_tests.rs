use super::*;
use crate::models::ZoneId;
use geo::{BoundingRect, Centroid};

/// Great-circle length of the southern edge of `bbox` in km.
fn southern_edge_km(bbox: &Bounds) -> f64 {
    Point::new(bbox.west, bbox.south).haversine_distance(&Point::new(bbox.east, bbox.south)) / 1000.0
}

fn ten_by_ten() -> Bounds {
    Bounds::new(0.0, 0.0, 10.0, 10.0)
}

fn strip(west: f64, east: f64) -> ZoneGeometry {
    ZoneGeometry::Polygon(polygon![
        (x: west, y: 0.0),
        (x: east, y: 0.0),
        (x: east, y: 10.0),
        (x: west, y: 10.0),
        (x: west, y: 0.0),
    ])
}

fn center_x(zone: &ZonePolygon) -> f64 {
    match &zone.geometry {
        ZoneGeometry::Polygon(p) => p.centroid().map(|c| c.x()).unwrap_or(f64::NAN),
        ZoneGeometry::MultiPolygon(_) => f64::NAN,
    }
}

#[test]
fn test_even_division_emits_every_cell() {
    let bbox = ten_by_ten();
    let cell_km = southern_edge_km(&bbox) / 5.0;

    let cells = build_grid(&bbox, cell_km, None, None).unwrap();

    assert_eq!(cells.len(), 25);
    for (i, cell) in cells.iter().enumerate() {
        assert_eq!(cell.id, ZoneId::Index(i as u64));
        let rect = cell.geometry.bounding_rect().unwrap();
        assert!(
            bbox.contains(&Bounds::from(rect), 1e-9),
            "cell {} escapes bbox: {:?}",
            i,
            rect
        );
    }
}

#[test]
fn test_traversal_is_column_major() {
    let bbox = ten_by_ten();
    let cell_km = southern_edge_km(&bbox) / 5.0;
    let cells = build_grid(&bbox, cell_km, None, None).unwrap();

    let first = cells[0].geometry.bounding_rect().unwrap();
    let second = cells[1].geometry.bounding_rect().unwrap();
    let sixth = cells[5].geometry.bounding_rect().unwrap();

    assert!((first.min().x - second.min().x).abs() < 1e-9);
    assert!(second.min().y > first.min().y);
    assert!(sixth.min().x > first.min().x);
    assert!((sixth.min().y - first.min().y).abs() < 1e-9);
}

#[test]
fn test_area_limit_keeps_covered_half() {
    let bbox = ten_by_ten();
    let cell_km = southern_edge_km(&bbox) / 10.0;
    let left_half = strip(0.0, 5.0);

    let cells = build_grid(&bbox, cell_km, Some(&left_half), None).unwrap();

    assert_eq!(cells.len(), 50);
    assert!(cells.iter().all(|c| center_x(c) < 5.0));
    let ids: Vec<_> = cells.iter().map(|c| c.id.clone()).collect();
    let expected: Vec<_> = (0..50u64).map(ZoneId::Index).collect();
    assert_eq!(ids, expected);
}

#[test]
fn test_offshore_limit_or_area_limit() {
    let bbox = ten_by_ten();
    let cell_km = southern_edge_km(&bbox) / 10.0;
    let land = strip(0.0, 5.0);
    let sea = strip(8.0, 10.0);

    let cells = build_grid(&bbox, cell_km, Some(&land), Some(&sea)).unwrap();
    assert_eq!(cells.len(), 70);

    let offshore_only = build_grid(&bbox, cell_km, None, Some(&sea)).unwrap();
    assert_eq!(offshore_only.len(), 20);
    assert!(offshore_only.iter().all(|c| center_x(c) > 8.0));
}

#[test]
fn test_uneven_division_rounds_up() {
    let bbox = ten_by_ten();
    let cell_km = southern_edge_km(&bbox) / 4.5;
    let cells = build_grid(&bbox, cell_km, None, None).unwrap();
    assert_eq!(cells.len(), 25);
}

#[test]
fn test_centers_are_normalized_before_containment() {
    // Cells east of the antimeridian are tested at their wrapped longitude.
    let bbox = Bounds::new(170.0, 0.0, 190.0, 10.0);
    let cell_km = southern_edge_km(&bbox) / 2.0;
    let wrapped = ZoneGeometry::Polygon(polygon![
        (x: -180.0, y: 0.0),
        (x: -160.0, y: 0.0),
        (x: -160.0, y: 10.0),
        (x: -180.0, y: 10.0),
        (x: -180.0, y: 0.0),
    ]);

    let cells = build_grid(&bbox, cell_km, Some(&wrapped), None).unwrap();
    assert!(!cells.is_empty());
    assert!(cells.iter().all(|c| center_x(c) > 180.0));
}

#[test]
fn test_invalid_inputs() {
    let bbox = ten_by_ten();
    assert_eq!(
        build_grid(&bbox, 0.0, None, None),
        Err(GeometryError::InvalidCellSize(0.0))
    );
    assert!(build_grid(&bbox, -5.0, None, None).is_err());

    let flat = Bounds::new(0.0, 0.0, 10.0, 0.0);
    assert_eq!(
        build_grid(&flat, 10.0, None, None),
        Err(GeometryError::DegenerateBounds(flat))
    );

    assert!(matches!(
        build_grid(&bbox, 0.1, None, None),
        Err(GeometryError::TooManyCells { .. })
    ));
}
