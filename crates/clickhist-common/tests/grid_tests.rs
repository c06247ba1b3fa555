//! Tests for flat index arithmetic and coordinate resolution.

use chrono::{Duration, TimeZone, Utc};
use clickhist_common::grid::nearest_index;
use clickhist_common::{
    nearest_index_range, BoundingBox, CoordinateGrid, GridIndex, GridShape, TimeAxis, TimeUnits,
};

fn sample_grid() -> CoordinateGrid {
    let epoch = Utc.with_ymd_and_hms(1998, 1, 1, 12, 0, 0).unwrap();
    let time = TimeAxis::new(epoch, TimeUnits::Hours, vec![0.0, 3.0, 6.0, 9.0]).unwrap();
    let lat = vec![-25.0, -23.0, -21.0];
    let lon = vec![-160.0, -157.5, -155.0, -152.5, -150.0];
    CoordinateGrid::new(time, lat, lon).unwrap()
}

// ============================================================================
// Flatten / unflatten
// ============================================================================

#[test]
fn test_round_trip_every_index() {
    let shape = GridShape::new(4, 3, 5);
    for flat in 0..shape.len() {
        let idx = shape.unflatten(flat).unwrap();
        assert_eq!(shape.flatten(idx), Some(flat));
    }
}

#[test]
fn test_round_trip_from_triples() {
    let shape = GridShape::new(3, 7, 2);
    for t in 0..3 {
        for la in 0..7 {
            for lo in 0..2 {
                let idx = GridIndex::new(t, la, lo);
                let flat = shape.flatten(idx).unwrap();
                assert_eq!(shape.unflatten(flat), Some(idx));
            }
        }
    }
}

#[test]
fn test_unflatten_out_of_range() {
    let shape = GridShape::new(4, 3, 5);
    assert!(shape.unflatten(shape.len()).is_none());
    assert!(shape.unflatten(usize::MAX).is_none());
}

#[test]
fn test_empty_shape() {
    let shape = GridShape::new(0, 3, 5);
    assert!(shape.is_empty());
    assert!(shape.unflatten(0).is_none());
}

// ============================================================================
// Coordinate resolution
// ============================================================================

#[test]
fn test_resolve_last_sample() {
    let grid = sample_grid();
    let last = grid.shape().len() - 1;
    let point = grid.resolve(last).unwrap();
    assert_eq!(point.index, GridIndex::new(3, 2, 4));
    assert_eq!(point.lat, -21.0);
    assert_eq!(point.lon, -150.0);
    assert_eq!(
        point.datetime,
        Utc.with_ymd_and_hms(1998, 1, 1, 12, 0, 0).unwrap() + Duration::hours(9)
    );
}

#[test]
fn test_resolve_rejects_out_of_range() {
    let grid = sample_grid();
    assert!(grid.resolve(grid.shape().len()).is_none());
}

#[test]
fn test_empty_axis_rejected() {
    let epoch = Utc.with_ymd_and_hms(1998, 1, 1, 12, 0, 0).unwrap();
    let time = TimeAxis::new(epoch, TimeUnits::Hours, vec![0.0]).unwrap();
    assert!(CoordinateGrid::new(time, vec![], vec![1.0]).is_err());
}

// ============================================================================
// Nearest-index subsetting
// ============================================================================

#[test]
fn test_nearest_index_ties_pick_first() {
    assert_eq!(nearest_index(&[0.0, 2.0, 4.0], 1.0), Some(0));
}

#[test]
fn test_nearest_index_range_ascending() {
    let lons: Vec<f64> = (0..144).map(|i| i as f64 * 2.5).collect();
    // -160 E expressed as 200 E in a 0..360 dataset
    assert_eq!(nearest_index_range(&lons, 200.0, 240.0), Some((80, 96)));
}

#[test]
fn test_nearest_index_range_swapped_bounds() {
    let lats = [-10.0, -5.0, 0.0, 5.0, 10.0];
    assert_eq!(nearest_index_range(&lats, 6.0, -6.0), Some((1, 3)));
}

#[test]
fn test_bbox_contains_resolved_point() {
    let grid = sample_grid();
    let bbox = BoundingBox::new(-160.0, -25.0, -150.0, -21.0);
    for flat in 0..grid.shape().len() {
        let p = grid.resolve(flat).unwrap();
        assert!(bbox.contains_point(p.lon, p.lat));
    }
}
