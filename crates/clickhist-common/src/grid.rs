//! Grid shapes, flat indices and coordinate lookup for `[time, lat, lon]` data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClickHistError, ClickHistResult};
use crate::time::TimeAxis;

/// Position of one sample in the row-major flattening of `[time, lat, lon]`.
pub type FlatIndex = usize;

/// Shape of a `[time, lat, lon]` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    pub n_time: usize,
    pub n_lat: usize,
    pub n_lon: usize,
}

impl GridShape {
    pub fn new(n_time: usize, n_lat: usize, n_lon: usize) -> Self {
        Self {
            n_time,
            n_lat,
            n_lon,
        }
    }

    /// Total number of samples.
    pub fn len(&self) -> usize {
        self.n_time * self.n_lat * self.n_lon
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_array(&self) -> [usize; 3] {
        [self.n_time, self.n_lat, self.n_lon]
    }

    /// Row-major flat index for a triple, `None` when any axis is out of range.
    pub fn flatten(&self, index: GridIndex) -> Option<FlatIndex> {
        if index.time >= self.n_time || index.lat >= self.n_lat || index.lon >= self.n_lon {
            return None;
        }
        Some((index.time * self.n_lat + index.lat) * self.n_lon + index.lon)
    }

    /// Inverse of [`GridShape::flatten`].
    pub fn unflatten(&self, flat: FlatIndex) -> Option<GridIndex> {
        if flat >= self.len() {
            return None;
        }
        Some(GridIndex {
            time: flat / (self.n_lon * self.n_lat),
            lat: (flat / self.n_lon) % self.n_lat,
            lon: flat % self.n_lon,
        })
    }
}

/// Array indices of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridIndex {
    pub time: usize,
    pub lat: usize,
    pub lon: usize,
}

impl GridIndex {
    pub fn new(time: usize, lat: usize, lon: usize) -> Self {
        Self { time, lat, lon }
    }
}

/// A sample resolved to real-world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub flat: FlatIndex,
    pub index: GridIndex,
    pub datetime: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
}

/// Coordinate vectors shared by both variables of a pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinateGrid {
    pub time: TimeAxis,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
}

impl CoordinateGrid {
    /// Build a coordinate grid; every axis must be non-empty and finite.
    pub fn new(time: TimeAxis, lat: Vec<f64>, lon: Vec<f64>) -> ClickHistResult<Self> {
        if time.is_empty() || lat.is_empty() || lon.is_empty() {
            return Err(ClickHistError::DataReadError(format!(
                "empty coordinate axis (time={}, lat={}, lon={})",
                time.len(),
                lat.len(),
                lon.len()
            )));
        }
        if lat.iter().chain(lon.iter()).any(|v| !v.is_finite()) {
            return Err(ClickHistError::DataReadError(
                "non-finite latitude or longitude value".to_string(),
            ));
        }
        Ok(Self { time, lat, lon })
    }

    pub fn shape(&self) -> GridShape {
        GridShape::new(self.time.len(), self.lat.len(), self.lon.len())
    }

    /// Resolve a flat index exactly to its datetime, latitude and longitude.
    pub fn resolve(&self, flat: FlatIndex) -> Option<GridPoint> {
        let index = self.shape().unflatten(flat)?;
        Some(GridPoint {
            flat,
            index,
            datetime: self.time.datetime_at(index.time)?,
            lat: self.lat[index.lat],
            lon: self.lon[index.lon],
        })
    }
}

/// Index of the coordinate value nearest to `target` (first one on ties).
pub fn nearest_index(values: &[f64], target: f64) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .fold(None, |best: Option<(usize, f64)>, (i, v)| {
            let dist = (v - target).abs();
            match best {
                Some((_, best_dist)) if best_dist <= dist => best,
                _ => Some((i, dist)),
            }
        })
        .map(|(i, _)| i)
}

/// Inclusive index range covering `[low, high]` by nearest-neighbour lookup
/// of both ends. Works for ascending and descending coordinate vectors.
pub fn nearest_index_range(values: &[f64], low: f64, high: f64) -> Option<(usize, usize)> {
    let a = nearest_index(values, low)?;
    let b = nearest_index(values, high)?;
    Some((a.min(b), a.max(b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::TimeUnits;
    use chrono::TimeZone;

    #[test]
    fn test_flatten_row_major() {
        let shape = GridShape::new(2, 3, 4);
        assert_eq!(shape.flatten(GridIndex::new(0, 0, 1)), Some(1));
        assert_eq!(shape.flatten(GridIndex::new(0, 1, 0)), Some(4));
        assert_eq!(shape.flatten(GridIndex::new(1, 0, 0)), Some(12));
        assert_eq!(shape.flatten(GridIndex::new(1, 2, 3)), Some(23));
        assert_eq!(shape.flatten(GridIndex::new(2, 0, 0)), None);
    }

    #[test]
    fn test_unflatten_matches_formula() {
        let shape = GridShape::new(2, 3, 4);
        let idx = shape.unflatten(17).unwrap();
        assert_eq!(idx.lon, 17 % 4);
        assert_eq!(idx.lat, (17 / 4) % 3);
        assert_eq!(idx.time, 17 / 12);
        assert!(shape.unflatten(24).is_none());
    }

    #[test]
    fn test_resolve_exact_coordinates() {
        let epoch = Utc.with_ymd_and_hms(1998, 1, 1, 12, 0, 0).unwrap();
        let time = TimeAxis::new(epoch, TimeUnits::Hours, vec![0.0, 3.0]).unwrap();
        let grid = CoordinateGrid::new(time, vec![-1.0, 0.0, 1.0], vec![200.0, 202.5]).unwrap();

        let point = grid.resolve(11).unwrap();
        assert_eq!(point.index, GridIndex::new(1, 2, 1));
        assert_eq!(point.lat, 1.0);
        assert_eq!(point.lon, 202.5);
        assert_eq!(point.datetime, epoch + chrono::Duration::hours(3));
    }

    #[test]
    fn test_nearest_index_range_descending() {
        let lats = [15.0, 10.0, 5.0, 0.0, -5.0];
        assert_eq!(nearest_index_range(&lats, -4.0, 11.0), Some((1, 4)));
        assert_eq!(nearest_index_range(&[], 0.0, 1.0), None);
    }
}
