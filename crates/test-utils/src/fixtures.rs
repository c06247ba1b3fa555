//! Common fixtures: epochs, regions, bin edges and grid layouts.

/// Reference times.
pub mod time {
    use chrono::{DateTime, TimeZone, Utc};

    /// Epoch of the 3-hourly precipitation datasets ("hours since").
    pub const EPOCH: &str = "1998-01-01T12:00:00Z";

    /// Default case half-window: 73 hours.
    pub const DT_FROM_CENTER_SECS: u64 = 73 * 3600;

    pub fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(1998, 1, 1, 12, 0, 0)
            .single()
            .expect("valid epoch")
    }
}

/// Regions as `(min_lon, min_lat, max_lon, max_lat)`.
pub mod regions {
    use clickhist_common::BoundingBox;

    pub const CENTRAL_PACIFIC: (f64, f64, f64, f64) = (-160.0, -25.0, -120.0, 15.0);

    /// min > max on both axes
    pub const INVERTED: (f64, f64, f64, f64) = (-120.0, 15.0, -160.0, -25.0);

    pub fn bbox(region: (f64, f64, f64, f64)) -> BoundingBox {
        BoundingBox::new(region.0, region.1, region.2, region.3)
    }
}

/// Bin edges used across the suite.
pub mod edges {
    /// Three bins with the usual precipitation boundaries.
    pub const SMALL: [f64; 4] = [0.0, 1.0, 11.0, 21.0];

    /// Full precipitation edges, mm/day.
    pub const PRECIP: [f64; 13] = [
        0.0, 1.0, 11.0, 21.0, 31.0, 41.0, 51.0, 61.0, 71.0, 81.0, 91.0, 101.0, 250.0,
    ];

    pub const NOT_INCREASING: [f64; 3] = [0.0, 5.0, 5.0];
}

/// Regular grid layouts.
pub mod grid {
    use clickhist_common::{CoordinateGrid, GridShape, TimeAxis, TimeUnits};

    /// Tiny grid for hand-checked index arithmetic.
    pub const TINY: GridSpec = GridSpec {
        n_time: 2,
        time_step_hours: 3.0,
        lat_start: -10.0,
        lat_step: 10.0,
        n_lat: 3,
        lon_start: 100.0,
        lon_step: 10.0,
        n_lon: 4,
    };

    /// 5-degree grid over the central Pacific, one day at 3-hourly steps.
    pub const CENTRAL_PACIFIC: GridSpec = GridSpec {
        n_time: 8,
        time_step_hours: 3.0,
        lat_start: -25.0,
        lat_step: 5.0,
        n_lat: 9,
        lon_start: -160.0,
        lon_step: 5.0,
        n_lon: 9,
    };

    /// A regular `[time, lat, lon]` layout.
    #[derive(Debug, Clone, Copy)]
    pub struct GridSpec {
        pub n_time: usize,
        pub time_step_hours: f64,
        pub lat_start: f64,
        pub lat_step: f64,
        pub n_lat: usize,
        pub lon_start: f64,
        pub lon_step: f64,
        pub n_lon: usize,
    }

    impl GridSpec {
        pub fn shape(&self) -> GridShape {
            GridShape::new(self.n_time, self.n_lat, self.n_lon)
        }

        pub fn len(&self) -> usize {
            self.n_time * self.n_lat * self.n_lon
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        /// Time offsets in hours since [`super::time::EPOCH`].
        pub fn hours(&self) -> Vec<f64> {
            (0..self.n_time)
                .map(|t| t as f64 * self.time_step_hours)
                .collect()
        }

        pub fn lats(&self) -> Vec<f64> {
            (0..self.n_lat)
                .map(|i| self.lat_start + i as f64 * self.lat_step)
                .collect()
        }

        pub fn lons(&self) -> Vec<f64> {
            (0..self.n_lon)
                .map(|i| self.lon_start + i as f64 * self.lon_step)
                .collect()
        }

        pub fn coordinate_grid(&self) -> CoordinateGrid {
            let time = TimeAxis::new(super::time::epoch(), TimeUnits::Hours, self.hours())
                .expect("valid time axis");
            CoordinateGrid::new(time, self.lats(), self.lons()).expect("valid grid")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_spec_len() {
        assert_eq!(grid::TINY.len(), 24);
        assert_eq!(grid::CENTRAL_PACIFIC.shape().as_array(), [8, 9, 9]);
    }

    #[test]
    fn test_grid_spec_coordinates() {
        let lons = grid::CENTRAL_PACIFIC.lons();
        assert_eq!(lons.first(), Some(&-160.0));
        assert_eq!(lons.last(), Some(&-120.0));
        let lats = grid::CENTRAL_PACIFIC.lats();
        assert_eq!(lats.last(), Some(&15.0));
    }

    #[test]
    fn test_central_pacific_covers_grid() {
        let bbox = regions::bbox(regions::CENTRAL_PACIFIC);
        assert!(bbox.validate().is_ok());
        assert!(regions::bbox(regions::INVERTED).validate().is_err());
    }
}
