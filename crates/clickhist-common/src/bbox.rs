//! Geographic bounding boxes.

use serde::{Deserialize, Serialize};

use crate::error::{ClickHistError, ClickHistResult};

/// A lon/lat bounding box in degrees.
///
/// Longitudes are kept in whatever convention the dataset uses
/// (-180..180 or 0..360); no wrapping is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Box of half-width `lon_offset` and half-height `lat_offset` around a point.
    pub fn around(lon: f64, lat: f64, lon_offset: f64, lat_offset: f64) -> Self {
        Self {
            min_lon: lon - lon_offset,
            min_lat: lat - lat_offset,
            max_lon: lon + lon_offset,
            max_lat: lat + lat_offset,
        }
    }

    /// Parse a "minlon,minlat,maxlon,maxlat" string.
    pub fn from_bbox_string(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let parse = |p: &str| {
            p.parse::<f64>()
                .map_err(|_| BboxParseError::InvalidNumber(p.to_string()))
        };

        Ok(Self {
            min_lon: parse(parts[0])?,
            min_lat: parse(parts[1])?,
            max_lon: parse(parts[2])?,
            max_lat: parse(parts[3])?,
        })
    }

    /// Reject boxes with empty or non-finite ranges.
    pub fn validate(&self) -> ClickHistResult<()> {
        let values = [self.min_lon, self.min_lat, self.max_lon, self.max_lat];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ClickHistError::InvalidBbox(format!(
                "non-finite coordinate in {:?}",
                self
            )));
        }
        if self.min_lon >= self.max_lon {
            return Err(ClickHistError::InvalidBbox(format!(
                "empty longitude range {} to {}",
                self.min_lon, self.max_lon
            )));
        }
        if self.min_lat >= self.max_lat {
            return Err(ClickHistError::InvalidBbox(format!(
                "empty latitude range {} to {}",
                self.min_lat, self.max_lat
            )));
        }
        Ok(())
    }

    /// Width of the box in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height of the box in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Center point as (lon, lat).
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    /// Check if a point is contained within this bbox (edges inclusive).
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// Human-readable region label, e.g. "-160 to -120 E, -25 to 15 N".
    pub fn describe(&self) -> String {
        format!(
            "{} to {} E, {} to {} N",
            self.min_lon, self.max_lon, self.min_lat, self.max_lat
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid BBOX format: {0}. Expected 'minlon,minlat,maxlon,maxlat'")]
    InvalidFormat(String),

    #[error("Invalid number in BBOX: {0}")]
    InvalidNumber(String),
}

impl From<BboxParseError> for ClickHistError {
    fn from(err: BboxParseError) -> Self {
        ClickHistError::InvalidBbox(err.to_string())
    }
}
