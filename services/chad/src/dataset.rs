//! JSON dataset source.
//!
//! A dataset file holds the coordinate vectors and any number of named
//! `[time, lat, lon]` arrays flattened row-major (longitude fastest):
//!
//! ```json
//! {
//!   "epoch": "1998-01-01T12:00:00Z",
//!   "time_units": "hours",
//!   "time": [0, 3, 6],
//!   "lat": [-25.0, -24.75],
//!   "lon": [-160.0, -159.75],
//!   "fill_value": -9999.0,
//!   "variables": { "prectot": [0.0, null, ...], "rr": [...] }
//! }
//! ```
//!
//! `null`, the fill value and non-finite numbers all load as missing.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use clickhist::{
    BoundingBox, ClickHistError, ClickHistResult, CoordinateGrid, DataSource, Field3D, GridShape,
    TimeAxis, TimeUnits, VariableMetadata, VariablePair,
};
use clickhist_common::time::parse_iso8601;

use crate::config_loader::DatasetSettings;

/// Epoch of the 3-hourly precipitation products.
pub const DEFAULT_EPOCH: &str = "1998-01-01T12:00:00Z";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetFile {
    #[serde(default)]
    pub epoch: Option<String>,
    #[serde(default)]
    pub time_units: Option<String>,
    pub time: Vec<f64>,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    #[serde(default)]
    pub fill_value: Option<f64>,
    pub variables: HashMap<String, Vec<Option<f64>>>,
}

/// Reads both variables of a session from a JSON dataset file.
#[derive(Debug, Clone)]
pub struct JsonDatasetSource {
    settings: DatasetSettings,
    x: VariableMetadata,
    y: VariableMetadata,
}

impl JsonDatasetSource {
    pub fn new(settings: DatasetSettings, x: VariableMetadata, y: VariableMetadata) -> Self {
        Self { settings, x, y }
    }

    pub fn settings(&self) -> &DatasetSettings {
        &self.settings
    }

    /// Read and parse the whole file.
    pub async fn read(&self) -> ClickHistResult<DatasetFile> {
        let path = &self.settings.path;
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            ClickHistError::DataReadError(format!("Failed to read {:?}: {}", path, e))
        })?;
        let file: DatasetFile = serde_json::from_str(&text)?;
        debug!(
            path = %path.display(),
            variables = file.variables.len(),
            "Parsed dataset"
        );
        Ok(file)
    }

    /// Build the full pair (every time step, every grid point) from a
    /// parsed file, applying multipliers and missing-value rules.
    pub fn build_pair(&self, file: &DatasetFile) -> ClickHistResult<VariablePair> {
        let epoch = self.epoch(file)?;
        let units = self.time_units(file)?;
        let fill = self.settings.fill_value.or(file.fill_value);

        let time = TimeAxis::new(epoch, units, file.time.clone())?;
        let grid = CoordinateGrid::new(time, file.lat.clone(), file.lon.clone())?;
        let shape = grid.shape();

        let x = load_field(file, &self.x, shape, fill)?;
        let y = load_field(file, &self.y, shape, fill)?;
        VariablePair::new(grid, x, y)
    }

    fn epoch(&self, file: &DatasetFile) -> ClickHistResult<DateTime<Utc>> {
        match (self.settings.epoch, file.epoch.as_deref()) {
            (Some(epoch), _) => Ok(epoch),
            (None, Some(s)) => parse_iso8601(s),
            (None, None) => parse_iso8601(DEFAULT_EPOCH),
        }
    }

    fn time_units(&self, file: &DatasetFile) -> ClickHistResult<TimeUnits> {
        match (self.settings.time_units, file.time_units.as_deref()) {
            (Some(units), _) => Ok(units),
            (None, Some(s)) => TimeUnits::parse(s)
                .ok_or_else(|| ClickHistError::InvalidTime(format!("unknown time units '{}'", s))),
            (None, None) => Ok(TimeUnits::default()),
        }
    }
}

fn load_field(
    file: &DatasetFile,
    meta: &VariableMetadata,
    shape: GridShape,
    fill: Option<f64>,
) -> ClickHistResult<Field3D> {
    let raw = file.variables.get(&meta.value_name).ok_or_else(|| {
        let mut available: Vec<&str> = file.variables.keys().map(String::as_str).collect();
        available.sort_unstable();
        ClickHistError::DataReadError(format!(
            "variable '{}' ({}) not in dataset; available: {:?}",
            meta.value_name, meta.id, available
        ))
    })?;

    let values: Vec<f64> = raw
        .iter()
        .map(|v| match (*v, fill) {
            (Some(v), Some(fill)) if v == fill => f64::NAN,
            (Some(v), _) => v,
            (None, _) => f64::NAN,
        })
        .collect();

    Ok(Field3D::new(meta.id.clone(), shape, values)?.scaled(meta.multiplier))
}

#[async_trait]
impl DataSource for JsonDatasetSource {
    #[instrument(skip(self), fields(path = %self.settings.path.display()))]
    async fn fetch_window(&self, bounds: &BoundingBox) -> ClickHistResult<VariablePair> {
        bounds.validate()?;
        let file = self.read().await?;
        let full = self.build_pair(&file)?;
        let pair = full.subset(bounds)?;

        info!(
            x = %self.x.id,
            y = %self.y.id,
            full_shape = ?full.shape().as_array(),
            shape = ?pair.shape().as_array(),
            x_valid = pair.x.valid_count(),
            y_valid = pair.y.valid_count(),
            "Loaded dataset window"
        );
        Ok(pair)
    }
}
