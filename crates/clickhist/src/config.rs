//! Startup configuration for an exploration session.

use serde::{Deserialize, Serialize};

use clickhist_common::{BoundingBox, ClickHistError, ClickHistResult};

use crate::histogram::BinEdges;
use crate::recorder::{WindowConfig, DEFAULT_ARTIFACT_TIMEOUT_SECS};
use crate::variables::VariableSpec;

/// Default cap on points drawn for one bin.
pub const DEFAULT_MAX_PLOTTED_IN_BIN: usize = 1000;

/// Default overlay percentiles.
pub const DEFAULT_QUANTILES: [f64; 8] = [0.01, 0.1, 1.0, 5.0, 95.0, 99.0, 99.9, 99.99];

/// Everything the engine needs before a session starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickHistConfig {
    /// Region to explore.
    pub bounds: BoundingBox,

    /// Variable on the horizontal axis.
    pub x: VariableSpec,

    /// Variable on the vertical axis.
    pub y: VariableSpec,

    /// Maximum number of points drawn for one bin.
    #[serde(default = "default_max_plotted")]
    pub max_plotted_in_bin: usize,

    /// Overlay percentiles (0-100).
    #[serde(default = "default_quantiles")]
    pub quantiles: Vec<f64>,

    /// Case window size.
    #[serde(default)]
    pub window: WindowConfig,

    /// Seed for bin sampling; unset draws from OS entropy.
    #[serde(default)]
    pub sample_seed: Option<u64>,

    /// Timeout for one artifact emission, in seconds.
    #[serde(default = "default_artifact_timeout")]
    pub artifact_timeout_secs: u64,
}

fn default_max_plotted() -> usize {
    DEFAULT_MAX_PLOTTED_IN_BIN
}

fn default_quantiles() -> Vec<f64> {
    DEFAULT_QUANTILES.to_vec()
}

fn default_artifact_timeout() -> u64 {
    DEFAULT_ARTIFACT_TIMEOUT_SECS
}

impl ClickHistConfig {
    /// Config for two variables with every other setting at its default.
    pub fn new(bounds: BoundingBox, x: VariableSpec, y: VariableSpec) -> Self {
        Self {
            bounds,
            x,
            y,
            max_plotted_in_bin: DEFAULT_MAX_PLOTTED_IN_BIN,
            quantiles: default_quantiles(),
            window: WindowConfig::default(),
            sample_seed: None,
            artifact_timeout_secs: DEFAULT_ARTIFACT_TIMEOUT_SECS,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ClickHistResult<()> {
        self.bounds.validate()?;

        BinEdges::new(&self.x.metadata.id, self.x.edges.clone())?;
        BinEdges::new(&self.y.metadata.id, self.y.edges.clone())?;

        for spec in [&self.x, &self.y] {
            if spec.metadata.value_name.is_empty() {
                return Err(ClickHistError::invalid_config(format!(
                    "variable '{}' has an empty value_name",
                    spec.metadata.id
                )));
            }
            if !spec.metadata.multiplier.is_finite() || spec.metadata.multiplier == 0.0 {
                return Err(ClickHistError::invalid_config(format!(
                    "variable '{}' multiplier must be finite and non-zero",
                    spec.metadata.id
                )));
            }
        }

        if self.max_plotted_in_bin == 0 {
            return Err(ClickHistError::invalid_config(
                "max_plotted_in_bin must be > 0",
            ));
        }

        if let Some(q) = self
            .quantiles
            .iter()
            .find(|q| !(0.0..=100.0).contains(*q))
        {
            return Err(ClickHistError::invalid_config(format!(
                "quantile {} outside 0-100",
                q
            )));
        }

        self.window.validate()?;

        if self.artifact_timeout_secs == 0 {
            return Err(ClickHistError::invalid_config(
                "artifact_timeout_secs must be > 0",
            ));
        }

        Ok(())
    }

    /// Session label, e.g. "Precip_MERRA vs Precip_TRMM: -160 to -120 E, -25 to 15 N".
    pub fn metadata_label(&self) -> String {
        format!(
            "{} vs {}: {}",
            self.x.metadata.id,
            self.y.metadata.id,
            self.bounds.describe()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClickHistConfig {
        ClickHistConfig::new(
            BoundingBox::new(-160.0, -25.0, -120.0, 15.0),
            VariableSpec::preset("Precip_MERRA").unwrap(),
            VariableSpec::preset("Precip_TRMM").unwrap(),
        )
    }

    #[test]
    fn test_default_config_valid() {
        let config = config();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_plotted_in_bin, 1000);
        assert_eq!(config.window.dt_from_center_secs, 262_800);
    }

    #[test]
    fn test_metadata_label() {
        assert_eq!(
            config().metadata_label(),
            "Precip_MERRA vs Precip_TRMM: -160 to -120 E, -25 to 15 N"
        );
    }

    #[test]
    fn test_invalid_edges_rejected() {
        let mut config = config();
        config.y.edges = vec![0.0, 5.0, 5.0];
        assert!(matches!(
            config.validate(),
            Err(ClickHistError::InvalidEdges { .. })
        ));
    }

    #[test]
    fn test_empty_bounds_rejected() {
        let mut config = config();
        config.bounds = BoundingBox::new(-120.0, -25.0, -160.0, 15.0);
        assert!(matches!(config.validate(), Err(ClickHistError::InvalidBbox(_))));
    }

    #[test]
    fn test_bad_quantile_rejected() {
        let mut config = config();
        config.quantiles.push(101.0);
        assert!(matches!(config.validate(), Err(ClickHistError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_cap_rejected() {
        let mut config = config();
        config.max_plotted_in_bin = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: ClickHistConfig = serde_json::from_value(serde_json::json!({
            "bounds": { "min_lon": -160.0, "min_lat": -25.0, "max_lon": -120.0, "max_lat": 15.0 },
            "x": { "id": "a", "value_name": "a", "edges": [0.0, 1.0] },
            "y": { "id": "b", "value_name": "b", "edges": [0.0, 1.0] }
        }))
        .unwrap();
        assert_eq!(config.quantiles, DEFAULT_QUANTILES.to_vec());
        assert_eq!(config.x.metadata.multiplier, 1.0);
        assert!(config.sample_seed.is_none());
        assert!(config.validate().is_ok());
    }
}
