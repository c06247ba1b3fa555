//! Variable descriptions and built-in presets.

use serde::{Deserialize, Serialize};

/// Precipitation bin edges shared by the built-in presets, in mm/day.
pub const PRECIP_EDGES: [f64; 13] = [
    0.0, 1.0, 11.0, 21.0, 31.0, 41.0, 51.0, 61.0, 71.0, 81.0, 91.0, 101.0, 250.0,
];

/// How a variable is named, stored and displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableMetadata {
    /// Identifier shown to the user, e.g. `Precip_TRMM`.
    pub id: String,
    /// Name of the array in the source dataset, e.g. `rr`.
    pub value_name: String,
    #[serde(default)]
    pub units: String,
    /// Decimal places used when printing values.
    #[serde(default)]
    pub precision: usize,
    /// Factor applied to raw values at load (unit conversion).
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

impl VariableMetadata {
    /// Format a value with this variable's precision.
    pub fn format_value(&self, value: f64) -> String {
        if value.is_finite() {
            format!("{:.*}", self.precision, value)
        } else {
            "--".to_string()
        }
    }

    /// Format a value followed by the units, if any.
    pub fn format_with_units(&self, value: f64) -> String {
        if self.units.is_empty() {
            self.format_value(value)
        } else {
            format!("{} {}", self.format_value(value), self.units)
        }
    }
}

/// A variable plus the bin edges used for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    #[serde(flatten)]
    pub metadata: VariableMetadata,
    pub edges: Vec<f64>,
}

impl VariableSpec {
    /// Identifiers with a built-in preset.
    pub const PRESETS: [&'static str; 2] = ["Precip_MERRA", "Precip_TRMM"];

    /// Built-in description of a known dataset variable.
    pub fn preset(id: &str) -> Option<Self> {
        let (value_name, multiplier) = match id {
            // kg m-2 s-1 -> mm/day
            "Precip_MERRA" => ("prectot", 86400.0),
            // mm/hr -> mm/day
            "Precip_TRMM" => ("rr", 24.0),
            _ => return None,
        };
        Some(Self {
            metadata: VariableMetadata {
                id: id.to_string(),
                value_name: value_name.to_string(),
                units: "mm day-1".to_string(),
                precision: 0,
                multiplier,
            },
            edges: PRECIP_EDGES.to_vec(),
        })
    }
}
