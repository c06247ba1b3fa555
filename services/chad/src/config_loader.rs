//! Session configuration loader.
//!
//! A session file describes one exploration: the dataset, the region, the
//! two variables (by preset, with optional overrides), sampling and window
//! settings, and the bundle templates to fill for each case.
//!
//! Supports environment variable substitution using `${VAR}` and
//! `${VAR:-default}` syntax, and `~` in paths.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clickhist::config::{DEFAULT_MAX_PLOTTED_IN_BIN, DEFAULT_QUANTILES};
use clickhist::recorder::{DEFAULT_ARTIFACT_TIMEOUT_SECS, DEFAULT_DT_FROM_CENTER_SECS};
use clickhist::{
    BoundingBox, ClickHistConfig, TimeUnits, VariableMetadata, VariableSpec, WindowConfig,
};
use clickhist_common::time::parse_iso8601;

// ============================================================================
// Session file (session.yaml)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFile {
    pub session: SessionSection,
    pub dataset: DatasetSection,
    pub bounds: BoundsSection,
    pub x: VariableEntry,
    pub y: VariableEntry,
    #[serde(default)]
    pub sampling: SamplingSection,
    #[serde(default)]
    pub quantiles: Option<Vec<f64>>,
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub artifacts: ArtifactsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSection {
    /// Names the notebook and prefixes every output file.
    pub tag: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_output_dir() -> String {
    "./cases".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSection {
    pub path: String,
    /// Overrides the dataset's own epoch.
    pub epoch: Option<String>,
    /// Overrides the dataset's own time units.
    pub time_units: Option<String>,
    /// Overrides the dataset's own fill value.
    pub fill_value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundsSection {
    pub lon_low: f64,
    pub lon_high: f64,
    pub lat_low: f64,
    pub lat_high: f64,
}

/// A variable given by preset id, by full description, or a preset with
/// some fields overridden.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariableEntry {
    pub preset: Option<String>,
    pub id: Option<String>,
    pub value_name: Option<String>,
    pub units: Option<String>,
    pub precision: Option<usize>,
    pub multiplier: Option<f64>,
    pub edges: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SamplingSection {
    pub max_plotted_in_bin: Option<usize>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowSection {
    pub lon_offset: Option<f64>,
    pub lat_offset: Option<f64>,
    pub dt_from_center_hours: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactsSection {
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub templates: Vec<TemplateEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateEntry {
    pub path: String,
    pub tag: String,
}

// ============================================================================
// Resolved session
// ============================================================================

/// Where and how to read the dataset.
#[derive(Debug, Clone)]
pub struct DatasetSettings {
    pub path: PathBuf,
    pub epoch: Option<DateTime<Utc>>,
    pub time_units: Option<TimeUnits>,
    pub fill_value: Option<f64>,
}

/// A bundle template and the tag used in its output file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleTemplate {
    pub path: PathBuf,
    pub tag: String,
}

/// Everything the binary needs to run a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub tag: String,
    pub output_dir: PathBuf,
    pub dataset: DatasetSettings,
    pub templates: Vec<BundleTemplate>,
    pub engine: ClickHistConfig,
}

/// Load, expand and validate a session file.
///
/// Relative paths inside the file are resolved against the file's directory.
pub fn load_session_config<P: AsRef<Path>>(path: P) -> Result<SessionSettings> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read session config from {:?}", path))?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_session_config(&content, base_dir)
        .with_context(|| format!("Invalid session config {:?}", path))
}

/// Parse session YAML already in memory.
pub fn parse_session_config(content: &str, base_dir: &Path) -> Result<SessionSettings> {
    let expanded = expand_env_vars(content)?;
    let file: SessionFile =
        serde_yaml::from_str(&expanded).context("Failed to parse session config YAML")?;

    validate_session_file(&file)?;
    file.resolve(base_dir)
}

impl SessionFile {
    /// Turn the file into runtime settings.
    pub fn resolve(&self, base_dir: &Path) -> Result<SessionSettings> {
        let bounds = BoundingBox::new(
            self.bounds.lon_low,
            self.bounds.lat_low,
            self.bounds.lon_high,
            self.bounds.lat_high,
        );

        let defaults = WindowConfig::default();
        let dt_from_center_secs = match self.window.dt_from_center_hours {
            Some(hours) => hours.checked_mul(3600).with_context(|| {
                format!("window.dt_from_center_hours is too large: {}", hours)
            })?,
            None => DEFAULT_DT_FROM_CENTER_SECS,
        };
        let window = WindowConfig {
            lon_offset: self.window.lon_offset.unwrap_or(defaults.lon_offset),
            lat_offset: self.window.lat_offset.unwrap_or(defaults.lat_offset),
            dt_from_center_secs,
        };

        let mut engine = ClickHistConfig::new(
            bounds,
            self.x.resolve("x").context("Invalid x variable")?,
            self.y.resolve("y").context("Invalid y variable")?,
        );
        engine.max_plotted_in_bin = self
            .sampling
            .max_plotted_in_bin
            .unwrap_or(DEFAULT_MAX_PLOTTED_IN_BIN);
        engine.sample_seed = self.sampling.seed;
        engine.quantiles = self
            .quantiles
            .clone()
            .unwrap_or_else(|| DEFAULT_QUANTILES.to_vec());
        engine.window = window;
        engine.artifact_timeout_secs = self
            .artifacts
            .timeout_secs
            .unwrap_or(DEFAULT_ARTIFACT_TIMEOUT_SECS);

        engine
            .validate()
            .context("Session settings rejected by the histogram engine")?;

        let epoch = self
            .dataset
            .epoch
            .as_deref()
            .map(parse_iso8601)
            .transpose()
            .context("Invalid dataset.epoch")?;
        let time_units = match self.dataset.time_units.as_deref() {
            Some(s) => Some(
                TimeUnits::parse(s)
                    .with_context(|| format!("Invalid dataset.time_units: {}", s))?,
            ),
            None => None,
        };

        let templates = self
            .artifacts
            .templates
            .iter()
            .map(|t| {
                Ok(BundleTemplate {
                    path: resolve_path(&t.path, base_dir)?,
                    tag: t.tag.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SessionSettings {
            tag: self.session.tag.clone(),
            output_dir: resolve_path(&self.session.output_dir, base_dir)?,
            dataset: DatasetSettings {
                path: resolve_path(&self.dataset.path, base_dir)?,
                epoch,
                time_units,
                fill_value: self.dataset.fill_value,
            },
            templates,
            engine,
        })
    }
}

impl VariableEntry {
    /// Start from the preset (if any) and apply the overrides.
    pub fn resolve(&self, axis: &str) -> Result<VariableSpec> {
        let base = match &self.preset {
            Some(id) => Some(VariableSpec::preset(id).with_context(|| {
                format!(
                    "Unknown preset '{}' for {}. Known presets: {:?}",
                    id,
                    axis,
                    VariableSpec::PRESETS
                )
            })?),
            None => None,
        };

        let (id, value_name, edges) = match &base {
            Some(spec) => (
                self.id.clone().unwrap_or_else(|| spec.metadata.id.clone()),
                self.value_name
                    .clone()
                    .unwrap_or_else(|| spec.metadata.value_name.clone()),
                self.edges.clone().unwrap_or_else(|| spec.edges.clone()),
            ),
            None => (
                self.id
                    .clone()
                    .with_context(|| format!("{}: id required without a preset", axis))?,
                self.value_name
                    .clone()
                    .with_context(|| format!("{}: value_name required without a preset", axis))?,
                self.edges
                    .clone()
                    .with_context(|| format!("{}: edges required without a preset", axis))?,
            ),
        };

        let base_meta = base.map(|spec| spec.metadata);
        let metadata = VariableMetadata {
            id,
            value_name,
            units: self
                .units
                .clone()
                .or_else(|| base_meta.as_ref().map(|m| m.units.clone()))
                .unwrap_or_default(),
            precision: self
                .precision
                .or_else(|| base_meta.as_ref().map(|m| m.precision))
                .unwrap_or(0),
            multiplier: self
                .multiplier
                .or_else(|| base_meta.as_ref().map(|m| m.multiplier))
                .unwrap_or(1.0),
        };

        Ok(VariableSpec { metadata, edges })
    }
}

/// Expand `~` and make relative paths relative to `base_dir`.
fn resolve_path(raw: &str, base_dir: &Path) -> Result<PathBuf> {
    anyhow::ensure!(!raw.trim().is_empty(), "Empty path in session config");
    let path = PathBuf::from(shellexpand::tilde(raw).into_owned());
    Ok(if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    })
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in YAML content.
/// Supports ${VAR} and ${VAR:-default} syntax.
pub fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();

        let mut expr = String::new();
        let mut depth = 1;
        while depth > 0 {
            match chars.next() {
                Some('{') => {
                    depth += 1;
                    expr.push('{');
                }
                Some('}') => {
                    depth -= 1;
                    if depth > 0 {
                        expr.push('}');
                    }
                }
                Some(c) => expr.push(c),
                None => anyhow::bail!("Unclosed variable substitution: ${{{}", expr),
            }
        }

        result.push_str(&resolve_var_expr(&expr)?);
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    match expr.split_once(":-") {
        Some((name, default)) => match std::env::var(name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        },
        None => std::env::var(expr.trim())
            .with_context(|| format!("Environment variable {} not set", expr)),
    }
}

// ============================================================================
// Validation
// ============================================================================

fn validate_session_file(file: &SessionFile) -> Result<()> {
    let tag = file.session.tag.trim();
    anyhow::ensure!(!tag.is_empty(), "session.tag cannot be empty");
    anyhow::ensure!(
        tag.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.'),
        "session.tag may only contain letters, digits, '_', '-' and '.': {}",
        tag
    );

    anyhow::ensure!(
        file.bounds.lon_low < file.bounds.lon_high,
        "bounds.lon_low must be less than bounds.lon_high"
    );
    anyhow::ensure!(
        file.bounds.lat_low < file.bounds.lat_high,
        "bounds.lat_low must be less than bounds.lat_high"
    );

    if let Some(max) = file.sampling.max_plotted_in_bin {
        anyhow::ensure!(max > 0, "sampling.max_plotted_in_bin must be greater than 0");
    }

    let mut tags: Vec<&str> = file.artifacts.templates.iter().map(|t| t.tag.as_str()).collect();
    anyhow::ensure!(
        tags.iter().all(|t| !t.is_empty() && *t != "manifest"),
        "artifact template tags must be non-empty and not 'manifest'"
    );
    tags.sort_unstable();
    tags.dedup();
    anyhow::ensure!(
        tags.len() == file.artifacts.templates.len(),
        "artifact template tags must be unique"
    );

    Ok(())
}
