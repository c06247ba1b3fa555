//! Temporary directories and on-disk datasets.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::fixtures::grid::GridSpec;
use crate::fixtures::time::EPOCH;

/// Workspace root, two levels above this crate.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir)
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Temporary directory for case output, removed on drop.
pub fn temp_session_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("clickhist_session_")
        .tempdir()
        .expect("Failed to create temporary session directory")
}

/// JSON dataset document for `spec` with the given named arrays.
///
/// NaN values serialize as `null`.
pub fn dataset_json(spec: &GridSpec, variables: &[(&str, &[f64])]) -> Value {
    let vars: serde_json::Map<String, Value> = variables
        .iter()
        .map(|(name, values)| ((*name).to_string(), json!(values)))
        .collect();
    json!({
        "epoch": EPOCH,
        "time_units": "hours",
        "time": spec.hours(),
        "lat": spec.lats(),
        "lon": spec.lons(),
        "variables": vars,
    })
}

/// Write a dataset document into `dir` and return its path.
pub fn write_dataset(dir: &Path, name: &str, document: &Value) -> PathBuf {
    let path = dir.join(name);
    let text = serde_json::to_string_pretty(document).expect("serialize dataset");
    std::fs::write(&path, text).expect("write dataset");
    path
}
