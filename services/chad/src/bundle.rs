//! Case bundle writer.
//!
//! For each confirmed case every configured template is filled with the
//! case's center and window and written to the output directory, followed
//! by a JSON manifest describing the case. A failed case can be retried:
//! file names depend only on the session tag, case number and output tag.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, instrument};

use clickhist::{ArtifactEmitter, ArtifactHandle, ArtifactRequest, ClickHistError, ClickHistResult};

use crate::config_loader::BundleTemplate;

/// Tag of the JSON manifest written for every case.
pub const MANIFEST_TAG: &str = "manifest";

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub struct BundleWriter {
    output_dir: PathBuf,
    session_tag: String,
    templates: Vec<BundleTemplate>,
}

#[derive(Serialize)]
struct Manifest<'a> {
    session: &'a str,
    #[serde(flatten)]
    request: &'a ArtifactRequest,
    artifacts: &'a [ArtifactHandle],
}

impl BundleWriter {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        session_tag: impl Into<String>,
        templates: Vec<BundleTemplate>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            session_tag: session_tag.into(),
            templates,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn templates(&self) -> &[BundleTemplate] {
        &self.templates
    }

    /// Confirm every template can be read.
    pub async fn check_templates(&self) -> ClickHistResult<()> {
        for template in &self.templates {
            tokio::fs::metadata(&template.path).await.map_err(|e| {
                ClickHistError::invalid_config(format!(
                    "template '{}' at {:?}: {}",
                    template.tag, template.path, e
                ))
            })?;
        }
        Ok(())
    }

    /// Highest case number with a manifest in the output directory, or 0.
    pub async fn last_case_number(&self) -> ClickHistResult<usize> {
        let mut entries = match tokio::fs::read_dir(&self.output_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let prefix = format!("{}_case", self.session_tag);
        let mut last = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let number = name
                .to_str()
                .and_then(|n| n.strip_prefix(prefix.as_str()))
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| n.parse::<usize>().ok());
            if let Some(number) = number {
                last = last.max(number);
            }
        }
        debug!(dir = %self.output_dir.display(), last, "Scanned case manifests");
        Ok(last)
    }

    /// `<tag>_case007_<output tag>.<template extension>`
    pub fn output_path(&self, case_number: usize, template: &BundleTemplate) -> PathBuf {
        let mut name = format!("{}_case{:03}_{}", self.session_tag, case_number, template.tag);
        if let Some(ext) = template.path.extension().and_then(|e| e.to_str()) {
            name.push('.');
            name.push_str(ext);
        }
        self.output_dir.join(name)
    }

    pub fn manifest_path(&self, case_number: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}_case{:03}.json", self.session_tag, case_number))
    }
}

/// Replace every `{{placeholder}}` with the case's values.
///
/// Unknown placeholders are left as they are.
pub fn fill_template(template: &str, request: &ArtifactRequest) -> String {
    let center = &request.center.location;
    let window = &request.window;
    let replacements = [
        ("{{case}}", request.case_number.to_string()),
        ("{{center_time}}", center.datetime.format(TIME_FORMAT).to_string()),
        ("{{start_time}}", window.time.start.format(TIME_FORMAT).to_string()),
        ("{{end_time}}", window.time.end.format(TIME_FORMAT).to_string()),
        ("{{center_lat}}", center.lat.to_string()),
        ("{{center_lon}}", center.lon.to_string()),
        ("{{west}}", window.bbox.min_lon.to_string()),
        ("{{east}}", window.bbox.max_lon.to_string()),
        ("{{south}}", window.bbox.min_lat.to_string()),
        ("{{north}}", window.bbox.max_lat.to_string()),
        ("{{x_name}}", request.x.id.clone()),
        ("{{y_name}}", request.y.id.clone()),
        ("{{x_value}}", request.x.format_value(request.center.point.x)),
        ("{{y_value}}", request.y.format_value(request.center.point.y)),
    ];

    replacements
        .iter()
        .fold(template.to_string(), |text, (key, value)| text.replace(key, value))
}

fn artifact_error(what: &str, path: &Path, e: impl std::fmt::Display) -> ClickHistError {
    ClickHistError::ArtifactGenerationFailed(format!("{} {:?}: {}", what, path, e))
}

#[async_trait]
impl ArtifactEmitter for BundleWriter {
    #[instrument(skip(self, request), fields(case = request.case_number))]
    async fn emit(&self, request: &ArtifactRequest) -> ClickHistResult<Vec<ArtifactHandle>> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| artifact_error("create", &self.output_dir, e))?;

        let mut handles = Vec::with_capacity(self.templates.len() + 1);
        for template in &self.templates {
            let text = tokio::fs::read_to_string(&template.path)
                .await
                .map_err(|e| artifact_error("read template", &template.path, e))?;

            let path = self.output_path(request.case_number, template);
            tokio::fs::write(&path, fill_template(&text, request))
                .await
                .map_err(|e| artifact_error("write", &path, e))?;

            debug!(tag = %template.tag, path = %path.display(), "Wrote bundle");
            handles.push(ArtifactHandle {
                tag: template.tag.clone(),
                path,
            });
        }

        let manifest_path = self.manifest_path(request.case_number);
        let manifest = Manifest {
            session: &self.session_tag,
            request,
            artifacts: &handles,
        };
        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| artifact_error("serialize", &manifest_path, e))?;
        tokio::fs::write(&manifest_path, json)
            .await
            .map_err(|e| artifact_error("write", &manifest_path, e))?;

        handles.push(ArtifactHandle {
            tag: MANIFEST_TAG.to_string(),
            path: manifest_path,
        });

        info!(
            case = request.case_number,
            files = handles.len(),
            dir = %self.output_dir.display(),
            "Emitted case bundle"
        );
        Ok(handles)
    }
}
