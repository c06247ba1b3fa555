//! Markdown case notebook.
//!
//! One file per session tag. The header is written when the file is first
//! created; every confirmed case appends one section with a single write so
//! an interrupted session never leaves half an entry behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use clickhist::{CaseLog, CaseRecord, ClickHistError, ClickHistResult, VariableMetadata};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

pub struct CaseNotebook {
    path: PathBuf,
    x: VariableMetadata,
    y: VariableMetadata,
    last_case: usize,
    write_lock: Mutex<()>,
}

impl CaseNotebook {
    /// Open (or create) `<dir>/<tag>.md`, writing the header if the file is new.
    pub async fn open(
        dir: &Path,
        tag: &str,
        title: &str,
        x: VariableMetadata,
        y: VariableMetadata,
    ) -> ClickHistResult<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| log_error("create", dir, e))?;

        let path = dir.join(format!("{}.md", tag));
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| log_error("check", &path, e))?;

        let mut last_case = 0;
        if exists {
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| log_error("read", &path, e))?;
            last_case = last_case_in(&text);
            debug!(path = %path.display(), last_case, "Appending to existing notebook");
        } else {
            tokio::fs::write(&path, header(tag, title, &x, &y))
                .await
                .map_err(|e| log_error("write", &path, e))?;
            info!(path = %path.display(), "Created case notebook");
        }

        Ok(Self {
            path,
            x,
            y,
            last_case,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Highest case number already in the notebook when it was opened, or 0.
    pub fn last_case_number(&self) -> usize {
        self.last_case
    }

    /// Markdown section for one case.
    pub fn format_entry(&self, record: &CaseRecord) -> String {
        let center = &record.center;
        let loc = &center.location;
        let window = &record.window;

        let mut out = format!("\n## Case {}\n\n", record.case_number);
        out.push_str(&format!(
            "- Recorded: {} (session {})\n",
            record.recorded_at.format(TIME_FORMAT),
            record.session_id
        ));
        out.push_str(&format!(
            "- Center: {}, lat {}, lon {} (time {}, lat {}, lon {}; flat {})\n",
            loc.datetime.format(TIME_FORMAT),
            loc.lat,
            loc.lon,
            loc.index.time,
            loc.index.lat,
            loc.index.lon,
            loc.flat
        ));
        out.push_str(&format!(
            "- Values: {} = {}, {} = {}\n",
            self.x.id,
            self.x.format_with_units(center.point.x),
            self.y.id,
            self.y.format_with_units(center.point.y)
        ));
        out.push_str(&format!(
            "- Bin: ({}, {})\n",
            center.cell.0, center.cell.1
        ));
        out.push_str(&format!(
            "- Window: {}, {} to {}\n",
            window.bbox.describe(),
            window.time.start.format(TIME_FORMAT),
            window.time.end.format(TIME_FORMAT)
        ));
        if record.artifacts.is_empty() {
            out.push_str("- Artifacts: none\n");
        } else {
            out.push_str("- Artifacts:\n");
            for artifact in &record.artifacts {
                out.push_str(&format!("  - {}: `{}`\n", artifact.tag, artifact.path.display()));
            }
        }
        out
    }
}

fn header(tag: &str, title: &str, x: &VariableMetadata, y: &VariableMetadata) -> String {
    format!(
        "# CHAD case notebook: {}\n\n{}\n\n| Axis | Variable | Source name | Units | Multiplier |\n|------|----------|-------------|-------|------------|\n| x | {} | {} | {} | {} |\n| y | {} | {} | {} | {} |\n",
        tag,
        title,
        x.id,
        x.value_name,
        x.units,
        x.multiplier,
        y.id,
        y.value_name,
        y.units,
        y.multiplier
    )
}

fn last_case_in(text: &str) -> usize {
    text.lines()
        .filter_map(|line| line.strip_prefix("## Case "))
        .filter_map(|n| n.trim().parse::<usize>().ok())
        .max()
        .unwrap_or(0)
}

fn log_error(what: &str, path: &Path, e: std::io::Error) -> ClickHistError {
    ClickHistError::LogAppendFailed(format!("{} {:?}: {}", what, path, e))
}

#[async_trait]
impl CaseLog for CaseNotebook {
    async fn append(&self, record: &CaseRecord) -> ClickHistResult<()> {
        let entry = self.format_entry(record);
        let _guard = self.write_lock.lock().await;

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| log_error("open", &self.path, e))?;
        file.write_all(entry.as_bytes())
            .await
            .map_err(|e| log_error("append to", &self.path, e))?;
        file.flush()
            .await
            .map_err(|e| log_error("flush", &self.path, e))?;

        debug!(case = record.case_number, path = %self.path.display(), "Appended notebook entry");
        Ok(())
    }
}
