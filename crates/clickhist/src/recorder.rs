//! Case recording: window computation, artifact emission and the session log.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use clickhist_common::{BoundingBox, ClickHistError, ClickHistResult, GridPoint, TimeWindow};

use crate::selection::ResolvedPoint;
use crate::variables::VariableMetadata;

/// Default half-width of a case window in time: 73 hours.
pub const DEFAULT_DT_FROM_CENTER_SECS: u64 = 73 * 3600;

/// Largest accepted `dt_from_center_secs`: the longest whole-second span a
/// `chrono::Duration` can hold.
pub const MAX_DT_FROM_CENTER_SECS: u64 = (i64::MAX / 1000) as u64;

/// Default timeout for one artifact emission.
pub const DEFAULT_ARTIFACT_TIMEOUT_SECS: u64 = 120;

/// Size of the spatio-temporal window extracted around a case center.
///
/// Offsets are distances from the center, so `lon_offset = 1.0` spans
/// 2 degrees of longitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub lon_offset: f64,
    pub lat_offset: f64,
    pub dt_from_center_secs: u64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            lon_offset: 10.0,
            lat_offset: 10.0,
            dt_from_center_secs: DEFAULT_DT_FROM_CENTER_SECS,
        }
    }
}

impl WindowConfig {
    pub fn validate(&self) -> ClickHistResult<()> {
        for (name, value) in [("lon_offset", self.lon_offset), ("lat_offset", self.lat_offset)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ClickHistError::invalid_config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.dt_from_center_secs > MAX_DT_FROM_CENTER_SECS {
            return Err(ClickHistError::invalid_config(format!(
                "dt_from_center_secs must be at most {}, got {}",
                MAX_DT_FROM_CENTER_SECS, self.dt_from_center_secs
            )));
        }
        Ok(())
    }

    /// Window centered on a resolved grid point.
    ///
    /// Fails with `InvalidTime` when the time window would leave the
    /// representable date range.
    pub fn window_around(&self, center: &GridPoint) -> ClickHistResult<CaseWindow> {
        let time = TimeWindow::around(center.datetime, self.dt_from_center_secs).ok_or_else(|| {
            ClickHistError::InvalidTime(format!(
                "window of {}s around {} is out of range",
                self.dt_from_center_secs, center.datetime
            ))
        })?;
        Ok(CaseWindow {
            bbox: BoundingBox::around(center.lon, center.lat, self.lon_offset, self.lat_offset),
            time,
        })
    }
}

/// The extracted window: a lon/lat box and a time interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaseWindow {
    pub bbox: BoundingBox,
    pub time: TimeWindow,
}

/// Everything an artifact emitter gets. Never carries raw arrays.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactRequest {
    pub case_number: usize,
    pub center: ResolvedPoint,
    pub window_config: WindowConfig,
    pub window: CaseWindow,
    pub x: VariableMetadata,
    pub y: VariableMetadata,
}

/// A file produced for a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHandle {
    pub tag: String,
    pub path: PathBuf,
}

/// An immutable entry of the session log.
#[derive(Debug, Clone, Serialize)]
pub struct CaseRecord {
    pub case_number: usize,
    pub session_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub center: ResolvedPoint,
    pub window_config: WindowConfig,
    pub window: CaseWindow,
    pub artifacts: Vec<ArtifactHandle>,
}

/// Produces the on-disk bundle for a case.
#[async_trait]
pub trait ArtifactEmitter: Send + Sync {
    async fn emit(&self, request: &ArtifactRequest) -> ClickHistResult<Vec<ArtifactHandle>>;
}

/// Persists a human-readable record of each case, in order.
#[async_trait]
pub trait CaseLog: Send + Sync {
    async fn append(&self, record: &CaseRecord) -> ClickHistResult<()>;
}

/// Ordered, append-only list of the cases recorded in one session.
#[derive(Debug, Clone)]
pub struct SessionLog {
    session_id: Uuid,
    started_at: DateTime<Utc>,
    records: Vec<CaseRecord>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            records: Vec::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn records(&self) -> &[CaseRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&CaseRecord> {
        self.records.last()
    }

    fn push(&mut self, record: CaseRecord) -> &CaseRecord {
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns a resolved point into a recorded case.
pub struct CaseRecorder {
    emitter: Arc<dyn ArtifactEmitter>,
    case_log: Arc<dyn CaseLog>,
    x: VariableMetadata,
    y: VariableMetadata,
    window_config: WindowConfig,
    timeout: Duration,
    first_case: usize,
    log: SessionLog,
}

impl CaseRecorder {
    pub fn new(
        emitter: Arc<dyn ArtifactEmitter>,
        case_log: Arc<dyn CaseLog>,
        x: VariableMetadata,
        y: VariableMetadata,
    ) -> Self {
        Self {
            emitter,
            case_log,
            x,
            y,
            window_config: WindowConfig::default(),
            timeout: Duration::from_secs(DEFAULT_ARTIFACT_TIMEOUT_SECS),
            first_case: 1,
            log: SessionLog::new(),
        }
    }

    pub fn with_window_config(mut self, window_config: WindowConfig) -> Self {
        self.window_config = window_config;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number the first case of this session `first_case` (at least 1).
    ///
    /// Used to continue numbering after cases recorded by earlier sessions
    /// that share the same output.
    pub fn with_first_case(mut self, first_case: usize) -> Self {
        self.first_case = first_case.max(1);
        self
    }

    /// Number the next successful case will get.
    pub fn next_case_number(&self) -> usize {
        self.first_case + self.log.len()
    }

    pub fn window_config(&self) -> &WindowConfig {
        &self.window_config
    }

    pub fn variables(&self) -> (&VariableMetadata, &VariableMetadata) {
        (&self.x, &self.y)
    }

    pub fn session_log(&self) -> &SessionLog {
        &self.log
    }

    /// Emit artifacts for `center`, write the case log entry and append the
    /// record to the session log.
    ///
    /// The session log only grows once both collaborators succeeded; on any
    /// failure nothing is appended and the call can simply be repeated.
    pub async fn record(
        &mut self,
        center: &ResolvedPoint,
        window_config: &WindowConfig,
    ) -> ClickHistResult<&CaseRecord> {
        window_config.validate()?;

        let case_number = self.next_case_number();
        let window = window_config.window_around(&center.location)?;
        let request = ArtifactRequest {
            case_number,
            center: *center,
            window_config: *window_config,
            window,
            x: self.x.clone(),
            y: self.y.clone(),
        };

        let artifacts = match tokio::time::timeout(self.timeout, self.emitter.emit(&request)).await
        {
            Ok(Ok(artifacts)) => artifacts,
            Ok(Err(e)) => {
                error!(case = case_number, error = %e, "Artifact generation failed");
                return Err(if matches!(e, ClickHistError::ArtifactGenerationFailed(_)) {
                    e
                } else {
                    ClickHistError::ArtifactGenerationFailed(e.to_string())
                });
            }
            Err(_) => {
                warn!(
                    case = case_number,
                    timeout_secs = self.timeout.as_secs(),
                    "Artifact generation timed out"
                );
                return Err(ClickHistError::ArtifactGenerationFailed(format!(
                    "timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        let record = CaseRecord {
            case_number,
            session_id: self.log.session_id(),
            recorded_at: Utc::now(),
            center: *center,
            window_config: *window_config,
            window,
            artifacts,
        };

        if let Err(e) = self.case_log.append(&record).await {
            error!(case = case_number, error = %e, "Case log append failed");
            return Err(if matches!(e, ClickHistError::LogAppendFailed(_)) {
                e
            } else {
                ClickHistError::LogAppendFailed(e.to_string())
            });
        }

        info!(
            case = case_number,
            datetime = %center.location.datetime,
            lat = center.location.lat,
            lon = center.location.lon,
            artifacts = record.artifacts.len(),
            "Recorded case"
        );
        Ok(self.log.push(record))
    }
}
