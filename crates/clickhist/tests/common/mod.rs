//! Shared helpers for clickhist integration tests.
//!
//! - Pair builders over the test-utils grid layouts
//! - In-memory artifact emitter and case log with switchable failures
//! - A renderer that records every drawing call

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use clickhist::{
    ArtifactEmitter, ArtifactHandle, ArtifactRequest, CaseLog, CaseRecord, CellRegion,
    ClickHistError, ClickHistResult, Field3D, HistogramCell, MessageLevel, QuantileMarker,
    Renderer, ResolvedPoint, SampledPoint, VariableMetadata, VariablePair,
};
use test_utils::fixtures::grid::GridSpec;

pub fn pair_from(spec: &GridSpec, x: Vec<f64>, y: Vec<f64>) -> VariablePair {
    let grid = spec.coordinate_grid();
    let shape = grid.shape();
    VariablePair::new(
        grid,
        Field3D::new("x", shape, x).unwrap(),
        Field3D::new("y", shape, y).unwrap(),
    )
    .unwrap()
}

/// `x` equals the flat index, `y` is constant 0.5.
pub fn index_pair(spec: &GridSpec) -> VariablePair {
    pair_from(
        spec,
        test_utils::index_values(spec.len()),
        test_utils::constant_values(spec.len(), 0.5),
    )
}

pub fn precip_pair(spec: &GridSpec, seed: u32) -> VariablePair {
    let x = test_utils::precip_values(spec.len(), seed);
    let y = test_utils::correlated_values(&x, 1.1, seed + 1);
    pair_from(spec, x, y)
}

pub fn metadata(id: &str) -> VariableMetadata {
    VariableMetadata {
        id: id.to_string(),
        value_name: id.to_lowercase(),
        units: "mm day-1".to_string(),
        precision: 0,
        multiplier: 1.0,
    }
}

#[derive(Default)]
pub struct MockEmitter {
    requests: Mutex<Vec<ArtifactRequest>>,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl MockEmitter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<ArtifactRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactEmitter for MockEmitter {
    async fn emit(&self, request: &ArtifactRequest) -> ClickHistResult<Vec<ArtifactHandle>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClickHistError::Internal("disk full".to_string()));
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok(vec![ArtifactHandle {
            tag: "manifest".to_string(),
            path: format!("case{}.json", request.case_number).into(),
        }])
    }
}

#[derive(Default)]
pub struct MockCaseLog {
    entries: Mutex<Vec<usize>>,
    failing: AtomicBool,
}

impl MockCaseLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Case numbers appended so far.
    pub fn entries(&self) -> Vec<usize> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaseLog for MockCaseLog {
    async fn append(&self, record: &CaseRecord) -> ClickHistResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClickHistError::LogAppendFailed("read-only notebook".to_string()));
        }
        self.entries.lock().unwrap().push(record.case_number);
        Ok(())
    }
}

/// Records what the session asked to draw.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub histograms: Vec<(String, usize)>,
    pub samples: Vec<((usize, usize), usize)>,
    pub overlays: Vec<usize>,
    pub selections: Vec<ResolvedPoint>,
    pub cases: Vec<usize>,
    pub messages: Vec<(MessageLevel, String)>,
}

impl Renderer for RecordingRenderer {
    fn show_histogram(&mut self, title: &str, regions: &[CellRegion]) {
        self.histograms.push((title.to_string(), regions.len()));
    }

    fn show_sample(&mut self, cell: &HistogramCell, points: &[SampledPoint]) {
        self.samples.push(((cell.ix, cell.iy), points.len()));
    }

    fn show_overlay(&mut self, markers: &[QuantileMarker]) {
        self.overlays.push(markers.len());
    }

    fn show_selection(&mut self, point: &ResolvedPoint) {
        self.selections.push(*point);
    }

    fn show_case(&mut self, record: &CaseRecord) {
        self.cases.push(record.case_number);
    }

    fn show_message(&mut self, level: MessageLevel, text: &str) {
        self.messages.push((level, text.to_string()));
    }
}
