//! Event-driven exploration session.
//!
//! [`ExploreSession`] owns the selection controller, the case recorder and a
//! renderer, and turns user events into state changes plus drawing calls.
//! Errors never end a session: they are reported through the renderer and
//! the selection stays where it was.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use clickhist_common::{ClickHistError, ClickHistResult, FlatIndex};

use crate::config::ClickHistConfig;
use crate::field::VariablePair;
use crate::histogram::JointHistogram;
use crate::recorder::{ArtifactEmitter, CaseLog, CaseRecorder, SessionLog};
use crate::render::{MessageLevel, Renderer};
use crate::sampler::{BinSampler, BinSummary};
use crate::selection::{CellClick, ResolvedPoint, SelectionController};

/// A user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    CellClick { ix: usize, iy: usize },
    PointClick { index: FlatIndex },
    Confirm,
    Clear,
}

/// What an event did.
#[derive(Debug)]
pub enum SessionOutcome {
    /// Click on an empty cell; nothing changed.
    Ignored,
    CellOpened { count: usize, shown: usize },
    PointSelected(ResolvedPoint),
    /// A case was recorded; carries its case number.
    CaseRecorded(usize),
    Cleared,
    /// The event was refused and the state left unchanged.
    Rejected(ClickHistError),
}

impl SessionOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, SessionOutcome::Rejected(_))
    }
}

pub struct ExploreSession<R: Renderer> {
    controller: SelectionController,
    recorder: CaseRecorder,
    renderer: R,
    percentiles: Vec<f64>,
    title: String,
}

impl<R: Renderer> ExploreSession<R> {
    pub fn new(
        controller: SelectionController,
        recorder: CaseRecorder,
        renderer: R,
        percentiles: Vec<f64>,
    ) -> Self {
        let title = {
            let (x, y) = recorder.variables();
            format!("{} vs {}", x.id, y.id)
        };
        Self {
            controller,
            recorder,
            renderer,
            percentiles,
            title,
        }
    }

    /// Wire up a session from a validated configuration and a loaded pair.
    pub fn from_config(
        config: &ClickHistConfig,
        pair: VariablePair,
        emitter: Arc<dyn ArtifactEmitter>,
        case_log: Arc<dyn CaseLog>,
        renderer: R,
    ) -> ClickHistResult<Self> {
        config.validate()?;

        let histogram =
            JointHistogram::build(&pair.x, &pair.y, &config.x.edges, &config.y.edges)?;
        let sampler = BinSampler::new(config.max_plotted_in_bin).with_seed(config.sample_seed);
        let controller = SelectionController::new(Arc::new(pair), Arc::new(histogram), sampler);

        let recorder = CaseRecorder::new(
            emitter,
            case_log,
            config.x.metadata.clone(),
            config.y.metadata.clone(),
        )
        .with_window_config(config.window)
        .with_timeout(Duration::from_secs(config.artifact_timeout_secs));

        Ok(Self::new(controller, recorder, renderer, config.quantiles.clone())
            .with_title(config.metadata_label()))
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Continue case numbering at `first_case`.
    pub fn with_first_case(mut self, first_case: usize) -> Self {
        self.recorder = self.recorder.with_first_case(first_case);
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn controller(&self) -> &SelectionController {
        &self.controller
    }

    pub fn recorder(&self) -> &CaseRecorder {
        &self.recorder
    }

    pub fn session_log(&self) -> &SessionLog {
        self.recorder.session_log()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// Draw the histogram and the global quantile overlay.
    pub fn start(&mut self) {
        let histogram = self.controller.histogram();
        info!(
            title = %self.title,
            total = histogram.total_count(),
            bins_x = histogram.n_bins_x(),
            bins_y = histogram.n_bins_y(),
            "Session started"
        );
        self.redraw();
    }

    /// Statistics over every member of cell `(ix, iy)`.
    pub fn summary(&self, ix: usize, iy: usize) -> Option<BinSummary> {
        let cell = self.controller.histogram().cell_at(ix, iy)?;
        Some(
            self.controller
                .sampler()
                .summarize(cell, self.controller.pair(), &self.percentiles),
        )
    }

    pub async fn handle(&mut self, event: SessionEvent) -> SessionOutcome {
        debug!(?event, state = self.controller.state().name(), "Handling event");
        match event {
            SessionEvent::CellClick { ix, iy } => self.on_cell_click(ix, iy),
            SessionEvent::PointClick { index } => self.on_point_click(index),
            SessionEvent::Confirm => self.on_confirm().await,
            SessionEvent::Clear => {
                self.controller.clear();
                self.redraw();
                SessionOutcome::Cleared
            }
        }
    }

    fn on_cell_click(&mut self, ix: usize, iy: usize) -> SessionOutcome {
        match self.controller.click_cell(ix, iy) {
            Ok(CellClick::Opened { count, shown }) => {
                if let Some(cell) = self.controller.open_cell() {
                    self.renderer.show_sample(cell, self.controller.sample());
                }
                if let Some(summary) = self.summary(ix, iy) {
                    self.renderer.show_overlay(&summary.markers);
                }
                if shown < count {
                    self.renderer.show_message(
                        MessageLevel::Info,
                        &format!("showing {} of {} points", shown, count),
                    );
                }
                SessionOutcome::CellOpened { count, shown }
            }
            Ok(CellClick::Ignored) => SessionOutcome::Ignored,
            Err(e) => self.reject(e),
        }
    }

    fn on_point_click(&mut self, index: FlatIndex) -> SessionOutcome {
        match self.controller.click_point(index) {
            Ok(resolved) => {
                self.renderer.show_selection(&resolved);
                SessionOutcome::PointSelected(resolved)
            }
            Err(e) => self.reject(e),
        }
    }

    async fn on_confirm(&mut self) -> SessionOutcome {
        match self.controller.confirm(&mut self.recorder).await {
            Ok(record) => {
                self.renderer.show_case(&record);
                SessionOutcome::CaseRecorded(record.case_number)
            }
            Err(e) => {
                if e.is_recoverable() {
                    warn!(error = %e, code = e.error_code(), "Confirm failed, selection kept");
                }
                self.reject(e)
            }
        }
    }

    fn reject(&mut self, e: ClickHistError) -> SessionOutcome {
        let level = if e.is_recoverable() {
            MessageLevel::Warning
        } else {
            MessageLevel::Error
        };
        self.renderer.show_message(level, &e.to_string());
        SessionOutcome::Rejected(e)
    }

    /// Draw the histogram and global overlay again, leaving the selection alone.
    pub fn redraw(&mut self) {
        let histogram = self.controller.histogram();
        let regions = histogram.regions();
        let markers = histogram.quantile_markers(&self.percentiles);
        self.renderer.show_histogram(&self.title, &regions);
        self.renderer.show_overlay(&markers);
    }
}
