//! Interactive selection state machine.
//!
//! ```text
//!            click_cell (count > 0)
//!   Idle ───────────────────────────► CellOpen ◄──┐ click_cell (other cell)
//!    ▲                                   │  └─────┘
//!    │ clear                  click_point│
//!    │                                   ▼
//!    └──────────────────────────── PointSelected ◄─┐ confirm (no state change)
//!                                          └───────┘
//! ```
//!
//! Clicking an empty cell is a no-op from every state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use clickhist_common::{ClickHistError, ClickHistResult, FlatIndex, GridPoint};

use crate::field::VariablePair;
use crate::histogram::{HistogramCell, JointHistogram};
use crate::recorder::{CaseRecord, CaseRecorder};
use crate::sampler::{BinSampler, SampledPoint};

/// Current selection.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    CellOpen {
        cell: (usize, usize),
        sample: Vec<SampledPoint>,
    },
    PointSelected {
        cell: (usize, usize),
        sample: Vec<SampledPoint>,
        point: SampledPoint,
    },
}

impl SelectionState {
    pub fn name(&self) -> &'static str {
        match self {
            SelectionState::Idle => "idle",
            SelectionState::CellOpen { .. } => "cell_open",
            SelectionState::PointSelected { .. } => "point_selected",
        }
    }
}

/// Outcome of a cell click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellClick {
    /// The cell is now open with `shown` of its `count` members displayed.
    Opened { count: usize, shown: usize },
    /// The cell was empty; nothing changed.
    Ignored,
}

/// A selected point resolved to its source coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPoint {
    pub cell: (usize, usize),
    pub point: SampledPoint,
    pub location: GridPoint,
}

/// Tracks the open cell and selected point for one session.
pub struct SelectionController {
    pair: Arc<VariablePair>,
    histogram: Arc<JointHistogram>,
    sampler: BinSampler,
    state: SelectionState,
}

impl SelectionController {
    pub fn new(pair: Arc<VariablePair>, histogram: Arc<JointHistogram>, sampler: BinSampler) -> Self {
        Self {
            pair,
            histogram,
            sampler,
            state: SelectionState::Idle,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn histogram(&self) -> &JointHistogram {
        &self.histogram
    }

    pub fn pair(&self) -> &VariablePair {
        &self.pair
    }

    pub fn sampler(&self) -> &BinSampler {
        &self.sampler
    }

    /// The open cell, if any.
    pub fn open_cell(&self) -> Option<&HistogramCell> {
        match &self.state {
            SelectionState::Idle => None,
            SelectionState::CellOpen { cell, .. } | SelectionState::PointSelected { cell, .. } => {
                self.histogram.cell_at(cell.0, cell.1)
            }
        }
    }

    /// Points currently displayed for the open cell.
    pub fn sample(&self) -> &[SampledPoint] {
        match &self.state {
            SelectionState::Idle => &[],
            SelectionState::CellOpen { sample, .. }
            | SelectionState::PointSelected { sample, .. } => sample,
        }
    }

    pub fn selected_point(&self) -> Option<&SampledPoint> {
        match &self.state {
            SelectionState::PointSelected { point, .. } => Some(point),
            _ => None,
        }
    }

    /// Open cell `(ix, iy)`, replacing any open cell and selection.
    pub fn click_cell(&mut self, ix: usize, iy: usize) -> ClickHistResult<CellClick> {
        let cell = self.histogram.cell_at(ix, iy).ok_or_else(|| {
            ClickHistError::invalid_selection(format!(
                "cell ({}, {}) outside {}x{} histogram",
                ix,
                iy,
                self.histogram.n_bins_x(),
                self.histogram.n_bins_y()
            ))
        })?;

        if cell.is_empty() {
            debug!(ix, iy, state = self.state.name(), "Ignored click on empty cell");
            return Ok(CellClick::Ignored);
        }

        let sample = self.sampler.sample(cell, &self.pair);
        let outcome = CellClick::Opened {
            count: cell.count(),
            shown: sample.len(),
        };
        info!(ix, iy, count = cell.count(), shown = sample.len(), "Opened cell");

        self.state = SelectionState::CellOpen {
            cell: (ix, iy),
            sample,
        };
        Ok(outcome)
    }

    /// Select a displayed point of the open cell by its flat index.
    pub fn click_point(&mut self, flat: FlatIndex) -> ClickHistResult<ResolvedPoint> {
        let (cell, point) = match &self.state {
            SelectionState::Idle => {
                return Err(ClickHistError::invalid_selection(format!(
                    "point {} clicked with no cell open",
                    flat
                )))
            }
            SelectionState::CellOpen { cell, sample }
            | SelectionState::PointSelected { cell, sample, .. } => {
                let point = sample.iter().find(|p| p.index == flat).copied().ok_or_else(|| {
                    ClickHistError::invalid_selection(format!(
                        "point {} is not among the {} points shown for cell ({}, {})",
                        flat,
                        sample.len(),
                        cell.0,
                        cell.1
                    ))
                })?;
                (*cell, point)
            }
        };

        let resolved = self.resolve(cell, &point)?;

        let sample = match std::mem::take(&mut self.state) {
            SelectionState::CellOpen { sample, .. }
            | SelectionState::PointSelected { sample, .. } => sample,
            SelectionState::Idle => Vec::new(),
        };
        self.state = SelectionState::PointSelected {
            cell,
            sample,
            point,
        };

        info!(
            flat,
            time_idx = resolved.location.index.time,
            lat_idx = resolved.location.index.lat,
            lon_idx = resolved.location.index.lon,
            datetime = %resolved.location.datetime,
            lat = resolved.location.lat,
            lon = resolved.location.lon,
            "Selected point"
        );
        Ok(resolved)
    }

    /// The selected point resolved to coordinates.
    pub fn resolved_selection(&self) -> Option<ResolvedPoint> {
        match &self.state {
            SelectionState::PointSelected { cell, point, .. } => self.resolve(*cell, point).ok(),
            _ => None,
        }
    }

    /// Record a case for the selected point.
    ///
    /// Takes `&self`: confirming never changes the selection, so a failed
    /// attempt can be retried and a successful one repeated.
    pub async fn confirm(&self, recorder: &mut CaseRecorder) -> ClickHistResult<CaseRecord> {
        let resolved = match &self.state {
            SelectionState::PointSelected { cell, point, .. } => self.resolve(*cell, point)?,
            other => {
                return Err(ClickHistError::invalid_selection(format!(
                    "confirm requires a selected point (state: {})",
                    other.name()
                )))
            }
        };
        let config = *recorder.window_config();
        let record = recorder.record(&resolved, &config).await?;
        Ok(record.clone())
    }

    /// Close any open cell and drop the selection.
    pub fn clear(&mut self) {
        debug!(state = self.state.name(), "Cleared selection");
        self.state = SelectionState::Idle;
    }

    fn resolve(&self, cell: (usize, usize), point: &SampledPoint) -> ClickHistResult<ResolvedPoint> {
        let location = self.pair.grid.resolve(point.index).ok_or_else(|| {
            ClickHistError::Internal(format!(
                "flat index {} outside grid {:?}",
                point.index,
                self.pair.shape().as_array()
            ))
        })?;
        Ok(ResolvedPoint {
            cell,
            point: *point,
            location,
        })
    }
}
