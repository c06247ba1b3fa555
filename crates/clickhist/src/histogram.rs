//! Joint 2-D histogram over two coregistered variables.
//!
//! Every cell keeps the flat indices of the samples that fell into it, so a
//! click on a cell can be turned back into individual grid points.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use clickhist_common::{ClickHistError, ClickHistResult, FlatIndex, GridShape};

use crate::field::Field3D;
use crate::stats::{quantile_sorted, sorted_finite};

/// Which variable of the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

/// Strictly increasing bin boundaries for one variable.
///
/// Bin `i` covers `[edges[i], edges[i + 1])`; the last bin is also closed on
/// the right so the top edge itself is counted. Anything outside
/// `[edges[0], edges[last]]` belongs to no bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinEdges {
    edges: Vec<f64>,
}

impl BinEdges {
    pub fn new(variable: &str, edges: Vec<f64>) -> ClickHistResult<Self> {
        if edges.len() < 2 {
            return Err(ClickHistError::invalid_edges(
                variable,
                format!("need at least 2 edges, got {}", edges.len()),
            ));
        }
        if let Some(pos) = edges.iter().position(|e| !e.is_finite()) {
            return Err(ClickHistError::invalid_edges(
                variable,
                format!("edge {} is not finite", pos),
            ));
        }
        if let Some(pos) = edges.windows(2).position(|w| w[1] <= w[0]) {
            return Err(ClickHistError::invalid_edges(
                variable,
                format!(
                    "not strictly increasing at index {} ({} -> {})",
                    pos + 1,
                    edges[pos],
                    edges[pos + 1]
                ),
            ));
        }
        Ok(Self { edges })
    }

    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.edges
    }

    /// Bin containing `value`, or `None` for missing and out-of-range values.
    pub fn locate(&self, value: f64) -> Option<usize> {
        if !value.is_finite() {
            return None;
        }
        let first = self.edges[0];
        let last = self.edges[self.edges.len() - 1];
        if value < first || value > last {
            return None;
        }
        if value == last {
            return Some(self.n_bins() - 1);
        }
        // Number of edges <= value is at least 1 here.
        Some(self.edges.partition_point(|e| *e <= value) - 1)
    }

    /// Lower and upper boundary of bin `i`.
    pub fn bin_range(&self, i: usize) -> Option<(f64, f64)> {
        if i >= self.n_bins() {
            return None;
        }
        Some((self.edges[i], self.edges[i + 1]))
    }
}

/// One cell of the joint histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramCell {
    pub ix: usize,
    pub iy: usize,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    members: Vec<FlatIndex>,
}

impl HistogramCell {
    pub fn count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member flat indices, ascending.
    pub fn members(&self) -> &[FlatIndex] {
        &self.members
    }

    pub fn contains(&self, flat: FlatIndex) -> bool {
        self.members.binary_search(&flat).is_ok()
    }
}

/// A clickable rectangle handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellRegion {
    pub ix: usize,
    pub iy: usize,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub count: usize,
}

/// Reference marker at a percentile of one variable's distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantileMarker {
    pub axis: Axis,
    /// Percentile in 0..=100.
    pub percentile: f64,
    pub value: f64,
}

/// Immutable joint histogram with per-cell membership.
#[derive(Debug, Clone)]
pub struct JointHistogram {
    edges_x: BinEdges,
    edges_y: BinEdges,
    shape: GridShape,
    cells: Vec<HistogramCell>,
    total: usize,
    sorted_x: Vec<f64>,
    sorted_y: Vec<f64>,
}

impl JointHistogram {
    /// Bin `x` against `edges_x` and `y` against `edges_y`.
    ///
    /// Samples where either value is missing or outside its edge range are
    /// left out of every cell.
    pub fn build(
        x: &Field3D,
        y: &Field3D,
        edges_x: &[f64],
        edges_y: &[f64],
    ) -> ClickHistResult<Self> {
        if x.shape() != y.shape() {
            return Err(ClickHistError::ShapeMismatch {
                x: x.shape().as_array(),
                y: y.shape().as_array(),
            });
        }
        let edges_x = BinEdges::new(&x.name, edges_x.to_vec())?;
        let edges_y = BinEdges::new(&y.name, edges_y.to_vec())?;

        let nx = edges_x.n_bins();
        let ny = edges_y.n_bins();
        let mut cells = Vec::with_capacity(nx * ny);
        for ix in 0..nx {
            for iy in 0..ny {
                cells.push(HistogramCell {
                    ix,
                    iy,
                    x_range: edges_x.bin_range(ix).unwrap_or_default(),
                    y_range: edges_y.bin_range(iy).unwrap_or_default(),
                    members: Vec::new(),
                });
            }
        }

        let mut total = 0usize;
        let mut missing = 0usize;
        let mut out_of_range = 0usize;

        for (flat, (&xv, &yv)) in x.values().iter().zip(y.values()).enumerate() {
            if !xv.is_finite() || !yv.is_finite() {
                missing += 1;
                continue;
            }
            match (edges_x.locate(xv), edges_y.locate(yv)) {
                (Some(ix), Some(iy)) => {
                    cells[ix * ny + iy].members.push(flat);
                    total += 1;
                }
                _ => out_of_range += 1,
            }
        }

        let sorted_x = sorted_finite(x.values().iter().copied());
        let sorted_y = sorted_finite(y.values().iter().copied());

        info!(
            x = %x.name,
            y = %y.name,
            bins_x = nx,
            bins_y = ny,
            binned = total,
            missing,
            out_of_range,
            "Built joint histogram"
        );

        Ok(Self {
            edges_x,
            edges_y,
            shape: x.shape(),
            cells,
            total,
            sorted_x,
            sorted_y,
        })
    }

    pub fn edges(&self, axis: Axis) -> &BinEdges {
        match axis {
            Axis::X => &self.edges_x,
            Axis::Y => &self.edges_y,
        }
    }

    /// Shape of the arrays this histogram was built from.
    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn n_bins_x(&self) -> usize {
        self.edges_x.n_bins()
    }

    pub fn n_bins_y(&self) -> usize {
        self.edges_y.n_bins()
    }

    /// Cell `(ix, iy)`, or `None` if either index is out of range.
    pub fn cell_at(&self, ix: usize, iy: usize) -> Option<&HistogramCell> {
        if ix >= self.n_bins_x() || iy >= self.n_bins_y() {
            return None;
        }
        self.cells.get(ix * self.n_bins_y() + iy)
    }

    /// All cells, x-major.
    pub fn cells(&self) -> impl Iterator<Item = &HistogramCell> {
        self.cells.iter()
    }

    /// Number of samples that landed in some cell.
    pub fn total_count(&self) -> usize {
        self.total
    }

    pub fn max_count(&self) -> usize {
        self.cells.iter().map(HistogramCell::count).max().unwrap_or(0)
    }

    /// Share of binned samples in a cell, in percent.
    pub fn percent_of_total(&self, ix: usize, iy: usize) -> Option<f64> {
        let cell = self.cell_at(ix, iy)?;
        if self.total == 0 {
            return Some(0.0);
        }
        Some(cell.count() as f64 * 100.0 / self.total as f64)
    }

    /// Clickable regions, one per cell.
    pub fn regions(&self) -> Vec<CellRegion> {
        self.cells
            .iter()
            .map(|c| CellRegion {
                ix: c.ix,
                iy: c.iy,
                x_range: c.x_range,
                y_range: c.y_range,
                count: c.count(),
            })
            .collect()
    }

    /// Quantile `q` (0..=1) over every valid sample of one variable,
    /// whether or not it was binned.
    pub fn quantile_value(&self, axis: Axis, q: f64) -> Option<f64> {
        let sorted = match axis {
            Axis::X => &self.sorted_x,
            Axis::Y => &self.sorted_y,
        };
        quantile_sorted(sorted, q)
    }

    /// Overlay markers for both variables at the given percentiles (0..=100).
    pub fn quantile_markers(&self, percentiles: &[f64]) -> Vec<QuantileMarker> {
        let mut markers = Vec::with_capacity(percentiles.len() * 2);
        for axis in [Axis::X, Axis::Y] {
            for &p in percentiles {
                if let Some(value) = self.quantile_value(axis, p / 100.0) {
                    markers.push(QuantileMarker {
                        axis,
                        percentile: p,
                        value,
                    });
                }
            }
        }
        debug!(markers = markers.len(), "Computed quantile markers");
        markers
    }
}
