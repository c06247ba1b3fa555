//! Bounded, reproducible point sampling within a histogram cell.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use clickhist_common::FlatIndex;

use crate::field::VariablePair;
use crate::histogram::{Axis, HistogramCell, QuantileMarker};
use crate::stats::{quantile_sorted, sorted_finite};

/// A displayed point: a member of a cell plus its two values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampledPoint {
    pub index: FlatIndex,
    pub x: f64,
    pub y: f64,
}

/// Summary statistics for one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinSummary {
    pub ix: usize,
    pub iy: usize,
    pub count: usize,
    pub x_min: f64,
    pub x_max: f64,
    pub x_mean: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub y_mean: f64,
    pub markers: Vec<QuantileMarker>,
}

/// Picks at most `max_points` members of a cell for display.
///
/// Cells at or under the cap are shown in full. Larger cells get a uniform
/// sample without replacement, drawn from a generator seeded with `seed`
/// when one is set and from OS entropy otherwise. Output is always sorted
/// by flat index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinSampler {
    max_points: usize,
    seed: Option<u64>,
}

impl BinSampler {
    pub fn new(max_points: usize) -> Self {
        Self {
            max_points,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Sample a cell using the configured seed.
    pub fn sample(&self, cell: &HistogramCell, pair: &VariablePair) -> Vec<SampledPoint> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.sample_with_rng(cell, pair, &mut rng)
    }

    /// Sample a cell with a caller-supplied generator.
    pub fn sample_with_rng<R: Rng + ?Sized>(
        &self,
        cell: &HistogramCell,
        pair: &VariablePair,
        rng: &mut R,
    ) -> Vec<SampledPoint> {
        let members = cell.members();

        let mut chosen: Vec<FlatIndex> = if members.len() <= self.max_points {
            members.to_vec()
        } else {
            rand::seq::index::sample(rng, members.len(), self.max_points)
                .into_iter()
                .map(|i| members[i])
                .collect()
        };
        chosen.sort_unstable();

        tracing::debug!(
            ix = cell.ix,
            iy = cell.iy,
            count = members.len(),
            shown = chosen.len(),
            "Sampled cell"
        );

        chosen
            .into_iter()
            .map(|index| SampledPoint {
                index,
                x: pair.x.value(index).unwrap_or(f64::NAN),
                y: pair.y.value(index).unwrap_or(f64::NAN),
            })
            .collect()
    }

    /// Count, extremes, means and per-cell quantile markers over all members
    /// (not just the displayed sample).
    pub fn summarize(
        &self,
        cell: &HistogramCell,
        pair: &VariablePair,
        percentiles: &[f64],
    ) -> BinSummary {
        let xs = sorted_finite(cell.members().iter().filter_map(|&i| pair.x.value(i)));
        let ys = sorted_finite(cell.members().iter().filter_map(|&i| pair.y.value(i)));

        let mut markers = Vec::with_capacity(percentiles.len() * 2);
        for (axis, sorted) in [(Axis::X, &xs), (Axis::Y, &ys)] {
            for &p in percentiles {
                if let Some(value) = quantile_sorted(sorted, p / 100.0) {
                    markers.push(QuantileMarker {
                        axis,
                        percentile: p,
                        value,
                    });
                }
            }
        }

        BinSummary {
            ix: cell.ix,
            iy: cell.iy,
            count: cell.count(),
            x_min: xs.first().copied().unwrap_or(f64::NAN),
            x_max: xs.last().copied().unwrap_or(f64::NAN),
            x_mean: mean(&xs),
            y_min: ys.first().copied().unwrap_or(f64::NAN),
            y_max: ys.last().copied().unwrap_or(f64::NAN),
            y_mean: mean(&ys),
            markers,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
