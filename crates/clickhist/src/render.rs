//! Presentation seam.
//!
//! The engine never draws anything itself. A [`Renderer`] receives plain
//! data (regions, samples, markers, records) and decides how to show it.

use crate::histogram::{CellRegion, HistogramCell, QuantileMarker};
use crate::recorder::CaseRecord;
use crate::sampler::SampledPoint;
use crate::selection::ResolvedPoint;

/// Severity of a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

impl MessageLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageLevel::Info => "info",
            MessageLevel::Warning => "warning",
            MessageLevel::Error => "error",
        }
    }
}

pub trait Renderer {
    /// Draw the joint histogram as clickable regions.
    fn show_histogram(&mut self, title: &str, regions: &[CellRegion]);

    /// Draw the sampled points of an open cell.
    fn show_sample(&mut self, cell: &HistogramCell, points: &[SampledPoint]);

    /// Draw quantile markers over the current view.
    fn show_overlay(&mut self, markers: &[QuantileMarker]);

    /// Highlight the selected point.
    fn show_selection(&mut self, point: &ResolvedPoint);

    /// Report a freshly recorded case.
    fn show_case(&mut self, record: &CaseRecord);

    fn show_message(&mut self, level: MessageLevel, text: &str);
}
