//! Binned selection and case capture for paired gridded datasets.
//!
//! Two coregistered `[time, lat, lon]` variables are binned into a joint
//! histogram. Clicking a bin shows a bounded, reproducible sample of the
//! points inside it; picking one of those points resolves it back to its
//! exact time, latitude and longitude, and confirming the pick records a
//! case: a spatio-temporal window handed to an artifact emitter plus an
//! entry in the session's append-only case log.
//!
//! # Architecture
//!
//! ```text
//! DataSource::fetch_window(bounds)
//!      │
//!      ▼
//! VariablePair ──► JointHistogram::build(x, y, edges_x, edges_y)
//!                        │
//!        SessionEvent::CellClick(ix, iy)
//!                        ▼
//!               BinSampler::sample(cell)  ──► Renderer::show_sample
//!                        │
//!        SessionEvent::PointClick(flat)
//!                        ▼
//!          SelectionController::click_point ──► ResolvedPoint
//!                        │
//!        SessionEvent::Confirm
//!                        ▼
//!          CaseRecorder::record ──► ArtifactEmitter + CaseLog + SessionLog
//! ```
//!
//! # Example
//!
//! ```ignore
//! let histogram = JointHistogram::build(&pair.x, &pair.y, &config.x.edges, &config.y.edges)?;
//! let mut session = ExploreSession::new(controller, recorder, renderer, config.quantiles.clone());
//! session.start();
//! session.handle(SessionEvent::CellClick { ix: 1, iy: 1 }).await;
//! ```

pub mod config;
pub mod field;
pub mod histogram;
pub mod recorder;
pub mod render;
pub mod sampler;
pub mod selection;
pub mod session;
pub mod source;
pub mod stats;
pub mod variables;

pub use clickhist_common::{
    BoundingBox, ClickHistError, ClickHistResult, CoordinateGrid, FlatIndex, GridIndex,
    GridPoint, GridShape, TimeAxis, TimeUnits, TimeWindow,
};
pub use config::ClickHistConfig;
pub use field::{Field3D, VariablePair};
pub use histogram::{Axis, BinEdges, CellRegion, HistogramCell, JointHistogram, QuantileMarker};
pub use recorder::{
    ArtifactEmitter, ArtifactHandle, ArtifactRequest, CaseLog, CaseRecord, CaseRecorder,
    CaseWindow, SessionLog, WindowConfig,
};
pub use render::{MessageLevel, Renderer};
pub use sampler::{BinSampler, BinSummary, SampledPoint};
pub use selection::{CellClick, ResolvedPoint, SelectionController, SelectionState};
pub use session::{ExploreSession, SessionEvent, SessionOutcome};
pub use source::{DataSource, InMemorySource};
pub use variables::{VariableMetadata, VariableSpec};
