//! Common types shared by the clickhist engine and the CHAD service.

pub mod bbox;
pub mod error;
pub mod grid;
pub mod time;

pub use bbox::BoundingBox;
pub use error::{ClickHistError, ClickHistResult};
pub use grid::{nearest_index_range, CoordinateGrid, FlatIndex, GridIndex, GridPoint, GridShape};
pub use time::{TimeAxis, TimeUnits, TimeWindow};
