//! Three-dimensional variable arrays and coregistered pairs.

use clickhist_common::{
    nearest_index_range, BoundingBox, ClickHistError, ClickHistResult, CoordinateGrid, FlatIndex,
    GridIndex, GridShape,
};

/// One variable on a `[time, lat, lon]` grid, stored row-major.
///
/// Missing data is stored as NaN; any non-finite value counts as missing.
#[derive(Debug, Clone)]
pub struct Field3D {
    pub name: String,
    shape: GridShape,
    values: Vec<f64>,
}

impl Field3D {
    pub fn new(name: impl Into<String>, shape: GridShape, values: Vec<f64>) -> ClickHistResult<Self> {
        let name = name.into();
        if values.len() != shape.len() {
            return Err(ClickHistError::DataReadError(format!(
                "variable '{}' has {} values, shape {:?} needs {}",
                name,
                values.len(),
                shape.as_array(),
                shape.len()
            )));
        }
        Ok(Self {
            name,
            shape,
            values,
        })
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value at a flat index (may be NaN).
    pub fn value(&self, flat: FlatIndex) -> Option<f64> {
        self.values.get(flat).copied()
    }

    /// Value at a flat index if it is present and finite.
    pub fn valid_value(&self, flat: FlatIndex) -> Option<f64> {
        self.value(flat).filter(|v| v.is_finite())
    }

    /// Number of finite values.
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_finite()).count()
    }

    /// Multiply every value by `factor` (unit conversion at load time).
    pub fn scaled(mut self, factor: f64) -> Self {
        if factor != 1.0 {
            for v in &mut self.values {
                *v *= factor;
            }
        }
        self
    }

    fn subset(
        &self,
        shape: GridShape,
        lat_range: (usize, usize),
        lon_range: (usize, usize),
    ) -> ClickHistResult<Field3D> {
        let mut values = Vec::with_capacity(shape.len());
        for t in 0..shape.n_time {
            for la in lat_range.0..=lat_range.1 {
                for lo in lon_range.0..=lon_range.1 {
                    let flat = self
                        .shape
                        .flatten(GridIndex::new(t, la, lo))
                        .ok_or_else(|| {
                            ClickHistError::Internal(format!(
                                "subset index ({}, {}, {}) outside {:?}",
                                t,
                                la,
                                lo,
                                self.shape.as_array()
                            ))
                        })?;
                    values.push(self.values[flat]);
                }
            }
        }
        Field3D::new(self.name.clone(), shape, values)
    }
}

/// Two variables sharing one coordinate grid.
#[derive(Debug, Clone)]
pub struct VariablePair {
    pub grid: CoordinateGrid,
    pub x: Field3D,
    pub y: Field3D,
}

impl VariablePair {
    /// Pair two fields, requiring both to match the grid's shape exactly.
    pub fn new(grid: CoordinateGrid, x: Field3D, y: Field3D) -> ClickHistResult<Self> {
        if x.shape() != y.shape() {
            return Err(ClickHistError::ShapeMismatch {
                x: x.shape().as_array(),
                y: y.shape().as_array(),
            });
        }
        if x.shape() != grid.shape() {
            return Err(ClickHistError::ShapeMismatch {
                x: x.shape().as_array(),
                y: grid.shape().as_array(),
            });
        }
        Ok(Self { grid, x, y })
    }

    pub fn shape(&self) -> GridShape {
        self.grid.shape()
    }

    /// Trim both fields to the lon/lat indices nearest the box corners.
    ///
    /// All time steps are kept.
    pub fn subset(&self, bounds: &BoundingBox) -> ClickHistResult<VariablePair> {
        let lat_range = nearest_index_range(&self.grid.lat, bounds.min_lat, bounds.max_lat)
            .ok_or_else(|| ClickHistError::DataReadError("no finite latitudes".to_string()))?;
        let lon_range = nearest_index_range(&self.grid.lon, bounds.min_lon, bounds.max_lon)
            .ok_or_else(|| ClickHistError::DataReadError("no finite longitudes".to_string()))?;

        let lat = self.grid.lat[lat_range.0..=lat_range.1].to_vec();
        let lon = self.grid.lon[lon_range.0..=lon_range.1].to_vec();
        let grid = CoordinateGrid::new(self.grid.time.clone(), lat, lon)?;
        let shape = grid.shape();

        let x = self.x.subset(shape, lat_range, lon_range)?;
        let y = self.y.subset(shape, lat_range, lon_range)?;

        tracing::debug!(
            lat_start = lat_range.0,
            lat_end = lat_range.1,
            lon_start = lon_range.0,
            lon_end = lon_range.1,
            samples = shape.len(),
            "Subset variable pair"
        );

        VariablePair::new(grid, x, y)
    }
}
