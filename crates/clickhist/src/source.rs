//! Data sources that produce coregistered variable pairs.

use async_trait::async_trait;
use tracing::{info, instrument};

use clickhist_common::{BoundingBox, ClickHistError, ClickHistResult};

use crate::field::VariablePair;

/// Trait for sources that can deliver both variables for a region.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch both variables over `bounds`, all time steps, with multipliers
    /// already applied.
    async fn fetch_window(&self, bounds: &BoundingBox) -> ClickHistResult<VariablePair>;
}

/// A source backed by a pair that is already loaded.
///
/// Requests are served by nearest-index subsetting of the loaded grid.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    pair: VariablePair,
}

impl InMemorySource {
    pub fn new(pair: VariablePair) -> Self {
        Self { pair }
    }

    pub fn pair(&self) -> &VariablePair {
        &self.pair
    }
}

#[async_trait]
impl DataSource for InMemorySource {
    #[instrument(skip(self), fields(x = %self.pair.x.name, y = %self.pair.y.name))]
    async fn fetch_window(&self, bounds: &BoundingBox) -> ClickHistResult<VariablePair> {
        bounds.validate()?;
        let pair = self.pair.subset(bounds)?;
        if pair.shape().is_empty() {
            return Err(ClickHistError::DataReadError(format!(
                "no samples within {}",
                bounds.describe()
            )));
        }
        info!(
            shape = ?pair.shape().as_array(),
            region = %bounds.describe(),
            "Fetched window"
        );
        Ok(pair)
    }
}
