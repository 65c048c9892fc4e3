//! Forecaster answering from the most recently mined block.
//!
//! A connected block is a complete linearization: the set of transactions
//! it pulled out of our mempool, chunked by the same rules the simulator
//! uses. Its percentiles describe what confirming *actually* cost, which
//! makes this the natural cross-check for the mempool simulation.

use parking_lot::RwLock;
use tracing::debug;

use ebb_core::constants::LAST_BLOCK_FORECAST_MAX_TARGET;
use ebb_core::error::ForecastError;
use ebb_core::traits::{Forecaster, MempoolSink};
use ebb_core::types::{BlockEvent, BlockPercentiles, Forecast, ForecasterKind};

use crate::linearize::linearize;
use crate::percentile::calculate_block_percentiles;

/// Compute the percentile set of a connected block's removed-set.
pub(crate) fn block_percentiles(event: &BlockEvent) -> BlockPercentiles {
    // No weight cap: the block already is exactly one block.
    let lin = linearize(&event.removed, u64::MAX, &Default::default());
    calculate_block_percentiles(&lin.fee_rate_stats())
}

/// Percentiles of the latest usable block, replaced as blocks connect.
pub struct LastBlockForecaster {
    latest: RwLock<Option<(u64, BlockPercentiles)>>,
}

impl LastBlockForecaster {
    pub fn new() -> Self {
        Self { latest: RwLock::new(None) }
    }
}

impl Default for LastBlockForecaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Forecaster for LastBlockForecaster {
    fn kind(&self) -> ForecasterKind {
        ForecasterKind::LastBlock
    }

    fn estimate_fee(&self, target: u32) -> Result<Forecast, ForecastError> {
        let max = self.max_target();
        if target == 0 || target > max {
            return Err(ForecastError::TargetOutOfRange { target, max });
        }

        let latest = self.latest.read();
        let (height, percentiles) = latest.as_ref().ok_or(ForecastError::NoBlockSeen)?;
        Ok(Forecast {
            forecaster: self.kind(),
            block_height: *height,
            low_priority: percentiles.p25,
            high_priority: percentiles.p50,
        })
    }

    fn max_target(&self) -> u32 {
        LAST_BLOCK_FORECAST_MAX_TARGET
    }
}

impl MempoolSink for LastBlockForecaster {
    fn block_connected(&self, event: &BlockEvent) {
        let percentiles = block_percentiles(event);
        if percentiles.is_empty() {
            // A thin or unobserved block; keep the previous estimate.
            debug!(height = event.height, "block too thin for percentiles, keeping previous");
            return;
        }
        *self.latest.write() = Some((event.height, percentiles));
    }
}
