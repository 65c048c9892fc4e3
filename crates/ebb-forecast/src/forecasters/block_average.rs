//! Forecaster averaging percentiles over the last few mined blocks.
//!
//! One block can be an outlier (a lucky low-fee block right after a burst,
//! or a stuffed one). Averaging each quantile across a short FIFO of
//! recent blocks smooths that out, at the cost of refusing to answer until
//! the window has filled.

use std::collections::VecDeque;

use parking_lot::RwLock;
use tracing::debug;

use ebb_core::constants::{BLOCK_FORECAST_MAX_TARGET, MAX_NUMBER_OF_BLOCKS};
use ebb_core::error::ForecastError;
use ebb_core::traits::{Forecaster, MempoolSink};
use ebb_core::types::{BlockEvent, BlockPercentiles, FeeRate, Forecast, ForecasterKind};

use super::last_block::block_percentiles;

/// Rolling window of per-block percentiles, newest at the back.
pub struct BlockAverageForecaster {
    window: RwLock<VecDeque<(u64, BlockPercentiles)>>,
}

impl BlockAverageForecaster {
    pub fn new() -> Self {
        Self { window: RwLock::new(VecDeque::with_capacity(MAX_NUMBER_OF_BLOCKS)) }
    }
}

impl Default for BlockAverageForecaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Arithmetic mean of one quantile across the window.
fn mean_rate(window: &VecDeque<(u64, BlockPercentiles)>, pick: fn(&BlockPercentiles) -> FeeRate) -> FeeRate {
    let sum: u64 = window.iter().map(|(_, p)| pick(p).sat_per_kvb()).sum();
    FeeRate::from_sat_per_kvb(sum / window.len() as u64)
}

impl Forecaster for BlockAverageForecaster {
    fn kind(&self) -> ForecasterKind {
        ForecasterKind::BlockAverage
    }

    fn estimate_fee(&self, target: u32) -> Result<Forecast, ForecastError> {
        let max = self.max_target();
        if target == 0 || target > max {
            return Err(ForecastError::TargetOutOfRange { target, max });
        }

        let window = self.window.read();
        if window.len() < MAX_NUMBER_OF_BLOCKS {
            return Err(ForecastError::InsufficientBlockHistory {
                have: window.len(),
                need: MAX_NUMBER_OF_BLOCKS,
            });
        }

        let height = window.back().map(|(height, _)| *height).unwrap_or(0);
        Ok(Forecast {
            forecaster: self.kind(),
            block_height: height,
            low_priority: mean_rate(&window, |p| p.p25),
            high_priority: mean_rate(&window, |p| p.p50),
        })
    }

    fn max_target(&self) -> u32 {
        BLOCK_FORECAST_MAX_TARGET
    }
}

impl MempoolSink for BlockAverageForecaster {
    fn block_connected(&self, event: &BlockEvent) {
        let percentiles = block_percentiles(event);
        if percentiles.is_empty() {
            debug!(height = event.height, "block too thin for the rolling average");
            return;
        }
        let mut window = self.window.write();
        if window.len() == MAX_NUMBER_OF_BLOCKS {
            window.pop_front();
        }
        window.push_back((event.height, percentiles));
    }
}
