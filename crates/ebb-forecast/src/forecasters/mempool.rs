//! Mempool-simulation forecasters.
//!
//! [`MempoolForecaster`] simulates the next block from the current mempool
//! and answers from its percentiles. [`RecentMempoolForecaster`] runs the
//! same pipeline but double-counts transactions that arrived in the last
//! ten minutes, biasing the estimate toward fee bursts in progress.
//!
//! Both refuse to answer while the mempool is still loading, and both
//! cache their per-target percentiles so repeated calls do not retake
//! host locks.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use ebb_core::constants::{
    DEFAULT_BLOCK_MAX_WEIGHT, MAX_UNCONFIRMED_TEMPLATE_MISSES, MEMPOOL_FORECAST_MAX_TARGET,
    RECENT_MEMPOOL_FORECAST_MAX_TARGET, RECENT_TX_WINDOW_SECS,
};
use ebb_core::error::ForecastError;
use ebb_core::traits::{ChainView, Forecaster, MempoolSink, MempoolSource};
use ebb_core::types::{
    BlockEvent, BlockPercentiles, FeeRate, Forecast, ForecasterKind, TxRemovedEvent, Txid,
};

use crate::cache::EstimateCache;
use crate::linearize::linearize;
use crate::percentile::estimate_block_percentiles;

/// Turn one simulated block's percentiles into a forecast, or refuse when
/// the simulation could not even fill three quarters of a block.
fn forecast_from_percentiles(
    kind: ForecasterKind,
    block_height: u64,
    percentiles: &BlockPercentiles,
) -> Result<Forecast, ForecastError> {
    if percentiles.is_empty() || percentiles.p75 == FeeRate::ZERO {
        return Err(ForecastError::InsufficientSample);
    }
    Ok(Forecast {
        forecaster: kind,
        block_height,
        low_priority: percentiles.p25,
        high_priority: percentiles.p50,
    })
}

/// Next-block fee forecaster over the live mempool.
///
/// Also tracks, per transaction, how many consecutive expected block
/// templates it has missed: a transaction miners keep leaving out (for
/// policy reasons this node cannot see) stops being simulated after
/// [`MAX_UNCONFIRMED_TEMPLATE_MISSES`] misses so it cannot pin the
/// estimate.
pub struct MempoolForecaster {
    mempool: Arc<dyn MempoolSource>,
    chain: Arc<dyn ChainView>,
    cache: EstimateCache,
    template_misses: Mutex<HashMap<Txid, u32>>,
}

impl MempoolForecaster {
    pub fn new(mempool: Arc<dyn MempoolSource>, chain: Arc<dyn ChainView>) -> Self {
        Self {
            mempool,
            chain,
            cache: EstimateCache::new(),
            template_misses: Mutex::new(HashMap::new()),
        }
    }

    /// Txids excluded from simulation for repeatedly missing templates.
    fn excluded_txids(&self) -> HashSet<Txid> {
        self.template_misses
            .lock()
            .iter()
            .filter(|(_, misses)| **misses >= MAX_UNCONFIRMED_TEMPLATE_MISSES)
            .map(|(txid, _)| *txid)
            .collect()
    }
}

impl Forecaster for MempoolForecaster {
    fn kind(&self) -> ForecasterKind {
        ForecasterKind::Mempool
    }

    fn estimate_fee(&self, target: u32) -> Result<Forecast, ForecastError> {
        let max = self.max_target();
        if target == 0 || target > max {
            return Err(ForecastError::TargetOutOfRange { target, max });
        }
        if !self.mempool.load_tried() {
            return Err(ForecastError::MempoolNotLoaded);
        }

        if let Some(cached) = self.cache.get(target) {
            return forecast_from_percentiles(
                self.kind(),
                self.chain.active_tip_height(),
                &cached,
            );
        }

        let snapshot = self.mempool.snapshot();
        if snapshot.is_empty() {
            return Err(ForecastError::EmptyMempool);
        }

        let excluded = self.excluded_txids();
        let lin = linearize(
            &snapshot.entries,
            DEFAULT_BLOCK_MAX_WEIGHT * u64::from(max),
            &excluded,
        );
        let stats = lin.fee_rate_stats();
        let per_target = estimate_block_percentiles(&stats, max);
        self.cache.update(per_target.clone());

        let percentiles = per_target
            .get(&target)
            .copied()
            .ok_or(ForecastError::InsufficientSample)?;
        forecast_from_percentiles(self.kind(), snapshot.tip_height, &percentiles)
    }

    fn max_target(&self) -> u32 {
        MEMPOOL_FORECAST_MAX_TARGET
    }
}

impl MempoolSink for MempoolForecaster {
    fn transaction_removed(&self, event: &TxRemovedEvent) {
        // Gone from the mempool entirely; no further misses to count.
        self.template_misses.lock().remove(&event.txid);
    }

    fn block_connected(&self, event: &BlockEvent) {
        let mined: HashSet<Txid> = event.block_txs.iter().map(|tx| tx.txid).collect();
        let mut misses = self.template_misses.lock();
        for txid in &event.expected_template {
            if mined.contains(txid) {
                misses.remove(txid);
            } else {
                let count = misses.entry(*txid).or_insert(0);
                *count += 1;
                if *count == MAX_UNCONFIRMED_TEMPLATE_MISSES {
                    debug!(%txid, "transaction excluded from block simulation");
                }
            }
        }
    }
}

/// Mempool forecaster biased toward the last ten minutes of arrivals.
///
/// Transactions that entered the mempool within [`RECENT_TX_WINDOW_SECS`]
/// of the snapshot contribute their `(rate, vsize)` sample twice, in both
/// weight accumulation and the sample stream, so a burst of traffic can
/// raise the estimate up to twofold before a block confirms it.
pub struct RecentMempoolForecaster {
    mempool: Arc<dyn MempoolSource>,
    chain: Arc<dyn ChainView>,
    cache: EstimateCache,
}

impl RecentMempoolForecaster {
    pub fn new(mempool: Arc<dyn MempoolSource>, chain: Arc<dyn ChainView>) -> Self {
        Self { mempool, chain, cache: EstimateCache::new() }
    }
}

impl Forecaster for RecentMempoolForecaster {
    fn kind(&self) -> ForecasterKind {
        ForecasterKind::RecentMempool
    }

    fn estimate_fee(&self, target: u32) -> Result<Forecast, ForecastError> {
        let max = self.max_target();
        if target == 0 || target > max {
            return Err(ForecastError::TargetOutOfRange { target, max });
        }
        if !self.mempool.load_tried() {
            return Err(ForecastError::MempoolNotLoaded);
        }

        if let Some(cached) = self.cache.get(target) {
            return forecast_from_percentiles(
                self.kind(),
                self.chain.active_tip_height(),
                &cached,
            );
        }

        let snapshot = self.mempool.snapshot();
        if snapshot.is_empty() {
            return Err(ForecastError::EmptyMempool);
        }

        let arrivals: HashMap<Txid, u64> = snapshot
            .entries
            .iter()
            .map(|e| (e.txid, e.arrival))
            .collect();
        let lin = linearize(
            &snapshot.entries,
            DEFAULT_BLOCK_MAX_WEIGHT * u64::from(max),
            &HashSet::new(),
        );

        // Recent transactions are emitted twice into the sample stream.
        let mut stats: Vec<(FeeRate, u32)> = Vec::with_capacity(lin.mining_scores().len());
        for stat in lin.mining_scores() {
            stats.push((stat.fee_rate, stat.vsize));
            let arrival = arrivals.get(&stat.txid).copied().unwrap_or(0);
            if snapshot.taken_at.saturating_sub(arrival) <= RECENT_TX_WINDOW_SECS {
                stats.push((stat.fee_rate, stat.vsize));
            }
        }

        let per_target = estimate_block_percentiles(&stats, max);
        self.cache.update(per_target.clone());

        let percentiles = per_target
            .get(&target)
            .copied()
            .ok_or(ForecastError::InsufficientSample)?;
        forecast_from_percentiles(self.kind(), snapshot.tip_height, &percentiles)
    }

    fn max_target(&self) -> u32 {
        RECENT_MEMPOOL_FORECAST_MAX_TARGET
    }
}
