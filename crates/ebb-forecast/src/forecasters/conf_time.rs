//! Forecaster keyed on observed arrival-to-confirmation delay.
//!
//! Every confirmed transaction is filed into an hour-bucketed grid by how
//! long ago it arrived and how long it took to confirm. A query for
//! "confirm within N hours" then has two candidate samples: the *window*
//! (everything that arrived and confirmed within the last N hours) and the
//! *historical* reference (the same-width span one full day back, catching
//! daily fee cycles). The more conservative of the two — the one whose
//! 75th percentile is lower — wins.

use parking_lot::RwLock;
use tracing::debug;

use ebb_core::constants::{MAX_HOURS, SECONDS_IN_HOUR};
use ebb_core::error::ForecastError;
use ebb_core::traits::{Forecaster, MempoolSink};
use ebb_core::types::{BlockEvent, BlockPercentiles, FeeRate, Forecast, ForecasterKind};

use crate::linearize::linearize;
use crate::percentile::calculate_block_percentiles;

/// One confirmed transaction's contribution to the grid.
#[derive(Clone, Copy, Debug)]
struct ConfirmedTx {
    /// Mining score at confirmation time.
    fee_rate: FeeRate,
    vsize: u32,
}

/// Ragged two-level grid of confirmed transactions.
///
/// Cell `(i, j)`, `j <= i < MAX_HOURS`, holds transactions first seen
/// `i + 1` hours ago that confirmed `j + 1` hours after arrival. Fresh
/// confirmations land on the diagonal; the hourly shift moves every row
/// down one slot and drops the oldest. Memory is unbounded per cell but
/// capped in shape at `MAX_HOURS * (MAX_HOURS + 1) / 2` cells, and every
/// entry ages out of the grid within `MAX_HOURS` hours.
struct TrackingGrid {
    rows: Vec<Vec<Vec<ConfirmedTx>>>,
}

impl TrackingGrid {
    fn new() -> Self {
        Self { rows: (0..MAX_HOURS).map(|i| vec![Vec::new(); i + 1]).collect() }
    }

    /// File a confirmation with the given arrival-to-confirmation delay.
    ///
    /// Delays beyond the grid are dropped: the row they would occupy is
    /// about to age out anyway.
    fn insert(&mut self, delay_secs: u64, tx: ConfirmedTx) {
        let hours = delay_secs.div_ceil(SECONDS_IN_HOUR).max(1);
        let idx = (hours - 1) as usize;
        if idx >= MAX_HOURS {
            debug!(delay_secs, "confirmation delay beyond tracking grid, dropped");
            return;
        }
        self.rows[idx][idx].push(tx);
    }

    /// Age the grid by one hour: every row moves down one slot, a fresh
    /// empty row appears at the top, and the oldest row drops off.
    fn shift(&mut self) {
        self.rows.pop();
        self.rows.insert(0, vec![Vec::new()]);
        for (i, row) in self.rows.iter_mut().enumerate() {
            while row.len() < i + 1 {
                row.push(Vec::new());
            }
        }
    }

    /// Collect the `(rate, vsize)` sample of transactions that arrived
    /// between `start` and `end` hours ago (end inclusive, start
    /// exclusive) and confirmed within that same span.
    fn collect(&self, start: usize, end: usize) -> Vec<(FeeRate, u32)> {
        let mut sample = Vec::new();
        for i in end..start.min(MAX_HOURS) {
            for j in 0..=(i - end) {
                for tx in &self.rows[i][j] {
                    sample.push((tx.fee_rate, tx.vsize));
                }
            }
        }
        sample
    }
}

/// Percentiles of a grid sample, computed over the sample sorted
/// best-feerate-first like a linearization.
fn sample_percentiles(mut sample: Vec<(FeeRate, u32)>) -> BlockPercentiles {
    sample.sort_by(|a, b| b.0.cmp(&a.0));
    calculate_block_percentiles(&sample)
}

struct TrackerState {
    grid: TrackingGrid,
    last_height: u64,
}

/// Hour-horizon forecaster over observed confirmation delays.
pub struct ConfirmationTimeForecaster {
    state: RwLock<TrackerState>,
}

impl ConfirmationTimeForecaster {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(TrackerState { grid: TrackingGrid::new(), last_height: 0 }),
        }
    }

    /// Age the tracking grid by one hour.
    ///
    /// The host's scheduler calls this every
    /// [`STATS_UPDATE_INTERVAL_SECS`](ebb_core::constants::STATS_UPDATE_INTERVAL_SECS)
    /// seconds; nothing shifts implicitly.
    pub fn update_tracking_stats(&self) {
        self.state.write().grid.shift();
    }
}

impl Default for ConfirmationTimeForecaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Forecaster for ConfirmationTimeForecaster {
    fn kind(&self) -> ForecasterKind {
        ForecasterKind::ConfirmationTime
    }

    fn estimate_fee(&self, target: u32) -> Result<Forecast, ForecastError> {
        let max = self.max_target();
        if target == 0 || target > max {
            return Err(ForecastError::TargetOutOfRange { target, max });
        }

        let hours = target as usize;
        let state = self.state.read();

        let window = sample_percentiles(state.grid.collect(hours, 0));
        if window.is_empty() {
            return Err(ForecastError::InsufficientWindowSample { hours: target });
        }

        // The analogous span one full day back.
        let start = hours.div_ceil(24) * 24;
        let end = start - hours;
        let historical = sample_percentiles(state.grid.collect(start, end));
        if historical.is_empty() {
            return Err(ForecastError::InsufficientHistoricalSample);
        }

        let chosen = if historical.p75 < window.p75 { historical } else { window };
        Ok(Forecast {
            forecaster: self.kind(),
            block_height: state.last_height,
            low_priority: chosen.p25,
            high_priority: chosen.p50,
        })
    }

    fn max_target(&self) -> u32 {
        MAX_HOURS as u32
    }
}

impl MempoolSink for ConfirmationTimeForecaster {
    fn block_connected(&self, event: &BlockEvent) {
        // The block's mining scores price each transaction as mined.
        let lin = linearize(&event.removed, u64::MAX, &Default::default());
        let arrivals: std::collections::HashMap<_, _> =
            event.removed.iter().map(|e| (e.txid, e.arrival)).collect();

        let mut state = self.state.write();
        state.last_height = event.height;
        for stat in lin.mining_scores() {
            let arrival = arrivals.get(&stat.txid).copied().unwrap_or(event.time);
            let delay = event.time.saturating_sub(arrival);
            state.grid.insert(
                delay,
                ConfirmedTx { fee_rate: stat.fee_rate, vsize: stat.vsize },
            );
        }
    }
}
