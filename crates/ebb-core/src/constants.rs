//! Protocol and forecasting constants. All fee values are in satoshis,
//! all rates in sat/kvB, all sizes in virtual bytes unless stated otherwise.

/// Factor relating virtual size to block weight (`weight = vsize * 4`).
pub const WITNESS_SCALE_FACTOR: u64 = 4;

/// Maximum weight of a block template in weight units.
///
/// The consensus block weight limit minus the space reserved for the
/// coinbase transaction, so a simulated block matches what a miner can
/// actually fill with mempool transactions.
pub const DEFAULT_BLOCK_MAX_WEIGHT: u64 = 3_996_000;

/// Highest confirmation target (in blocks) the mempool forecaster answers.
///
/// Mempool conditions can change quickly; estimates beyond the next block
/// are unreliable and are refused rather than extrapolated.
pub const MEMPOOL_FORECAST_MAX_TARGET: u32 = 1;

/// Highest confirmation target (in blocks) of the recent-mempool forecaster.
pub const RECENT_MEMPOOL_FORECAST_MAX_TARGET: u32 = 2;

/// Highest confirmation target (in blocks) of the last-block forecaster.
pub const LAST_BLOCK_FORECAST_MAX_TARGET: u32 = 2;

/// Highest confirmation target (in blocks) of the block-average forecaster.
pub const BLOCK_FORECAST_MAX_TARGET: u32 = 2;

/// Number of recent blocks averaged by the block-average forecaster.
pub const MAX_NUMBER_OF_BLOCKS: usize = 3;

/// Mempool arrival window (seconds) within which the recent-mempool
/// forecaster counts a transaction twice.
pub const RECENT_TX_WINDOW_SECS: u64 = 600;

/// Highest target, in hours, of the confirmation-time forecaster. Also the
/// number of rows in its tracking grid (three weeks of hourly buckets).
pub const MAX_HOURS: usize = 504;

pub const SECONDS_IN_HOUR: u64 = 3_600;

/// How long a cached estimate map stays fresh.
pub const CACHE_LIFE_SECS: u64 = 30;

/// Interval at which the confirmation-time tracking grid is shifted.
pub const STATS_UPDATE_INTERVAL_SECS: u64 = SECONDS_IN_HOUR;

/// Number of consecutive block templates a transaction may miss before the
/// mempool forecaster excludes it from further simulated blocks.
pub const MAX_UNCONFIRMED_TEMPLATE_MISSES: u32 = 5;
