//! Error types for the Ebb forecasting core.
use thiserror::Error;

/// Why a forecaster could not produce an estimate.
///
/// Every forecaster failure is reported through this type; nothing panics
/// across the public surface. The aggregator collects one of these per
/// failing forecaster so callers can see why each source declined.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForecastError {
    #[error("confirmation target {target} is outside the supported range 1..={max}, estimates beyond it are unreliable")] TargetOutOfRange { target: u32, max: u32 },
    #[error("mempool not finished loading, fee estimates would be inaccurate")] MempoolNotLoaded,
    #[error("mempool is not in sync with recently mined blocks")] NotInSync,
    #[error("no transactions available in the mempool yet")] EmptyMempool,
    #[error("insufficient mempool transactions to perform an estimate")] InsufficientSample,
    #[error("no block observed since startup")] NoBlockSeen,
    #[error("tracked block history has {have} of {need} required blocks")] InsufficientBlockHistory { have: usize, need: usize },
    #[error("not enough confirmed transactions in the last {hours} hours")] InsufficientWindowSample { hours: u32 },
    #[error("not enough confirmed transactions in the prior-day reference window")] InsufficientHistoricalSample,
}
