//! # ebb-forecast
//! The forecasting engine: block-template linearization, percentile math,
//! cached estimates, the miner-sync gate, notification dispatch, the
//! individual forecasters, and the aggregator that fronts them.

pub mod cache;
pub mod estimator;
pub mod forecasters;
pub mod gate;
pub mod linearize;
pub mod percentile;
pub mod signals;
