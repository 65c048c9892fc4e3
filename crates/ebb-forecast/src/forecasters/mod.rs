//! The individual fee forecasters.
//!
//! Each forecaster owns its private state, implements
//! [`Forecaster`](ebb_core::traits::Forecaster), and — where it needs to
//! observe the chain — [`MempoolSink`](ebb_core::traits::MempoolSink).

pub mod block_average;
pub mod conf_time;
pub mod last_block;
pub mod mempool;

pub use block_average::BlockAverageForecaster;
pub use conf_time::ConfirmationTimeForecaster;
pub use last_block::LastBlockForecaster;
pub use mempool::{MempoolForecaster, RecentMempoolForecaster};
