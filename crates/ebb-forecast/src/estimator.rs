//! The fee estimator: a registry of forecasters and the policy for
//! picking among their answers.
//!
//! Every registered forecaster is asked with the same target; among the
//! successful answers the *lowest* high-priority rate wins (ties broken by
//! the lower low-priority rate). Forecaster identity never factors into
//! selection. Failures are collected so callers can see why each source
//! declined.

use std::sync::Arc;

use tracing::{debug, info};

use ebb_core::error::ForecastError;
use ebb_core::traits::{Forecaster, MempoolSink, MempoolSource, ChainView};
use ebb_core::types::Forecast;

use crate::forecasters::{
    BlockAverageForecaster, ConfirmationTimeForecaster, LastBlockForecaster, MempoolForecaster,
    RecentMempoolForecaster,
};
use crate::gate::InSyncGate;
use crate::signals::NotificationHub;

/// The outcome of asking every registered forecaster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregateEstimate {
    /// The winning forecast, if any forecaster succeeded.
    pub forecast: Option<Forecast>,
    /// One error per forecaster that declined.
    pub errors: Vec<ForecastError>,
}

/// Registry and selection front-end over the individual forecasters.
pub struct FeeEstimator {
    forecasters: Vec<Arc<dyn Forecaster>>,
}

impl FeeEstimator {
    pub fn new() -> Self {
        Self { forecasters: Vec::new() }
    }

    /// Build the full default forecaster set, wired to the given mempool,
    /// chain view, and notification hub.
    ///
    /// The returned handles keep the subscriptions alive for as long as
    /// the estimator itself lives: the confirmation-time forecaster so the
    /// host can drive its hourly grid shift, and the sync gate as the
    /// queryable miner-alignment predicate.
    pub fn with_default_forecasters(
        mempool: Arc<dyn MempoolSource>,
        chain: Arc<dyn ChainView>,
        hub: &NotificationHub,
    ) -> (Self, Arc<ConfirmationTimeForecaster>, Arc<InSyncGate>) {
        let gate = Arc::new(InSyncGate::new());
        let gate_sink: Arc<dyn MempoolSink> = gate.clone();
        hub.subscribe(&gate_sink);

        let mempool_forecaster =
            Arc::new(MempoolForecaster::new(mempool.clone(), chain.clone()));
        let recent = Arc::new(RecentMempoolForecaster::new(mempool, chain));
        let last_block = Arc::new(LastBlockForecaster::new());
        let block_average = Arc::new(BlockAverageForecaster::new());
        let conf_time = Arc::new(ConfirmationTimeForecaster::new());

        let sinks: [Arc<dyn MempoolSink>; 4] = [
            mempool_forecaster.clone(),
            last_block.clone(),
            block_average.clone(),
            conf_time.clone(),
        ];
        for sink in &sinks {
            hub.subscribe(sink);
        }

        let mut estimator = Self::new();
        estimator.register(mempool_forecaster);
        estimator.register(recent);
        estimator.register(last_block);
        estimator.register(block_average);
        estimator.register(conf_time.clone());

        (estimator, conf_time, gate)
    }

    /// Register a forecaster. Registration order is irrelevant to
    /// selection.
    pub fn register(&mut self, forecaster: Arc<dyn Forecaster>) {
        self.forecasters.push(forecaster);
    }

    /// The largest target any registered forecaster answers.
    pub fn max_target(&self) -> u32 {
        self.forecasters
            .iter()
            .map(|f| f.max_target())
            .max()
            .unwrap_or(0)
    }

    /// Ask every forecaster for `target` and keep the cheapest answer.
    pub fn estimate(&self, target: u32) -> AggregateEstimate {
        let mut best: Option<Forecast> = None;
        let mut errors = Vec::new();

        for forecaster in &self.forecasters {
            match forecaster.estimate_fee(target) {
                Ok(forecast) => {
                    let cheaper = match &best {
                        None => true,
                        Some(current) => {
                            (forecast.high_priority, forecast.low_priority)
                                < (current.high_priority, current.low_priority)
                        }
                    };
                    if cheaper {
                        best = Some(forecast);
                    }
                }
                Err(error) => {
                    debug!(forecaster = %forecaster.kind(), target, %error, "forecaster declined");
                    errors.push(error);
                }
            }
        }

        if let Some(forecast) = &best {
            info!(
                forecaster = %forecast.forecaster,
                block_height = forecast.block_height,
                low_priority = %forecast.low_priority,
                high_priority = %forecast.high_priority,
                "fee estimate selected"
            );
        }

        AggregateEstimate { forecast: best, errors }
    }
}

impl Default for FeeEstimator {
    fn default() -> Self {
        Self::new()
    }
}
