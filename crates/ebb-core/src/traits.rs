//! Trait interfaces for the Ebb forecasting core.
//!
//! These traits define the contracts between the core and its host node:
//! - [`MempoolSource`] — consistent mempool snapshots (host implements)
//! - [`ChainView`] — read-only chain tip access (host implements)
//! - [`MempoolSink`] — mempool/block notifications (forecasters implement)
//! - [`Forecaster`] — fee estimation (ebb-forecast implements)

use crate::error::ForecastError;
use crate::types::{BlockEvent, Forecast, ForecasterKind, MempoolSnapshot, TxAddedEvent, TxRemovedEvent};

/// Source of consistent mempool snapshots.
///
/// Implementations must present a single moment's view: the host takes its
/// chainstate lock and then its mempool lock for the duration of
/// [`snapshot`](Self::snapshot), and releases both before returning, so
/// the core never computes while holding host locks.
pub trait MempoolSource: Send + Sync {
    /// Take a consistent snapshot of the current mempool.
    fn snapshot(&self) -> MempoolSnapshot;

    /// Whether an initial mempool load has been attempted.
    ///
    /// Estimates before the mempool finishes loading would systematically
    /// undershoot, so forecasters refuse until this returns true.
    fn load_tried(&self) -> bool;
}

/// Read-only view of the active chain.
pub trait ChainView: Send + Sync {
    /// Height of the active chain tip.
    fn active_tip_height(&self) -> u64;
}

/// Subscriber to mempool and block notifications.
///
/// Callbacks are delivered on a background thread, serialized per
/// subscriber. Transactions removed because of a connected block are
/// delivered as [`transaction_removed`](Self::transaction_removed) events
/// *before* the [`block_connected`](Self::block_connected) event for that
/// block; when several blocks connect at once, all removals precede all
/// block events, which arrive in height order.
pub trait MempoolSink: Send + Sync {
    /// A transaction entered the mempool.
    fn transaction_added(&self, _event: &TxAddedEvent) {}

    /// A transaction left the mempool for a reason other than being mined.
    fn transaction_removed(&self, _event: &TxRemovedEvent) {}

    /// A block was connected to the active chain.
    fn block_connected(&self, _event: &BlockEvent) {}
}

/// A fee-rate forecaster.
///
/// Implementations never panic out of [`estimate_fee`](Self::estimate_fee);
/// every failure is a [`ForecastError`].
pub trait Forecaster: Send + Sync {
    /// Which forecaster this is, for logs and forecast attribution.
    fn kind(&self) -> ForecasterKind;

    /// Estimate the fee rate to confirm within `target` units
    /// (blocks for the block-horizon forecasters, hours for the
    /// confirmation-time tracker).
    fn estimate_fee(&self, target: u32) -> Result<Forecast, ForecastError>;

    /// The largest target this forecaster answers.
    fn max_target(&self) -> u32;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FeeRate, SnapshotEntry, Txid};

    // ------------------------------------------------------------------
    // Mock: MempoolSource
    // ------------------------------------------------------------------

    struct MockMempool {
        entries: Vec<SnapshotEntry>,
        loaded: bool,
    }

    impl MempoolSource for MockMempool {
        fn snapshot(&self) -> MempoolSnapshot {
            MempoolSnapshot {
                tip_height: 100,
                taken_at: 1_700_000_000,
                entries: self.entries.clone(),
            }
        }

        fn load_tried(&self) -> bool {
            self.loaded
        }
    }

    // ------------------------------------------------------------------
    // Mock: Forecaster
    // ------------------------------------------------------------------

    struct MockForecaster {
        rate: u64,
    }

    impl Forecaster for MockForecaster {
        fn kind(&self) -> ForecasterKind {
            ForecasterKind::Mempool
        }

        fn estimate_fee(&self, target: u32) -> Result<Forecast, ForecastError> {
            if target == 0 || target > self.max_target() {
                return Err(ForecastError::TargetOutOfRange { target, max: self.max_target() });
            }
            Ok(Forecast {
                forecaster: self.kind(),
                block_height: 100,
                low_priority: FeeRate::from_sat_per_kvb(self.rate / 2),
                high_priority: FeeRate::from_sat_per_kvb(self.rate),
            })
        }

        fn max_target(&self) -> u32 {
            1
        }
    }

    // ------------------------------------------------------------------
    // Mock: MempoolSink
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct CountingSink {
        blocks: std::sync::atomic::AtomicUsize,
    }

    impl MempoolSink for CountingSink {
        fn block_connected(&self, _event: &BlockEvent) {
            self.blocks.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    // ------------------------------------------------------------------
    // Object safety: verify each trait is dyn-compatible
    // ------------------------------------------------------------------

    fn _assert_mempool_source_object_safe(source: &dyn MempoolSource) {
        let _ = source.load_tried();
    }

    fn _assert_chain_view_object_safe(chain: &dyn ChainView) {
        let _ = chain.active_tip_height();
    }

    fn _assert_forecaster_object_safe(forecaster: &dyn Forecaster) {
        let _ = forecaster.max_target();
    }

    fn _assert_sink_object_safe(sink: &dyn MempoolSink) {
        sink.block_connected(&BlockEvent::default());
    }

    // ------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------

    #[test]
    fn mock_mempool_snapshot_is_consistent() {
        let source = MockMempool {
            entries: vec![SnapshotEntry {
                txid: Txid([1; 32]),
                fee: 1000,
                vsize: 250,
                parents: vec![],
                arrival: 0,
            }],
            loaded: true,
        };
        let snapshot = source.snapshot();
        assert_eq!(snapshot.tip_height, 100);
        assert_eq!(snapshot.entries.len(), 1);
        assert!(source.load_tried());
    }

    #[test]
    fn forecaster_rejects_out_of_range_targets() {
        let forecaster = MockForecaster { rate: 1000 };
        assert!(matches!(
            forecaster.estimate_fee(0),
            Err(ForecastError::TargetOutOfRange { target: 0, max: 1 })
        ));
        assert!(matches!(
            forecaster.estimate_fee(2),
            Err(ForecastError::TargetOutOfRange { target: 2, max: 1 })
        ));
        assert!(forecaster.estimate_fee(1).is_ok());
    }

    #[test]
    fn sink_default_methods_are_no_ops() {
        let sink = CountingSink::default();
        // Only block_connected is overridden; the others must be callable.
        sink.transaction_added(&TxAddedEvent {
            txid: Txid::default(),
            fee: 0,
            vsize: 1,
            arrival: 0,
            sequence: 0,
        });
        sink.transaction_removed(&TxRemovedEvent {
            txid: Txid::default(),
            reason: crate::types::RemovalReason::Expiry,
            sequence: 1,
        });
        sink.block_connected(&BlockEvent::default());
        assert_eq!(sink.blocks.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn forecaster_as_dyn() {
        let forecaster = MockForecaster { rate: 2000 };
        let dyn_forecaster: &dyn Forecaster = &forecaster;
        assert_eq!(dyn_forecaster.kind(), ForecasterKind::Mempool);
        let forecast = dyn_forecaster.estimate_fee(1).unwrap();
        assert_eq!(forecast.high_priority, FeeRate::from_sat_per_kvb(2000));
        assert_eq!(forecast.low_priority, FeeRate::from_sat_per_kvb(1000));
    }
}
