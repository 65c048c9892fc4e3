//! Concurrent estimate readers racing notification-thread updates.
//!
//! The estimator surface is read from RPC-style threads while the
//! notification worker mutates forecaster state; these tests drive both
//! sides at once and check that every observed answer is internally
//! consistent.

use std::sync::Arc;
use std::thread;

use ebb_core::traits::{ChainView, MempoolSource};
use ebb_forecast::estimator::FeeEstimator;
use ebb_forecast::signals::NotificationHub;
use ebb_tests::helpers::*;

#[test]
fn estimates_race_block_notifications() {
    let hub = NotificationHub::new();
    let mempool = Arc::new(TestMempool::new(full_block_of_uniform_entries()));
    let chain = Arc::new(TestChain::new(100));
    let (estimator, conf_time, gate) = FeeEstimator::with_default_forecasters(
        mempool.clone() as Arc<dyn MempoolSource>,
        chain as Arc<dyn ChainView>,
        &hub,
    );
    let estimator = Arc::new(estimator);

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let estimator = Arc::clone(&estimator);
            thread::spawn(move || {
                for _ in 0..200 {
                    let result = estimator.estimate(1);
                    if let Some(forecast) = result.forecast {
                        // Percentile order must hold in every answer.
                        assert!(forecast.low_priority <= forecast.high_priority);
                    } else {
                        assert!(!result.errors.is_empty());
                    }
                }
            })
        })
        .collect();

    // Meanwhile the notification side connects a stream of blocks and
    // ages the confirmation grid.
    for height in 101..141u64 {
        let removed: Vec<_> = (0..100)
            .map(|i| entry(i, 5_000, 2_500, NOW - 600))
            .collect();
        hub.block_connected(synced_block(height, removed));
        if height % 10 == 0 {
            conf_time.update_tracking_stats();
        }
    }
    hub.flush();

    for reader in readers {
        reader.join().unwrap();
    }

    // After the dust settles the gate saw an unbroken run of synced
    // blocks and the mempool answers.
    assert!(gate.roughly_synced());
    let result = estimator.estimate(1);
    assert!(result.forecast.is_some());
}

#[test]
fn mempool_swaps_race_cached_reads() {
    let hub = NotificationHub::new();
    let mempool = Arc::new(TestMempool::new(full_block_of_uniform_entries()));
    let chain = Arc::new(TestChain::new(100));
    let (estimator, _conf_time, _gate) = FeeEstimator::with_default_forecasters(
        mempool.clone() as Arc<dyn MempoolSource>,
        chain as Arc<dyn ChainView>,
        &hub,
    );
    let estimator = Arc::new(estimator);

    let writer = {
        let mempool = Arc::clone(&mempool);
        thread::spawn(move || {
            for round in 0..50u16 {
                let entries = (0..400)
                    .map(|i| entry(i, 10_000 + i64::from(round), 2_500, NOW - 600))
                    .collect();
                mempool.set_entries(entries);
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let estimator = Arc::clone(&estimator);
            thread::spawn(move || {
                for _ in 0..100 {
                    let result = estimator.estimate(1);
                    if let Some(forecast) = result.forecast {
                        // Every answer derives from one snapshot: 400 equal
                        // rates mean equal quartiles.
                        assert_eq!(forecast.low_priority, forecast.high_priority);
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}
