//! Shared builders and host-side mocks for integration tests.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use ebb_core::traits::{ChainView, MempoolSource};
use ebb_core::types::{BlockEvent, BlockTx, MempoolSnapshot, SnapshotEntry, Txid};

/// Reference wall-clock instant used across test scenarios.
pub const NOW: u64 = 1_700_000_000;

/// Txid with a two-byte seed so tests can mint thousands of unique ids.
pub fn txid(seed: u16) -> Txid {
    let mut bytes = [0u8; 32];
    bytes[0] = (seed >> 8) as u8;
    bytes[1] = (seed & 0xFF) as u8;
    Txid(bytes)
}

/// An unlinked snapshot entry.
pub fn entry(seed: u16, fee: i64, vsize: u32, arrival: u64) -> SnapshotEntry {
    SnapshotEntry { txid: txid(seed), fee, vsize, parents: vec![], arrival }
}

/// A snapshot entry spending the given parents.
pub fn entry_with_parents(
    seed: u16,
    fee: i64,
    vsize: u32,
    arrival: u64,
    parents: &[u16],
) -> SnapshotEntry {
    SnapshotEntry {
        txid: txid(seed),
        fee,
        vsize,
        parents: parents.iter().map(|&p| txid(p)).collect(),
        arrival,
    }
}

/// 400 unlinked transactions at 4000 sat/kvB that fill exactly one
/// default block (400 x 2500 vB x 4 = 4,000,000 WU).
pub fn full_block_of_uniform_entries() -> Vec<SnapshotEntry> {
    (0..400).map(|i| entry(i, 10_000, 2_500, NOW - 3_600)).collect()
}

/// A block event whose transactions all came out of our mempool and were
/// all in our expected template — a perfectly in-sync block.
pub fn synced_block(height: u64, removed: Vec<SnapshotEntry>) -> BlockEvent {
    BlockEvent {
        height,
        time: NOW,
        block_txs: removed
            .iter()
            .map(|e| BlockTx { txid: e.txid, vsize: e.vsize })
            .collect(),
        expected_template: removed.iter().map(|e| e.txid).collect(),
        removed,
    }
}

/// A mined block of 1000 transactions, 1000 vB each, with fee rates
/// uniformly spread over 1..=10 sat/vB (100 transactions per tier).
pub fn uniform_distribution_block(height: u64) -> BlockEvent {
    let removed: Vec<SnapshotEntry> = (0..1000)
        .map(|i| {
            let sat_per_vb = i64::from(i / 100) + 1;
            entry(i, sat_per_vb * 1000, 1000, NOW - 1800)
        })
        .collect();
    synced_block(height, removed)
}

/// Host-side mempool mock with a swappable snapshot.
pub struct TestMempool {
    snapshot: Mutex<MempoolSnapshot>,
    loaded: AtomicU64,
}

impl TestMempool {
    pub fn new(entries: Vec<SnapshotEntry>) -> Self {
        Self {
            snapshot: Mutex::new(MempoolSnapshot {
                tip_height: 100,
                taken_at: NOW,
                entries,
            }),
            loaded: AtomicU64::new(1),
        }
    }

    pub fn set_entries(&self, entries: Vec<SnapshotEntry>) {
        self.snapshot.lock().entries = entries;
    }

    pub fn set_tip_height(&self, height: u64) {
        self.snapshot.lock().tip_height = height;
    }

    pub fn set_loaded(&self, loaded: bool) {
        self.loaded.store(u64::from(loaded), Ordering::SeqCst);
    }
}

impl MempoolSource for TestMempool {
    fn snapshot(&self) -> MempoolSnapshot {
        self.snapshot.lock().clone()
    }

    fn load_tried(&self) -> bool {
        self.loaded.load(Ordering::SeqCst) == 1
    }
}

/// Host-side chain mock.
pub struct TestChain {
    height: AtomicU64,
}

impl TestChain {
    pub fn new(height: u64) -> Self {
        Self { height: AtomicU64::new(height) }
    }

    pub fn set_height(&self, height: u64) {
        self.height.store(height, Ordering::SeqCst);
    }
}

impl ChainView for TestChain {
    fn active_tip_height(&self) -> u64 {
        self.height.load(Ordering::SeqCst)
    }
}
