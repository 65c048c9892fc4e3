//! The miner-sync gate: are we seeing roughly the blocks miners mine?
//!
//! Mempool-based estimates are only credible while this node's mempool
//! and block templates resemble what miners actually confirm. The gate
//! watches the last three connected blocks: each is marked synced when
//! more than half its weight was in our mempool *and* more than half was
//! in our expected template. Three consecutive synced blocks open the
//! gate; any gap or miss closes it.

use parking_lot::RwLock;
use tracing::debug;

use ebb_core::traits::MempoolSink;
use ebb_core::types::{BlockEvent, BlockTx};

/// One observed block in the ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct BlockSlot {
    height: u64,
    roughly_synced: bool,
}

/// Ring of the last three observed blocks, oldest first.
///
/// Slots are explicit `Option`s so a fresh gate (no blocks seen) is
/// distinguishable from one that has observed blocks near genesis.
/// Written only by the notification thread; read by estimate callers.
pub struct InSyncGate {
    slots: RwLock<[Option<BlockSlot>; 3]>,
}

impl InSyncGate {
    pub fn new() -> Self {
        Self { slots: RwLock::new([None, None, None]) }
    }

    /// Record a block-connected observation.
    ///
    /// While the ring's occupied slots are consecutive the new block is
    /// appended, rotating out the oldest when full. A ring that has gone
    /// out of order is reset to just the new block.
    pub fn record(&self, height: u64, roughly_synced: bool) {
        let mut slots = self.slots.write();
        let slot = BlockSlot { height, roughly_synced };
        if Self::are_in_order(&slots) {
            match slots.iter_mut().find(|s| s.is_none()) {
                Some(empty) => *empty = Some(slot),
                None => {
                    slots.rotate_left(1);
                    slots[2] = Some(slot);
                }
            }
        } else {
            *slots = [Some(slot), None, None];
        }
    }

    /// Whether every occupied slot's height is exactly one above its
    /// predecessor's.
    fn are_in_order(slots: &[Option<BlockSlot>; 3]) -> bool {
        slots
            .iter()
            .flatten()
            .collect::<Vec<_>>()
            .windows(2)
            .all(|pair| pair[1].height == pair[0].height + 1)
    }

    /// True iff the ring holds three consecutive blocks, each of which was
    /// individually in sync with miners.
    pub fn roughly_synced(&self) -> bool {
        let slots = self.slots.read();
        slots.iter().all(|s| s.is_some())
            && Self::are_in_order(&slots)
            && slots.iter().flatten().all(|s| s.roughly_synced)
    }
}

impl Default for InSyncGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-block sync heuristic over the notification payload: both the
/// mempool overlap and the expected-template overlap must exceed half the
/// block's weight.
fn block_roughly_synced(event: &BlockEvent) -> bool {
    let block_weight = event.block_weight();
    if block_weight == 0 {
        return false;
    }

    let mempool_match: u64 = event
        .block_txs
        .iter()
        .filter(|tx| event.removed.iter().any(|r| r.txid == tx.txid))
        .map(BlockTx::weight)
        .sum();
    let expected_match: u64 = event
        .block_txs
        .iter()
        .filter(|tx| event.expected_template.contains(&tx.txid))
        .map(BlockTx::weight)
        .sum();

    mempool_match > block_weight / 2 && expected_match > block_weight / 2
}

impl MempoolSink for InSyncGate {
    fn block_connected(&self, event: &BlockEvent) {
        let synced = block_roughly_synced(event);
        debug!(height = event.height, synced, "sync gate observed block");
        self.record(event.height, synced);
    }
}
