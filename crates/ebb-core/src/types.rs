//! Core value types: transaction ids, fee rates, mempool snapshots,
//! notification payloads, and forecast results.
//!
//! All fee values are in satoshis and all fee rates in sat/kvB.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::WITNESS_SCALE_FACTOR;

/// An opaque 32-byte transaction id supplied by the host node.
///
/// The forecasting core never hashes anything itself; ids are only
/// compared, ordered (lexicographically, for deterministic tie-breaks),
/// and displayed.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
pub struct Txid(pub [u8; 32]);

impl Txid {
    /// Create a Txid from a byte array.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 32]> for Txid {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// A fee rate in satoshis per 1000 virtual bytes.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
pub struct FeeRate(u64);

impl FeeRate {
    /// The zero fee rate, doubling as "no estimate" in percentile sets.
    pub const ZERO: FeeRate = FeeRate(0);

    /// Fee rate from a raw sat/kvB value.
    pub fn from_sat_per_kvb(rate: u64) -> Self {
        Self(rate)
    }

    /// Fee rate paid by `fee` satoshis over `vsize` virtual bytes, floored.
    ///
    /// Non-positive fees and zero sizes yield the zero rate. The
    /// multiplication runs in `u128` so maximal fees cannot overflow.
    pub fn from_fee_and_vsize(fee: i64, vsize: u64) -> Self {
        if fee <= 0 || vsize == 0 {
            return Self::ZERO;
        }
        let rate = (fee as u128 * 1000) / u128::from(vsize);
        Self(rate.min(u128::from(u64::MAX)) as u64)
    }

    /// The rate in sat/kvB.
    pub fn sat_per_kvb(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} sat/kvB", self.0)
    }
}

/// One unconfirmed transaction as seen in a mempool snapshot.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub txid: Txid,
    /// Fee in satoshis. Signed: fee deltas applied by the host may push a
    /// transaction's effective fee below zero.
    pub fee: i64,
    /// Virtual size in vB. Always positive for a real transaction.
    pub vsize: u32,
    /// In-mempool parents (confirmed parents are not listed).
    pub parents: Vec<Txid>,
    /// Unix time at which the transaction entered the mempool.
    pub arrival: u64,
}

impl SnapshotEntry {
    /// The entry's weight in weight units.
    pub fn weight(&self) -> u64 {
        u64::from(self.vsize) * WITNESS_SCALE_FACTOR
    }
}

/// A consistent read-only view of the mempool.
///
/// Produced by the host under its chainstate and mempool locks, so the
/// entries, the tip height, and the snapshot time all describe one moment.
#[derive(Clone, Debug, Default)]
pub struct MempoolSnapshot {
    /// Height of the active chain tip when the snapshot was taken.
    pub tip_height: u64,
    /// Unix time at which the snapshot was taken.
    pub taken_at: u64,
    pub entries: Vec<SnapshotEntry>,
}

impl MempoolSnapshot {
    /// Look up an entry by txid.
    pub fn get(&self, txid: &Txid) -> Option<&SnapshotEntry> {
        self.entries.iter().find(|e| e.txid == *txid)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Why a transaction left the mempool, other than being mined.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemovalReason {
    /// Expired after the mempool's age limit.
    Expiry,
    /// Evicted while trimming the mempool to its size limit.
    SizeLimit,
    /// Removed during a chain reorganization.
    Reorg,
    /// Conflicted with a transaction in a connected block.
    Conflict,
    /// Replaced by a higher-paying version.
    Replaced,
}

/// Notification payload for a transaction entering the mempool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxAddedEvent {
    pub txid: Txid,
    pub fee: i64,
    pub vsize: u32,
    pub arrival: u64,
    /// Mempool sequence number, monotonically increasing per event.
    pub sequence: u64,
}

/// Notification payload for a transaction leaving the mempool for a reason
/// other than inclusion in a block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxRemovedEvent {
    pub txid: Txid,
    pub reason: RemovalReason,
    pub sequence: u64,
}

/// A transaction of a connected block, reduced to what the sync heuristic
/// needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockTx {
    pub txid: Txid,
    pub vsize: u32,
}

impl BlockTx {
    /// The transaction's weight in weight units.
    pub fn weight(&self) -> u64 {
        u64::from(self.vsize) * WITNESS_SCALE_FACTOR
    }
}

/// Notification payload for a newly connected block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockEvent {
    pub height: u64,
    /// Unix time at which the block was connected.
    pub time: u64,
    /// Every transaction in the block.
    pub block_txs: Vec<BlockTx>,
    /// The block's transactions that were in our mempool, with full
    /// snapshot data (the removed-for-block set).
    pub removed: Vec<SnapshotEntry>,
    /// Txids of the block template this node expected to be mined.
    pub expected_template: Vec<Txid>,
}

impl BlockEvent {
    /// Total weight of the block's transactions in weight units.
    pub fn block_weight(&self) -> u64 {
        self.block_txs.iter().map(BlockTx::weight).sum()
    }
}

/// Fee-rate percentiles of one simulated or mined block, measured from the
/// cheap end: `p5 <= p25 <= p50 <= p75`.
///
/// An all-zero set means "no estimate"; a sample that cannot fill half a
/// block produces one.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockPercentiles {
    pub p5: FeeRate,
    pub p25: FeeRate,
    pub p50: FeeRate,
    pub p75: FeeRate,
}

impl BlockPercentiles {
    /// Whether all percentiles are zero (no estimate available).
    pub fn is_empty(&self) -> bool {
        self.p5 == FeeRate::ZERO
            && self.p25 == FeeRate::ZERO
            && self.p50 == FeeRate::ZERO
            && self.p75 == FeeRate::ZERO
    }
}

/// Which forecaster produced a [`Forecast`].
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ForecasterKind {
    /// Next-block simulation over the current mempool.
    Mempool,
    /// Mempool simulation biased toward the last ten minutes of arrivals.
    RecentMempool,
    /// Percentiles of the most recently mined block.
    LastBlock,
    /// Rolling average over the last few mined blocks.
    BlockAverage,
    /// Hour-bucketed arrival-to-confirmation tracker.
    ConfirmationTime,
}

impl fmt::Display for ForecasterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ForecasterKind::Mempool => "mempool",
            ForecasterKind::RecentMempool => "recent-mempool",
            ForecasterKind::LastBlock => "last-block",
            ForecasterKind::BlockAverage => "block-average",
            ForecasterKind::ConfirmationTime => "confirmation-time",
        };
        f.write_str(name)
    }
}

/// A successful fee forecast.
///
/// By convention `low_priority` is the 25th percentile of the chosen sample
/// and `high_priority` the 50th.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Forecast {
    pub forecaster: ForecasterKind,
    /// Chain height the forecast was computed against.
    pub block_height: u64,
    pub low_priority: FeeRate,
    pub high_priority: FeeRate,
}
