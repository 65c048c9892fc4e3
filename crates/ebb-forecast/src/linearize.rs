//! Block-template linearization of a mempool snapshot.
//!
//! Converts the snapshot's transaction DAG into an ordered list of
//! *chunks*: ancestor-closed groups selected greedily by best aggregate
//! feerate. A low-fee parent is carried into a block by its high-fee
//! descendants (the group's combined feerate is what competes), and every
//! transaction's *mining score* is the feerate of the chunk that included
//! it.
//!
//! The linearization is deterministic for identical input: candidates tie
//! first on feerate, then on larger aggregate size, then on the
//! lexicographically smallest candidate txid.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use ebb_core::constants::WITNESS_SCALE_FACTOR;
use ebb_core::feefrac::FeeFrac;
use ebb_core::types::{FeeRate, SnapshotEntry, Txid};

/// An ancestor-closed group of transactions selected as one unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// Aggregate fee and size of the group.
    pub feefrac: FeeFrac,
    /// Member txids, parents before children.
    pub txids: Vec<Txid>,
}

impl Chunk {
    /// The chunk's feerate, which is every member's mining score.
    pub fn fee_rate(&self) -> FeeRate {
        FeeRate::from_fee_and_vsize(self.feefrac.fee, self.feefrac.size.max(0) as u64)
    }
}

/// Per-transaction record of a linearization, in inclusion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxStat {
    pub txid: Txid,
    /// Mining score: the feerate of the containing chunk.
    pub fee_rate: FeeRate,
    pub vsize: u32,
}

/// The result of linearizing a snapshot: chunks in selection order plus a
/// parallel per-transaction view.
#[derive(Clone, Debug, Default)]
pub struct Linearization {
    pub chunks: Vec<Chunk>,
    /// Every included txid with the index of its chunk, in inclusion order.
    pub inclusion_order: Vec<(Txid, usize)>,
    tx_stats: Vec<TxStat>,
}

impl Linearization {
    /// Chunk index of an included transaction.
    pub fn chunk_index(&self, txid: &Txid) -> Option<usize> {
        self.inclusion_order
            .iter()
            .find(|(id, _)| id == txid)
            .map(|&(_, idx)| idx)
    }

    /// Per-transaction `(mining score, vsize)` pairs, best chunk first.
    ///
    /// This is the sample stream the percentile engine consumes.
    pub fn fee_rate_stats(&self) -> Vec<(FeeRate, u32)> {
        self.tx_stats.iter().map(|s| (s.fee_rate, s.vsize)).collect()
    }

    /// Per-transaction mining scores with txids, best chunk first.
    pub fn mining_scores(&self) -> &[TxStat] {
        &self.tx_stats
    }

    /// The chunk aggregates alone, e.g. for building a feerate diagram.
    pub fn chunk_feefracs(&self) -> Vec<FeeFrac> {
        self.chunks.iter().map(|c| c.feefrac).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Linearize `entries` into chunks up to `weight_cap` weight units.
///
/// Transactions in `excluded` — and any group that would have to carry
/// one — are never selected. Selection stops once the accumulated weight
/// reaches the cap (the crossing chunk is kept whole) or when the best
/// remaining group's fee is negative: such transactions may only ride in a
/// group whose combined feerate is non-negative, and if the *best* group
/// is negative every other remaining group is too.
pub fn linearize(
    entries: &[SnapshotEntry],
    weight_cap: u64,
    excluded: &HashSet<Txid>,
) -> Linearization {
    let by_id: HashMap<Txid, &SnapshotEntry> =
        entries.iter().map(|e| (e.txid, e)).collect();

    // BTreeSet so candidate enumeration is in txid order, independent of
    // the input ordering.
    let mut remaining: BTreeSet<Txid> = by_id.keys().copied().collect();
    let mut included: HashSet<Txid> = HashSet::with_capacity(entries.len());

    let mut lin = Linearization::default();
    let mut total_weight: u64 = 0;

    while !remaining.is_empty() && total_weight < weight_cap {
        let mut best: Option<(FeeFrac, Txid, Vec<Txid>)> = None;

        for &candidate in &remaining {
            let Some(set) = ancestor_set(candidate, &by_id, &included, excluded) else {
                continue;
            };
            let aggregate = set
                .iter()
                .map(|txid| {
                    let entry = by_id[txid];
                    FeeFrac::new(entry.fee, entry.vsize as i32)
                })
                .fold(FeeFrac::EMPTY, |acc, f| acc + f);

            let wins = match &best {
                None => true,
                Some((best_frac, best_txid, _)) => {
                    match aggregate.feerate_cmp(best_frac) {
                        std::cmp::Ordering::Greater => true,
                        std::cmp::Ordering::Less => false,
                        // Equal feerate: larger group first, then smallest
                        // candidate txid for determinism.
                        std::cmp::Ordering::Equal => match aggregate.size.cmp(&best_frac.size) {
                            std::cmp::Ordering::Greater => true,
                            std::cmp::Ordering::Less => false,
                            std::cmp::Ordering::Equal => candidate < *best_txid,
                        },
                    }
                }
            };
            if wins {
                best = Some((aggregate, candidate, set));
            }
        }

        let Some((aggregate, _, set)) = best else {
            break;
        };
        if aggregate.fee < 0 {
            break;
        }

        let ordered = topological_order(&set, &by_id);
        let chunk_index = lin.chunks.len();
        let fee_rate = FeeRate::from_fee_and_vsize(aggregate.fee, aggregate.size.max(0) as u64);
        for txid in &ordered {
            let entry = by_id[txid];
            lin.inclusion_order.push((*txid, chunk_index));
            lin.tx_stats.push(TxStat { txid: *txid, fee_rate, vsize: entry.vsize });
            included.insert(*txid);
            remaining.remove(txid);
        }
        total_weight += aggregate.size.max(0) as u64 * WITNESS_SCALE_FACTOR;
        lin.chunks.push(Chunk { feefrac: aggregate, txids: ordered });
    }

    if !remaining.is_empty() {
        debug!(
            left_out = remaining.len(),
            total_weight, weight_cap, "linearization stopped before exhausting the snapshot"
        );
    }

    lin
}

/// The candidate's not-yet-included ancestor closure, itself included.
///
/// Returns `None` when the closure would contain an excluded transaction.
/// The visited set is scoped to this one candidate so diamond ancestries
/// (two parents sharing a grandparent) are counted once.
fn ancestor_set(
    candidate: Txid,
    by_id: &HashMap<Txid, &SnapshotEntry>,
    included: &HashSet<Txid>,
    excluded: &HashSet<Txid>,
) -> Option<Vec<Txid>> {
    let mut visited: HashSet<Txid> = HashSet::new();
    let mut stack = vec![candidate];

    while let Some(txid) = stack.pop() {
        if excluded.contains(&txid) {
            return None;
        }
        if !visited.insert(txid) {
            continue;
        }
        let entry = by_id[&txid];
        for parent in &entry.parents {
            // Parents already linearized or confirmed are no longer part
            // of the group being priced.
            if included.contains(parent) || !by_id.contains_key(parent) {
                continue;
            }
            stack.push(*parent);
        }
    }

    Some(visited.into_iter().collect())
}

/// Order a chunk's members parents-before-children, smallest txid first
/// among the ready ones.
fn topological_order(set: &[Txid], by_id: &HashMap<Txid, &SnapshotEntry>) -> Vec<Txid> {
    let members: HashSet<Txid> = set.iter().copied().collect();
    let mut blocked: HashMap<Txid, usize> = HashMap::new();
    let mut children: HashMap<Txid, Vec<Txid>> = HashMap::new();

    for &txid in set {
        let in_set_parents = by_id[&txid]
            .parents
            .iter()
            .filter(|p| members.contains(p))
            .count();
        blocked.insert(txid, in_set_parents);
        for parent in &by_id[&txid].parents {
            if members.contains(parent) {
                children.entry(*parent).or_default().push(txid);
            }
        }
    }

    let mut ready: BTreeSet<Txid> = blocked
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(txid, _)| *txid)
        .collect();
    let mut ordered = Vec::with_capacity(set.len());

    while let Some(&txid) = ready.iter().next() {
        ready.remove(&txid);
        ordered.push(txid);
        for child in children.get(&txid).cloned().unwrap_or_default() {
            let count = blocked.get_mut(&child).expect("child is a member");
            *count -= 1;
            if *count == 0 {
                ready.insert(child);
            }
        }
    }

    debug_assert_eq!(ordered.len(), set.len(), "mempool DAG must be acyclic");
    ordered
}
