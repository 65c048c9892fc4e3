//! Weight-weighted fee-rate percentiles over a linearized sample.
//!
//! Percentiles are measured from the cheap end of a simulated block: `p5`
//! is the rate below which the bottom 5% of the block's weight pays, and
//! so on. Thresholds are fractions of the block weight limit, not of the
//! sample, so a thin sample that cannot fill half a block produces no
//! estimate instead of a misleading one.

use std::collections::BTreeMap;

use ebb_core::constants::{DEFAULT_BLOCK_MAX_WEIGHT, WITNESS_SCALE_FACTOR};
use ebb_core::types::{BlockPercentiles, FeeRate};

/// Weight thresholds for the four tracked quantiles.
const P5_WEIGHT: u64 = DEFAULT_BLOCK_MAX_WEIGHT / 20;
const P25_WEIGHT: u64 = DEFAULT_BLOCK_MAX_WEIGHT / 4;
const P50_WEIGHT: u64 = DEFAULT_BLOCK_MAX_WEIGHT / 2;
const P75_WEIGHT: u64 = 3 * (DEFAULT_BLOCK_MAX_WEIGHT / 4);

/// Compute the percentiles of one simulated block.
///
/// `stats` is a `(mining score, vsize)` list in linearized order, best
/// first; the sweep walks it in reverse so weight accumulates from the
/// cheapest transactions upward, and the first time the running weight
/// crosses a quantile's threshold that transaction's rate is recorded.
/// Each quantile carries its own recorded flag: a crossing at a zero-fee
/// transaction records zero and stays recorded. Returns the empty set
/// when the sample's total weight is below half the block limit.
pub fn calculate_block_percentiles(stats: &[(FeeRate, u32)]) -> BlockPercentiles {
    let mut percentiles = BlockPercentiles::default();
    let (mut p5_set, mut p25_set, mut p50_set, mut p75_set) = (false, false, false, false);
    let mut total_weight: u64 = 0;

    for &(rate, vsize) in stats.iter().rev() {
        total_weight += u64::from(vsize) * WITNESS_SCALE_FACTOR;
        if !p5_set && total_weight >= P5_WEIGHT {
            percentiles.p5 = rate;
            p5_set = true;
        }
        if !p25_set && total_weight >= P25_WEIGHT {
            percentiles.p25 = rate;
            p25_set = true;
        }
        if !p50_set && total_weight >= P50_WEIGHT {
            percentiles.p50 = rate;
            p50_set = true;
        }
        if !p75_set && total_weight >= P75_WEIGHT {
            percentiles.p75 = rate;
            p75_set = true;
        }
    }

    // Not enough weight for a credible estimate.
    if total_weight < P50_WEIGHT {
        return BlockPercentiles::default();
    }
    percentiles
}

/// Split a best-first stats list into consecutive simulated blocks and
/// compute each block's percentiles, keyed by confirmation target.
///
/// Block 1 is the best-paying prefix up to the block weight limit, block 2
/// the next slice, and so on up to `num_blocks`. The final partial slice
/// still gets a percentile pass; whether it yields anything is up to the
/// half-block sufficiency rule.
pub fn estimate_block_percentiles(
    stats: &[(FeeRate, u32)],
    num_blocks: u32,
) -> BTreeMap<u32, BlockPercentiles> {
    let mut per_target = BTreeMap::new();
    if stats.is_empty() {
        return per_target;
    }

    let mut block_number: u32 = 1;
    let mut block_start: usize = 0;
    let mut block_weight: u64 = 0;

    for (index, &(_, vsize)) in stats.iter().enumerate() {
        block_weight += u64::from(vsize) * WITNESS_SCALE_FACTOR;
        let last = index + 1 == stats.len();
        if block_weight >= DEFAULT_BLOCK_MAX_WEIGHT || last {
            per_target.insert(
                block_number,
                calculate_block_percentiles(&stats[block_start..=index]),
            );
            block_number += 1;
            if block_number > num_blocks {
                break;
            }
            block_start = index + 1;
            block_weight = 0;
        }
    }

    per_target
}
