//! Fee-and-size fractions with exact feerate ordering.
//!
//! A [`FeeFrac`] stores a fee and a size and is ordered by fee rate
//! (fee over size) without ever dividing: comparisons cross-multiply
//! `fee * size`, which needs 96-bit precision for the full `i64 × i32`
//! range. The native path uses `i128`; an exact two-limb fallback is kept
//! alongside it so the arithmetic stays verifiable on its own.

use std::cmp::Ordering;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// A fee and size pair, totally ordered by increasing feerate.
///
/// Ties at equal feerate break by *decreasing* size: the larger of two
/// equal-feerate fractions sorts lower. The empty fraction (fee and size
/// both zero) has no defined feerate and sorts strictly after everything
/// else. For example, the following are in ascending order:
///
/// - fee=0 size=1 (feerate 0)
/// - fee=1 size=2 (feerate 0.5)
/// - fee=2 size=2 (feerate 1)
/// - fee=1 size=1 (feerate 1)
/// - fee=2 size=1 (feerate 2)
/// - fee=0 size=0 (undefined feerate)
///
/// Equality is componentwise: equal feerate alone does not make two
/// fractions equal.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FeeFrac {
    /// Fee in satoshis. May go negative in intermediate diagram arithmetic.
    pub fee: i64,
    /// Size in virtual bytes. Zero only for the empty fraction.
    pub size: i32,
}

/// Exact `i64 × i32` product as a totally ordered `(high, low)` limb pair.
///
/// Mirrors the wide multiply as two 64-bit multiplies: the low limb is the
/// unsigned bottom 32 bits, the high limb carries the rest (including sign).
/// Tuple ordering on the result matches the numeric ordering of the product.
pub fn mul_fallback(a: i64, b: i32) -> (i64, u32) {
    let low = (a as u32 as i64) * i64::from(b);
    let high = (a >> 32) * i64::from(b);
    (high + (low >> 32), low as u32)
}

/// Exact `i64 × i32` product on the native 128-bit path.
fn mul(a: i64, b: i32) -> i128 {
    i128::from(a) * i128::from(b)
}

impl FeeFrac {
    /// The empty fraction: no fee, no size, undefined feerate.
    pub const EMPTY: FeeFrac = FeeFrac { fee: 0, size: 0 };

    /// Construct a fraction. A zero size requires a zero fee.
    pub fn new(fee: i64, size: i32) -> Self {
        debug_assert!(size != 0 || fee == 0, "zero-size FeeFrac must have zero fee");
        Self { fee, size }
    }

    /// Whether this is the empty fraction.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Compare only the feerates of two fractions, ignoring size ties.
    ///
    /// The empty fraction compares equal to everything here: it is neither
    /// higher nor lower in feerate than any other fraction.
    pub fn feerate_cmp(&self, other: &FeeFrac) -> Ordering {
        mul(self.fee, other.size).cmp(&mul(other.fee, self.size))
    }

    /// Whether `self` has strictly higher feerate than `other`.
    ///
    /// Equal feerates return false, as does any comparison involving the
    /// empty fraction on either side.
    pub fn higher_feerate_than(&self, other: &FeeFrac) -> bool {
        self.feerate_cmp(other) == Ordering::Greater
    }

    /// Whether `self` has strictly lower feerate than `other`.
    pub fn lower_feerate_than(&self, other: &FeeFrac) -> bool {
        self.feerate_cmp(other) == Ordering::Less
    }
}

impl Ord for FeeFrac {
    fn cmp(&self, other: &Self) -> Ordering {
        // Feerate first; ties by decreasing size. The empty fraction wins
        // every tie-break against a non-empty one (0 > -size is false, but
        // other.size > self.size == 0 makes empty compare greater).
        self.feerate_cmp(other)
            .then_with(|| other.size.cmp(&self.size))
    }
}

impl PartialOrd for FeeFrac {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for FeeFrac {
    type Output = FeeFrac;
    fn add(self, rhs: FeeFrac) -> FeeFrac {
        FeeFrac { fee: self.fee + rhs.fee, size: self.size + rhs.size }
    }
}

impl AddAssign for FeeFrac {
    fn add_assign(&mut self, rhs: FeeFrac) {
        self.fee += rhs.fee;
        self.size += rhs.size;
    }
}

// Subtraction may produce negative fee or size; diagram comparison relies
// on these intermediates, so no invariant is enforced here.
impl Sub for FeeFrac {
    type Output = FeeFrac;
    fn sub(self, rhs: FeeFrac) -> FeeFrac {
        FeeFrac { fee: self.fee - rhs.fee, size: self.size - rhs.size }
    }
}

impl SubAssign for FeeFrac {
    fn sub_assign(&mut self, rhs: FeeFrac) {
        self.fee -= rhs.fee;
        self.size -= rhs.size;
    }
}
