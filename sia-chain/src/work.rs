//! Proof-of-work targets and cumulative chain weight.
//!
//! A target is a 32-byte big-endian threshold: a block is valid when its ID,
//! read as a 256-bit integer, is at most the target. The weight of a block
//! is the multiplicative inverse of its target, so chain weights add
//! harmonically; `Depth` stores the running sum back in inverse (target)
//! form so that comparing two chains is a plain integer comparison, with
//! smaller meaning heavier.
//!
//! All retarget arithmetic is integer rational math. Floating point would
//! round differently across platforms and fork the network.

use primitive_types::{U256, U512};
use serde::{Deserialize, Serialize};
use sia_serde_derive::{SiaDeserialize, SiaSerialize};

use crate::crypto::Hash;
use crate::parameters::{MAX_ADJUSTMENT_DOWN, MAX_ADJUSTMENT_UP};
use crate::serialization::{SerializationError, SiaDeserialize, SiaSerialize};

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

/// A difficulty threshold for block IDs, big-endian.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    SiaSerialize,
    SiaDeserialize,
)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct Target(pub [u8; 32]);

impl Target {
    /// Whether a block ID with digest `hash` satisfies this target.
    pub fn is_met_by(&self, hash: Hash) -> bool {
        U256::from_big_endian(&hash.0) <= U256::from_big_endian(&self.0)
    }

    /// The target a child block must meet, given the time the trailing
    /// window actually took versus the time it was expected to take.
    ///
    /// The adjustment ratio `actual / expected` is clamped to the protocol's
    /// per-block bounds, so a hostile timestamp cannot swing difficulty by
    /// more than a sliver per block.
    pub fn child_target(&self, actual_time: i64, expected_time: i64) -> Target {
        if expected_time <= 0 {
            // No trailing window yet (the parent is the genesis block).
            return *self;
        }

        let (numerator, denominator) = clamp_adjustment(actual_time, expected_time);

        let parent = U256::from_big_endian(&self.0);
        let product = parent.full_mul(U256::from(numerator));
        let adjusted = saturating_low_half(product / U512::from(denominator));
        // A zero target would be unmeetable forever; floor at one.
        let adjusted = std::cmp::max(adjusted, U256::one());

        let mut bytes = [0u8; 32];
        adjusted.to_big_endian(&mut bytes);
        Target(bytes)
    }
}

/// Truncates a 512-bit value into 256 bits, saturating when the high half
/// is occupied.
fn saturating_low_half(value: U512) -> U256 {
    let mut bytes = [0u8; 64];
    value.to_big_endian(&mut bytes);
    if bytes[..32].iter().any(|&b| b != 0) {
        return U256::max_value();
    }
    U256::from_big_endian(&bytes[32..])
}

/// Clamps `actual / expected` to `[MAX_ADJUSTMENT_DOWN, MAX_ADJUSTMENT_UP]`,
/// returning the ratio as a `(numerator, denominator)` pair.
fn clamp_adjustment(actual_time: i64, expected_time: i64) -> (u64, u64) {
    debug_assert!(expected_time > 0);
    let expected = expected_time as i128;
    let actual = actual_time as i128;

    let (down_num, down_den) = MAX_ADJUSTMENT_DOWN;
    let (up_num, up_den) = MAX_ADJUSTMENT_UP;

    // actual/expected < down_num/down_den
    if actual * (down_den as i128) < expected * down_num as i128 {
        return MAX_ADJUSTMENT_DOWN;
    }
    // actual/expected > up_num/up_den
    if actual * up_den as i128 > expected * up_num as i128 {
        return MAX_ADJUSTMENT_UP;
    }
    (actual as u64, expected as u64)
}

/// Cumulative chain weight, stored as the inverse of the summed block
/// weights. Smaller depth means a heavier chain.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Depth(pub [u8; 32]);

impl Depth {
    /// The depth of a chain containing a single block mined at `target`.
    pub fn from_target(target: &Target) -> Depth {
        Depth(target.0)
    }

    /// The depth after extending this chain with one block mined at
    /// `target`: `1/new = 1/self + 1/target`, i.e. the harmonic sum
    /// `self * target / (self + target)`.
    pub fn add_weight(&self, target: &Target) -> Depth {
        let d = U256::from_big_endian(&self.0);
        let t = U256::from_big_endian(&target.0);
        assert!(!d.is_zero() && !t.is_zero(), "depth arithmetic on a zero target");

        let numerator = d.full_mul(t);
        let denominator = U512::from(d) + U512::from(t);
        // The harmonic sum is at most min(d, t), which fits in 256 bits.
        let sum = saturating_low_half(numerator / denominator);
        let sum = std::cmp::max(sum, U256::one());

        let mut bytes = [0u8; 32];
        sum.to_big_endian(&mut bytes);
        Depth(bytes)
    }

    /// Whether this chain has strictly more accumulated work than `other`.
    pub fn is_heavier_than(&self, other: &Depth) -> bool {
        self < other
    }
}
