//! Siacoin inputs and outputs.
//!
//! The siacoin you own is a subset of the global set of unspent outputs:
//! indivisible `(value, unlock hash)` records that must be consumed whole.
//! Spending one reveals the unlock conditions matching the committed hash
//! and moves the whole value into new outputs.

use serde::{Deserialize, Serialize};
use sia_serde_derive::{SiaDeserialize, SiaSerialize};

use crate::crypto::Hash;
use crate::currency::Currency;
use crate::serialization::{SerializationError, SiaDeserialize, SiaSerialize};
use crate::unlock::{UnlockConditions, UnlockHash};

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

/// The ID of a siacoin output, derived from the object that created it.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    SiaSerialize,
    SiaDeserialize,
)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct SiacoinOutputID(pub crate::crypto::Hash);

impl std::fmt::Display for SiacoinOutputID {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl SiacoinOutputID {
    pub fn from_hash(hash: Hash) -> SiacoinOutputID {
        SiacoinOutputID(hash)
    }
}

/// A reference to an unspent siacoin output, plus the conditions that unlock
/// it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, SiaSerialize, SiaDeserialize)]
pub struct SiacoinInput {
    /// The output being spent.
    pub parent_id: SiacoinOutputID,
    /// Must hash to the parent output's unlock hash.
    pub unlock_conditions: UnlockConditions,
}

/// A quantity of siacoin locked to an address.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, SiaSerialize, SiaDeserialize)]
pub struct SiacoinOutput {
    pub value: Currency,
    pub unlock_hash: UnlockHash,
}
