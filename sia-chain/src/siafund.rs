//! Siafund inputs and outputs.
//!
//! Siafunds are a conserved-supply share class: exactly `SIAFUND_COUNT`
//! exist and every transaction spending them must re-create the same total.
//! Holding siafunds entitles the owner to a slice of the fees accrued by
//! file contracts; `claim_start` snapshots the global fee pool when the
//! output is created, and spending the output mints a siacoin claim for the
//! pool growth since.

use serde::{Deserialize, Serialize};
use sia_serde_derive::{SiaDeserialize, SiaSerialize};

use crate::currency::Currency;
use crate::serialization::{SerializationError, SiaDeserialize, SiaSerialize};
use crate::unlock::{UnlockConditions, UnlockHash};

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

/// The ID of a siafund output.
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
pub struct SiafundOutputID(pub crate::crypto::Hash);

impl std::fmt::Display for SiafundOutputID {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// A reference to an unspent siafund output.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, SiaSerialize, SiaDeserialize)]
pub struct SiafundInput {
    /// The output being spent.
    pub parent_id: SiafundOutputID,
    /// Must hash to the parent output's unlock hash.
    pub unlock_conditions: UnlockConditions,
    /// Address receiving the deferred siacoin claim accrued by the spent
    /// shares.
    pub claim_unlock_hash: UnlockHash,
}

/// A quantity of siafund shares locked to an address.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, SiaSerialize, SiaDeserialize)]
pub struct SiafundOutput {
    pub value: Currency,
    pub unlock_hash: UnlockHash,
    /// The size of the siafund pool when this output was created. Not chosen
    /// by the transaction author; consensus fills it in at application time.
    pub claim_start: Currency,
}
