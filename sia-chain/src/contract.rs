//! File contracts, contract terminations, and storage proofs.
//!
//! A file contract escrows a payout against a promise to store data. The
//! host proves storage by revealing the challenged segment of the file and
//! the Merkle path tying it to the contract's file root; the challenge index
//! is derived from the chain itself, so it cannot be predicted when the
//! contract is formed. A contract resolves exactly one way: terminated by
//! mutual consent before its proof window opens, proven during the window,
//! or missed at expiration.

use serde::{Deserialize, Serialize};
use sia_serde_derive::{SiaDeserialize, SiaSerialize};

use crate::block::Height;
use crate::crypto::{self, tag, Hash};
use crate::currency::Currency;
use crate::parameters::SIAFUND_PORTION;
use crate::serialization::{SerializationError, SiaDeserialize, SiaSerialize};
use crate::siacoin::{SiacoinOutput, SiacoinOutputID};
use crate::unlock::{UnlockConditions, UnlockHash};

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

/// The ID of a file contract.
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
pub struct FileContractID(pub crypto::Hash);

impl std::fmt::Display for FileContractID {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl FileContractID {
    /// The ID of the output created when this contract resolves through a
    /// storage proof (`valid` = true) or through expiration (`valid` =
    /// false). These outputs are delayed, not immediate.
    pub fn storage_proof_output_id(&self, valid: bool, index: u64) -> SiacoinOutputID {
        SiacoinOutputID(crypto::hash_all(&[
            tag::STORAGE_PROOF,
            &(self.0).0,
            &[valid as u8],
            &index.to_le_bytes(),
        ]))
    }

    /// The ID of the output created by payout `index` of a termination of
    /// this contract.
    pub fn termination_payout_id(&self, index: u64) -> SiacoinOutputID {
        SiacoinOutputID(crypto::hash_all(&[
            tag::CONTRACT_TERMINATION,
            &(self.0).0,
            &index.to_le_bytes(),
        ]))
    }
}

/// An active obligation to prove storage of a file.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, SiaSerialize, SiaDeserialize)]
pub struct FileContract {
    /// Size of the committed file in bytes.
    pub file_size: u64,
    /// Merkle root over the file's segments.
    pub file_merkle_root: Hash,
    /// First height at which a storage proof may be submitted. The challenge
    /// is derived from the block at `start - 1`.
    pub start: Height,
    /// Height at which the contract lapses; the proof must land strictly
    /// before this.
    pub expiration: Height,
    /// The amount the creator pays: the siafund tax plus the escrow that
    /// the payout lists redistribute. See [`FileContract::escrow`].
    pub payout: Currency,
    /// Outputs created if a valid proof is submitted in the window. Must
    /// sum to the after-tax escrow.
    pub valid_proof_outputs: Vec<SiacoinOutput>,
    /// Outputs created if the window closes without a proof. Must sum to
    /// the after-tax escrow.
    pub missed_proof_outputs: Vec<SiacoinOutput>,
    /// Commitment to the conditions that may terminate the contract early.
    pub termination_hash: UnlockHash,
}

impl FileContract {
    /// The number of challengeable segments in the committed file.
    pub fn segment_count(&self) -> u64 {
        crypto::merkle::calculate_segments(self.file_size)
    }

    /// The share of the payout skimmed into the siafund pool when the
    /// contract is created, rounded down.
    pub fn tax(&self) -> Currency {
        let (numerator, denominator) = SIAFUND_PORTION;
        &(&self.payout * numerator) / denominator
    }

    /// The amount actually held for the contract's resolution: the payout
    /// net of tax. Both proof-output lists, and any termination's payouts,
    /// must sum to exactly this.
    pub fn escrow(&self) -> Currency {
        self.payout
            .checked_sub(&self.tax())
            .expect("the siafund tax cannot exceed the payout")
    }
}

/// A consensual early exit from a file contract, valid only before the
/// proof window opens.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, SiaSerialize, SiaDeserialize)]
pub struct FileContractTermination {
    /// The contract being dissolved.
    pub parent_id: FileContractID,
    /// Must hash to the contract's termination hash.
    pub termination_conditions: UnlockConditions,
    /// Redistribution of the contract's escrow; must sum to it exactly.
    /// The tax stays in the pool: terminating does not refund it.
    pub payouts: Vec<SiacoinOutput>,
}

/// A revealed segment and its Merkle path, answering a contract's challenge.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, SiaSerialize, SiaDeserialize)]
pub struct StorageProof {
    /// The contract being proven.
    pub parent_id: FileContractID,
    /// The challenged segment's bytes. Every segment is `SEGMENT_SIZE` bytes
    /// except a ragged final one.
    pub segment: Vec<u8>,
    /// Sibling hashes from the segment up to the file Merkle root.
    pub hash_set: Vec<Hash>,
}
