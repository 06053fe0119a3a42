//! Transactions and transaction-related structures.
//!
//! A transaction is an envelope of ordered lists: coin and fund flows,
//! contract lifecycle events, fees, arbitrary data, and signatures. Child
//! objects (outputs, contracts) are identified by hashing the transaction ID
//! with the child's list index, so an object's identity pins down exactly
//! which transaction created it.

#[cfg(any(test, feature = "proptest-impl"))]
mod arbitrary;
#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use serde_big_array::big_array;
use sia_serde_derive::{SiaDeserialize, SiaSerialize};

use crate::block::Height;
use crate::contract::{FileContract, FileContractID, FileContractTermination, StorageProof};
use crate::crypto::{self, tag, Hash};
use crate::currency::Currency;
use crate::serialization::{SerializationError, SiaDeserialize, SiaSerialize};
use crate::siacoin::{SiacoinInput, SiacoinOutput, SiacoinOutputID};
use crate::siafund::{SiafundInput, SiafundOutput, SiafundOutputID};

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

big_array! { BigArray; }

/// The ID of a transaction: the tagged hash of its full canonical encoding.
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
pub struct TransactionID(pub crypto::Hash);

impl std::fmt::Display for TransactionID {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// An ed25519 signature.
#[derive(Copy, Clone, Eq, PartialEq, Serialize, Deserialize, SiaSerialize, SiaDeserialize)]
pub struct Signature(#[serde(with = "BigArray")] pub [u8; 64]);

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_tuple("Signature")
            .field(&hex::encode(&self.0[..]))
            .finish()
    }
}

/// Which parts of a transaction a signature commits to.
///
/// Either the whole transaction (every field except the signature list), or
/// an explicit subset given as sorted index lists into each field. Partial
/// coverage lets multiple parties assemble one transaction incrementally.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, SiaSerialize, SiaDeserialize)]
pub struct CoveredFields {
    pub whole_transaction: bool,
    pub siacoin_inputs: Vec<u64>,
    pub siacoin_outputs: Vec<u64>,
    pub file_contracts: Vec<u64>,
    pub file_contract_terminations: Vec<u64>,
    pub storage_proofs: Vec<u64>,
    pub siafund_inputs: Vec<u64>,
    pub siafund_outputs: Vec<u64>,
    pub miner_fees: Vec<u64>,
    pub arbitrary_data: Vec<u64>,
    pub signatures: Vec<u64>,
}

impl CoveredFields {
    /// Coverage of the entire transaction, the common case for single-party
    /// transactions.
    pub fn whole_transaction() -> CoveredFields {
        CoveredFields {
            whole_transaction: true,
            ..CoveredFields::default()
        }
    }
}

/// A signature authorizing one input of a transaction.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, SiaSerialize, SiaDeserialize)]
pub struct TransactionSignature {
    /// The ID of the input (siacoin, siafund, or termination parent) this
    /// signature authorizes.
    pub parent_id: Hash,
    /// Index into the unlock conditions' public key list.
    pub public_key_index: u64,
    /// The signature is invalid before this height.
    pub timelock: Height,
    pub covered_fields: CoveredFields,
    pub signature: Signature,
}

/// A transaction: the unit of value transfer and contract lifecycle.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, SiaSerialize, SiaDeserialize)]
pub struct Transaction {
    pub siacoin_inputs: Vec<SiacoinInput>,
    pub siacoin_outputs: Vec<SiacoinOutput>,
    pub file_contracts: Vec<FileContract>,
    pub file_contract_terminations: Vec<FileContractTermination>,
    pub storage_proofs: Vec<StorageProof>,
    pub siafund_inputs: Vec<SiafundInput>,
    pub siafund_outputs: Vec<SiafundOutput>,
    pub miner_fees: Vec<Currency>,
    pub arbitrary_data: Vec<Vec<u8>>,
    pub signatures: Vec<TransactionSignature>,
}

impl Transaction {
    /// Compute the ID of this transaction.
    pub fn id(&self) -> TransactionID {
        TransactionID(crypto::hash_object(tag::TRANSACTION, self))
    }

    /// The ID of the siacoin output at `index`.
    pub fn siacoin_output_id(&self, index: u64) -> SiacoinOutputID {
        SiacoinOutputID(crypto::hash_all(&[
            tag::SIACOIN_OUTPUT,
            &(self.id().0).0,
            &index.to_le_bytes(),
        ]))
    }

    /// The ID of the file contract at `index`.
    pub fn file_contract_id(&self, index: u64) -> FileContractID {
        FileContractID(crypto::hash_all(&[
            tag::FILE_CONTRACT,
            &(self.id().0).0,
            &index.to_le_bytes(),
        ]))
    }

    /// The ID of the siafund output at `index`.
    pub fn siafund_output_id(&self, index: u64) -> SiafundOutputID {
        SiafundOutputID(crypto::hash_all(&[
            tag::SIAFUND_OUTPUT,
            &(self.id().0).0,
            &index.to_le_bytes(),
        ]))
    }

    /// The ID of the deferred siacoin claim minted when the siafund input at
    /// `index` is spent.
    pub fn siafund_claim_id(&self, index: u64) -> SiacoinOutputID {
        let parent = self.siafund_inputs[index as usize].parent_id;
        SiacoinOutputID(crypto::hash_all(&[tag::SIAFUND_CLAIM, &(parent.0).0]))
    }

    /// Everything the transaction's siacoin inputs must pay for: the new
    /// outputs, the full contract payouts (tax and escrow alike), and the
    /// miner fees.
    pub fn siacoin_output_sum(&self) -> Currency {
        let mut sum = Currency::zero();
        for output in &self.siacoin_outputs {
            sum += &output.value;
        }
        for contract in &self.file_contracts {
            sum += &contract.payout;
        }
        for fee in &self.miner_fees {
            sum += fee;
        }
        sum
    }

    /// The hash that the signature at `sig_index` must sign.
    ///
    /// Whole-transaction coverage hashes every field except the signature
    /// list, then the signing triple (so a signature cannot be re-bound to a
    /// different input or key), then any explicitly covered signatures.
    /// Partial coverage hashes exactly the covered elements in field order.
    ///
    /// Returns `None` if any covered index is out of range; callers validate
    /// covered fields before trusting the hash.
    pub fn sig_hash(&self, sig_index: usize) -> Option<Hash> {
        let sig = self.signatures.get(sig_index)?;
        let covered = &sig.covered_fields;
        let mut writer = crypto::Writer::default();

        if covered.whole_transaction {
            ser(&self.siacoin_inputs, &mut writer);
            ser(&self.siacoin_outputs, &mut writer);
            ser(&self.file_contracts, &mut writer);
            ser(&self.file_contract_terminations, &mut writer);
            ser(&self.storage_proofs, &mut writer);
            ser(&self.siafund_inputs, &mut writer);
            ser(&self.siafund_outputs, &mut writer);
            ser(&self.miner_fees, &mut writer);
            ser(&self.arbitrary_data, &mut writer);
            ser(&sig.parent_id, &mut writer);
            ser(&sig.public_key_index, &mut writer);
            ser(&sig.timelock, &mut writer);
        } else {
            ser_covered(&self.siacoin_inputs, &covered.siacoin_inputs, &mut writer)?;
            ser_covered(&self.siacoin_outputs, &covered.siacoin_outputs, &mut writer)?;
            ser_covered(&self.file_contracts, &covered.file_contracts, &mut writer)?;
            ser_covered(
                &self.file_contract_terminations,
                &covered.file_contract_terminations,
                &mut writer,
            )?;
            ser_covered(&self.storage_proofs, &covered.storage_proofs, &mut writer)?;
            ser_covered(&self.siafund_inputs, &covered.siafund_inputs, &mut writer)?;
            ser_covered(&self.siafund_outputs, &covered.siafund_outputs, &mut writer)?;
            ser_covered(&self.miner_fees, &covered.miner_fees, &mut writer)?;
            ser_covered(&self.arbitrary_data, &covered.arbitrary_data, &mut writer)?;
        }
        ser_covered(&self.signatures, &covered.signatures, &mut writer)?;

        Some(writer.finish())
    }
}

fn ser<T: SiaSerialize>(value: &T, writer: &mut crypto::Writer) {
    value
        .sia_serialize(writer)
        .expect("hash writers are infallible");
}

fn ser_covered<T: SiaSerialize>(
    values: &[T],
    indexes: &[u64],
    writer: &mut crypto::Writer,
) -> Option<()> {
    for &index in indexes {
        ser(values.get(index as usize)?, writer);
    }
    Some(())
}
