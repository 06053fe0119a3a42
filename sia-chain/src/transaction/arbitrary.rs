use proptest::{arbitrary::any, collection::vec, prelude::*};

use super::*;
use crate::contract::{FileContract, FileContractTermination, StorageProof};
use crate::siacoin::{SiacoinInput, SiacoinOutput};
use crate::siafund::{SiafundInput, SiafundOutput};
use crate::unlock::UnlockConditions;

impl Arbitrary for Signature {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        // proptest has no array strategies past 32 elements.
        (any::<[u8; 32]>(), any::<[u8; 32]>())
            .prop_map(|(left, right)| {
                let mut bytes = [0u8; 64];
                bytes[..32].copy_from_slice(&left);
                bytes[32..].copy_from_slice(&right);
                Signature(bytes)
            })
            .boxed()
    }
}

impl Arbitrary for UnlockConditions {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        (any::<Height>(), vec(any::<crate::unlock::PublicKey>(), 0..3), any::<u64>())
            .prop_map(|(timelock, public_keys, signatures_required)| UnlockConditions {
                timelock,
                public_keys,
                signatures_required,
            })
            .boxed()
    }
}

impl Arbitrary for SiacoinInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        (any::<SiacoinOutputID>(), any::<UnlockConditions>())
            .prop_map(|(parent_id, unlock_conditions)| SiacoinInput {
                parent_id,
                unlock_conditions,
            })
            .boxed()
    }
}

impl Arbitrary for SiacoinOutput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        (any::<Currency>(), any::<crate::unlock::UnlockHash>())
            .prop_map(|(value, unlock_hash)| SiacoinOutput { value, unlock_hash })
            .boxed()
    }
}

impl Arbitrary for SiafundInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        (
            any::<crate::siafund::SiafundOutputID>(),
            any::<UnlockConditions>(),
            any::<crate::unlock::UnlockHash>(),
        )
            .prop_map(|(parent_id, unlock_conditions, claim_unlock_hash)| SiafundInput {
                parent_id,
                unlock_conditions,
                claim_unlock_hash,
            })
            .boxed()
    }
}

impl Arbitrary for SiafundOutput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        (any::<Currency>(), any::<crate::unlock::UnlockHash>(), any::<Currency>())
            .prop_map(|(value, unlock_hash, claim_start)| SiafundOutput {
                value,
                unlock_hash,
                claim_start,
            })
            .boxed()
    }
}

impl Arbitrary for FileContract {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        (
            any::<u64>(),
            any::<Hash>(),
            any::<Height>(),
            any::<Height>(),
            any::<Currency>(),
            vec(any::<SiacoinOutput>(), 0..3),
            vec(any::<SiacoinOutput>(), 0..3),
            any::<crate::unlock::UnlockHash>(),
        )
            .prop_map(
                |(
                    file_size,
                    file_merkle_root,
                    start,
                    expiration,
                    payout,
                    valid_proof_outputs,
                    missed_proof_outputs,
                    termination_hash,
                )| FileContract {
                    file_size,
                    file_merkle_root,
                    start,
                    expiration,
                    payout,
                    valid_proof_outputs,
                    missed_proof_outputs,
                    termination_hash,
                },
            )
            .boxed()
    }
}

impl Arbitrary for FileContractTermination {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        (
            any::<crate::contract::FileContractID>(),
            any::<UnlockConditions>(),
            vec(any::<SiacoinOutput>(), 0..3),
        )
            .prop_map(|(parent_id, termination_conditions, payouts)| FileContractTermination {
                parent_id,
                termination_conditions,
                payouts,
            })
            .boxed()
    }
}

impl Arbitrary for StorageProof {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        (
            any::<crate::contract::FileContractID>(),
            vec(any::<u8>(), 0..=crate::parameters::SEGMENT_SIZE as usize),
            vec(any::<Hash>(), 0..6),
        )
            .prop_map(|(parent_id, segment, hash_set)| StorageProof {
                parent_id,
                segment,
                hash_set,
            })
            .boxed()
    }
}

impl Arbitrary for CoveredFields {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        (any::<bool>(), vec(any::<u64>(), 0..3), vec(any::<u64>(), 0..3))
            .prop_map(|(whole_transaction, siacoin_inputs, signatures)| CoveredFields {
                whole_transaction,
                siacoin_inputs,
                signatures,
                ..CoveredFields::default()
            })
            .boxed()
    }
}

impl Arbitrary for TransactionSignature {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        (
            any::<Hash>(),
            any::<u64>(),
            any::<Height>(),
            any::<CoveredFields>(),
            any::<Signature>(),
        )
            .prop_map(
                |(parent_id, public_key_index, timelock, covered_fields, signature)| {
                    TransactionSignature {
                        parent_id,
                        public_key_index,
                        timelock,
                        covered_fields,
                        signature,
                    }
                },
            )
            .boxed()
    }
}

impl Arbitrary for Transaction {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        (
            (
                vec(any::<SiacoinInput>(), 0..3),
                vec(any::<SiacoinOutput>(), 0..3),
                vec(any::<FileContract>(), 0..2),
                vec(any::<FileContractTermination>(), 0..2),
                vec(any::<StorageProof>(), 0..2),
            ),
            (
                vec(any::<SiafundInput>(), 0..2),
                vec(any::<SiafundOutput>(), 0..2),
                vec(any::<Currency>(), 0..3),
                vec(vec(any::<u8>(), 0..24), 0..2),
                vec(any::<TransactionSignature>(), 0..3),
            ),
        )
            .prop_map(
                |(
                    (
                        siacoin_inputs,
                        siacoin_outputs,
                        file_contracts,
                        file_contract_terminations,
                        storage_proofs,
                    ),
                    (siafund_inputs, siafund_outputs, miner_fees, arbitrary_data, signatures),
                )| Transaction {
                    siacoin_inputs,
                    siacoin_outputs,
                    file_contracts,
                    file_contract_terminations,
                    storage_proofs,
                    siafund_inputs,
                    siafund_outputs,
                    miner_fees,
                    arbitrary_data,
                    signatures,
                },
            )
            .boxed()
    }
}
