//! Standalone transaction checks: rules that depend only on the transaction
//! itself and the current height, never on the consensus indexes. The
//! transaction pool applies these to unconfirmed transactions with the same
//! semantics.

use std::collections::{HashMap, HashSet};

use sia_chain::block::Height;
use sia_chain::crypto::Hash;
use sia_chain::currency::Currency;
use sia_chain::parameters::TRANSACTION_SIZE_LIMIT;
use sia_chain::transaction::{CoveredFields, Transaction};
use sia_chain::unlock::PublicKey;
use sia_chain::SiaSerialize;

use crate::error::TransactionError;

/// Checks every standalone rule, in order.
pub fn standalone_valid(t: &Transaction, height: Height) -> Result<(), TransactionError> {
    size_is_valid(t)?;
    has_value_flow(t)?;
    input_timelocks_are_met(t, height)?;
    storage_proofs_are_exclusive(t)?;
    file_contracts_are_well_formed(t, height)?;
    signatures_are_valid(t, height)?;
    Ok(())
}

/// The encoded transaction must leave room in a block for the header-side
/// fields.
fn size_is_valid(t: &Transaction) -> Result<(), TransactionError> {
    let encoded = t
        .sia_serialize_to_vec()
        .expect("serializing to a Vec is infallible");
    if encoded.len() as u64 > TRANSACTION_SIZE_LIMIT {
        return Err(TransactionError::TooLarge);
    }
    Ok(())
}

/// Rejects transactions with no flows at all, and any zero-valued output,
/// fee, or payout: worthless entries would bloat the output sets forever.
/// Arbitrary data alone is a legitimate transaction (announcements ride in
/// otherwise-empty transactions).
fn has_value_flow(t: &Transaction) -> Result<(), TransactionError> {
    let empty = t.siacoin_inputs.is_empty()
        && t.siacoin_outputs.is_empty()
        && t.file_contracts.is_empty()
        && t.file_contract_terminations.is_empty()
        && t.storage_proofs.is_empty()
        && t.siafund_inputs.is_empty()
        && t.siafund_outputs.is_empty()
        && t.miner_fees.is_empty()
        && t.arbitrary_data.is_empty();
    if empty {
        return Err(TransactionError::EmptyTransaction);
    }

    let zero_siacoin = t.siacoin_outputs.iter().any(|o| o.value.is_zero());
    let zero_siafund = t.siafund_outputs.iter().any(|o| o.value.is_zero());
    let zero_fee = t.miner_fees.iter().any(Currency::is_zero);
    let zero_termination_payout = t
        .file_contract_terminations
        .iter()
        .flat_map(|fct| fct.payouts.iter())
        .any(|o| o.value.is_zero());
    let zero_proof_payout = t.file_contracts.iter().any(|fc| {
        fc.valid_proof_outputs
            .iter()
            .chain(fc.missed_proof_outputs.iter())
            .any(|o| o.value.is_zero())
    });
    if zero_siacoin || zero_siafund || zero_fee || zero_termination_payout || zero_proof_payout {
        return Err(TransactionError::ZeroValueOutput);
    }
    Ok(())
}

/// Every set of unlock conditions revealed by an input must have an elapsed
/// timelock.
fn input_timelocks_are_met(t: &Transaction, height: Height) -> Result<(), TransactionError> {
    let conditions = t
        .siacoin_inputs
        .iter()
        .map(|input| &input.unlock_conditions)
        .chain(t.siafund_inputs.iter().map(|input| &input.unlock_conditions))
        .chain(
            t.file_contract_terminations
                .iter()
                .map(|fct| &fct.termination_conditions),
        );
    for unlock_conditions in conditions {
        if unlock_conditions.timelock > height {
            return Err(TransactionError::InputTimelockNotMet);
        }
    }
    Ok(())
}

/// A transaction carrying a storage proof must carry nothing that creates
/// outputs or alters contracts. Proof payouts are delayed, and keeping proof
/// transactions inert otherwise means a reorged proof cannot strand
/// downstream spends.
fn storage_proofs_are_exclusive(t: &Transaction) -> Result<(), TransactionError> {
    if t.storage_proofs.is_empty() {
        return Ok(());
    }
    if !t.siacoin_outputs.is_empty()
        || !t.file_contracts.is_empty()
        || !t.file_contract_terminations.is_empty()
        || !t.siafund_outputs.is_empty()
    {
        return Err(TransactionError::StorageProofWithOutputs);
    }
    Ok(())
}

/// New contracts must open their proof window in the future and close it
/// after it opens, and must carry a nonzero payout. The siafund tax comes
/// off the payout first; both resolution paths redistribute the remaining
/// escrow exactly, so no resolution can pay out coins the pool already
/// absorbed.
fn file_contracts_are_well_formed(t: &Transaction, height: Height) -> Result<(), TransactionError> {
    for contract in &t.file_contracts {
        if contract.start <= height || contract.expiration <= contract.start {
            return Err(TransactionError::BadContractWindow);
        }
        if contract.payout.is_zero() {
            return Err(TransactionError::BadContractPayout);
        }
        let escrow = contract.escrow();
        let valid_sum: Currency = contract
            .valid_proof_outputs
            .iter()
            .map(|o| &o.value)
            .sum();
        let missed_sum: Currency = contract
            .missed_proof_outputs
            .iter()
            .map(|o| &o.value)
            .sum();
        if valid_sum != escrow || missed_sum != escrow {
            return Err(TransactionError::BadContractPayout);
        }
    }
    Ok(())
}

/// Tracks the outstanding signature requirement for one input.
struct SigRequirement<'a> {
    keys: &'a [PublicKey],
    remaining: u64,
    used_keys: HashSet<u64>,
}

/// Checks signature coverage: every object that reveals unlock conditions
/// (siacoin inputs, siafund inputs, contract terminations) must collect
/// signatures from the required number of distinct listed keys, each
/// signature must verify over the hash of the fields it covers, and no
/// signature may be superfluous, repeated, or dangling. Duplicate parent
/// IDs are rejected here too: a transaction cannot spend or terminate the
/// same object twice.
fn signatures_are_valid(t: &Transaction, height: Height) -> Result<(), TransactionError> {
    let mut requirements: HashMap<Hash, SigRequirement<'_>> = HashMap::new();

    for input in &t.siacoin_inputs {
        add_requirement(
            &mut requirements,
            input.parent_id.0,
            &input.unlock_conditions.public_keys,
            input.unlock_conditions.signatures_required,
        )?;
    }
    for termination in &t.file_contract_terminations {
        add_requirement(
            &mut requirements,
            termination.parent_id.0,
            &termination.termination_conditions.public_keys,
            termination.termination_conditions.signatures_required,
        )?;
    }
    for input in &t.siafund_inputs {
        add_requirement(
            &mut requirements,
            input.parent_id.0,
            &input.unlock_conditions.public_keys,
            input.unlock_conditions.signatures_required,
        )?;
    }

    for (i, sig) in t.signatures.iter().enumerate() {
        let requirement = requirements
            .get_mut(&sig.parent_id)
            .ok_or(TransactionError::UnrecognizedSignature)?;

        if requirement.remaining == 0 {
            return Err(TransactionError::FrivolousSignature);
        }
        if sig.public_key_index >= requirement.keys.len() as u64 {
            return Err(TransactionError::InvalidPublicKeyIndex);
        }
        if !requirement.used_keys.insert(sig.public_key_index) {
            return Err(TransactionError::RepeatSignature);
        }
        if sig.timelock > height {
            return Err(TransactionError::SignatureTimelockNotMet);
        }
        covered_fields_are_well_formed(&sig.covered_fields, t)?;

        let sig_hash = t
            .sig_hash(i)
            .expect("covered fields were checked before hashing");
        let key = requirement.keys[sig.public_key_index as usize];
        if !key.verify(&sig_hash.0, &sig.signature.0) {
            return Err(TransactionError::InvalidSignature);
        }

        requirement.remaining -= 1;
    }

    if requirements.values().any(|r| r.remaining > 0) {
        return Err(TransactionError::MissingSignatures);
    }
    Ok(())
}

fn add_requirement<'a>(
    requirements: &mut HashMap<Hash, SigRequirement<'a>>,
    parent: Hash,
    keys: &'a [PublicKey],
    needed: u64,
) -> Result<(), TransactionError> {
    let previous = requirements.insert(
        parent,
        SigRequirement {
            keys,
            remaining: needed,
            used_keys: HashSet::new(),
        },
    );
    if previous.is_some() {
        return Err(TransactionError::DoubleSpend);
    }
    Ok(())
}

/// Covered-field index lists must be sorted, duplicate-free, and in range,
/// and whole-transaction coverage must not also enumerate fields (the
/// signature list excepted, since whole coverage never includes it
/// implicitly).
fn covered_fields_are_well_formed(
    covered: &CoveredFields,
    t: &Transaction,
) -> Result<(), TransactionError> {
    if covered.whole_transaction {
        let enumerates_fields = !covered.siacoin_inputs.is_empty()
            || !covered.siacoin_outputs.is_empty()
            || !covered.file_contracts.is_empty()
            || !covered.file_contract_terminations.is_empty()
            || !covered.storage_proofs.is_empty()
            || !covered.siafund_inputs.is_empty()
            || !covered.siafund_outputs.is_empty()
            || !covered.miner_fees.is_empty()
            || !covered.arbitrary_data.is_empty();
        if enumerates_fields {
            return Err(TransactionError::WholeTransactionViolation);
        }
    }

    sorted_unique_in_range(&covered.siacoin_inputs, t.siacoin_inputs.len())?;
    sorted_unique_in_range(&covered.siacoin_outputs, t.siacoin_outputs.len())?;
    sorted_unique_in_range(&covered.file_contracts, t.file_contracts.len())?;
    sorted_unique_in_range(
        &covered.file_contract_terminations,
        t.file_contract_terminations.len(),
    )?;
    sorted_unique_in_range(&covered.storage_proofs, t.storage_proofs.len())?;
    sorted_unique_in_range(&covered.siafund_inputs, t.siafund_inputs.len())?;
    sorted_unique_in_range(&covered.siafund_outputs, t.siafund_outputs.len())?;
    sorted_unique_in_range(&covered.miner_fees, t.miner_fees.len())?;
    sorted_unique_in_range(&covered.arbitrary_data, t.arbitrary_data.len())?;
    sorted_unique_in_range(&covered.signatures, t.signatures.len())?;
    Ok(())
}

fn sorted_unique_in_range(indexes: &[u64], len: usize) -> Result<(), TransactionError> {
    for window in indexes.windows(2) {
        if window[0] >= window[1] {
            return Err(TransactionError::InvalidCoveredFields);
        }
    }
    if let Some(&last) = indexes.last() {
        if last >= len as u64 {
            return Err(TransactionError::InvalidCoveredFields);
        }
    }
    Ok(())
}
