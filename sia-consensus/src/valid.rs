//! Contextual transaction validation: rules that consult the consensus
//! state. All methods assume the engine lock is held.

use sia_chain::currency::Currency;
use sia_chain::crypto::merkle;
use sia_chain::transaction::Transaction;

use crate::error::TransactionError;
use crate::state::State;
use crate::transaction::check as transaction_check;

impl State {
    /// Checks that a transaction is valid in the context of the current
    /// consensus state, standalone rules included.
    pub(crate) fn valid_transaction(&self, t: &Transaction) -> Result<(), TransactionError> {
        transaction_check::standalone_valid(t, self.height())?;

        self.valid_siacoins(t)?;
        self.valid_file_contract_terminations(t)?;
        self.valid_storage_proofs(t)?;
        self.valid_siafunds(t)?;
        Ok(())
    }

    /// Checks that the siacoin inputs spend live outputs with matching
    /// unlock conditions, and that the value flowing in equals the value
    /// flowing out.
    fn valid_siacoins(&self, t: &Transaction) -> Result<(), TransactionError> {
        let mut input_sum = Currency::zero();
        for input in &t.siacoin_inputs {
            let output = self
                .siacoin_outputs
                .get(&input.parent_id)
                .ok_or(TransactionError::MissingSiacoinOutput)?;

            if input.unlock_conditions.unlock_hash() != output.unlock_hash {
                return Err(TransactionError::UnlockHashMismatch);
            }

            input_sum += &output.value;
        }
        if input_sum != t.siacoin_output_sum() {
            return Err(TransactionError::OutputSumMismatch);
        }
        Ok(())
    }

    /// Checks that each termination dissolves a live contract, before its
    /// proof window opens, with the committed conditions and the exact
    /// after-tax escrow. The tax stays in the pool.
    fn valid_file_contract_terminations(&self, t: &Transaction) -> Result<(), TransactionError> {
        for termination in &t.file_contract_terminations {
            let contract = self
                .file_contracts
                .get(&termination.parent_id)
                .ok_or(TransactionError::MissingFileContract)?;

            // Once the proof window has opened, the contract can only
            // resolve through a proof or expiration.
            if self.height() >= contract.start {
                return Err(TransactionError::TerminationTooLate);
            }

            if termination.termination_conditions.unlock_hash() != contract.termination_hash {
                return Err(TransactionError::UnlockHashMismatch);
            }

            let payout_sum: Currency = termination
                .payouts
                .iter()
                .map(|payout| &payout.value)
                .sum();
            if payout_sum != contract.escrow() {
                return Err(TransactionError::TerminationPayoutMismatch);
            }
        }
        Ok(())
    }

    /// Checks that each storage proof reveals the challenged segment of a
    /// live contract's file.
    pub(crate) fn valid_storage_proofs(&self, t: &Transaction) -> Result<(), TransactionError> {
        for proof in &t.storage_proofs {
            let contract = self
                .file_contracts
                .get(&proof.parent_id)
                .ok_or(TransactionError::MissingFileContract)?;

            let segment_index = self.storage_proof_segment(proof.parent_id)?;

            let verified = merkle::verify_segment(
                &proof.segment,
                &proof.hash_set,
                contract.segment_count(),
                segment_index,
                contract.file_merkle_root,
            );
            if !verified {
                return Err(TransactionError::InvalidStorageProof);
            }
        }
        Ok(())
    }

    /// Checks that the siafund inputs spend live outputs with matching
    /// unlock conditions and that the share supply is conserved exactly.
    fn valid_siafunds(&self, t: &Transaction) -> Result<(), TransactionError> {
        let mut input_sum = Currency::zero();
        for input in &t.siafund_inputs {
            let output = self
                .siafund_outputs
                .get(&input.parent_id)
                .ok_or(TransactionError::MissingSiafundOutput)?;

            if input.unlock_conditions.unlock_hash() != output.unlock_hash {
                return Err(TransactionError::UnlockHashMismatch);
            }

            input_sum += &output.value;
        }
        let output_sum: Currency = t
            .siafund_outputs
            .iter()
            .map(|output| &output.value)
            .sum();
        if input_sum != output_sum {
            return Err(TransactionError::FundSupplyImbalance);
        }
        Ok(())
    }
}
