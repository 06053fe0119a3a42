//! Applying and reverting blocks.
//!
//! A block's effect on the state is computed and committed in one pass that
//! records every mutation as a diff entry. The committed entries are the
//! ground truth for undo: reverting replays them backwards, and the engine's
//! central correctness property is that apply-then-revert reproduces the
//! exact prior state.
//!
//! Apply order for a block at height `h`:
//! 1. mature the delayed outputs scheduled for `h`;
//! 2. expire file contracts whose window closes at `h`, scheduling their
//!    missed payouts;
//! 3. validate and apply each transaction in declared order;
//! 4. check and schedule the miner payouts;
//! 5. record the siafund pool delta.
//!
//! All methods assume the engine lock is held.

use tracing::trace;

use sia_chain::block::{Block, Height};
use sia_chain::currency::Currency;
use sia_chain::parameters::MATURITY_DELAY;
use sia_chain::siacoin::SiacoinOutput;
use sia_chain::siafund::SiafundOutput;
use sia_chain::transaction::Transaction;

use crate::block::check as block_check;
use crate::diffs::{
    BlockDiff, DelayedSiacoinOutputDiff, DiffDirection, FileContractDiff, SiacoinOutputDiff,
    SiafundOutputDiff, SiafundPoolDiff,
};
use crate::error::BlockError;
use crate::parameters::block_subsidy;
use crate::state::State;

/// Whether a recorded diff is being replayed forwards or backwards.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum CommitDirection {
    Apply,
    Revert,
}

impl State {
    /// Validates and applies the block at `index`, whose parent must be the
    /// current tip and whose ID must already be on the current path.
    /// Generates and stores the node's diff on success. On failure the
    /// state and path are restored exactly and the block is not applied.
    pub(crate) fn apply_block(&mut self, index: usize) -> Result<(), BlockError> {
        let node = &self.nodes[index];
        assert!(
            !node.diffs_generated,
            "applying a block whose diffs are already generated"
        );
        let id = node.id;
        let height = node.height;
        let block = node.block.clone();

        self.current_path.push(id);
        assert_eq!(
            self.height(),
            height,
            "current path length disagrees with the applied block's height"
        );

        let pool_before = self.siafund_pool.clone();
        let mut diff = BlockDiff::new(id);

        match self.apply_block_contents(&mut diff, &block, height) {
            Ok(()) => {
                let adjustment = self
                    .siafund_pool
                    .checked_sub(&pool_before)
                    .expect("siafund pool shrank while applying a block");
                diff.siafund_pool_diff = SiafundPoolDiff {
                    direction: DiffDirection::Add,
                    adjustment,
                };
                let node = &mut self.nodes[index];
                node.diff = diff;
                node.diffs_generated = true;
                trace!(height = height.0, %id, "applied block");
                Ok(())
            }
            Err(error) => {
                // Unwind the partial mutations in reverse, restore the pool
                // to its snapshot, and take the block back off the path.
                self.revert_recorded_entries(&diff);
                self.siafund_pool = pool_before;
                self.current_path.pop();
                Err(error)
            }
        }
    }

    /// Re-applies a block whose diffs were already generated on an earlier
    /// visit to this branch.
    pub(crate) fn reapply_block(&mut self, index: usize) {
        let node = &self.nodes[index];
        assert!(
            node.diffs_generated,
            "reapplying a block that has never generated diffs"
        );
        let id = node.id;
        let diff = node.diff.clone();
        self.current_path.push(id);
        assert_eq!(self.height(), self.nodes[index].height);
        self.commit_block_diff(&diff, CommitDirection::Apply);
    }

    /// Reverts the block at `index`, which must be the current tip. Blocks
    /// on the path always have generated diffs; anything else is an engine
    /// bug.
    pub(crate) fn revert_block(&mut self, index: usize) {
        let node = &self.nodes[index];
        assert!(
            node.diffs_generated,
            "reverting a block whose diffs were never generated"
        );
        assert_eq!(
            self.current_block_id(),
            node.id,
            "reverting a block that is not the current tip"
        );
        let diff = node.diff.clone();
        self.commit_block_diff(&diff, CommitDirection::Revert);
        self.current_path.pop();
        trace!(height = self.height().0, "reverted block");
    }

    fn apply_block_contents(
        &mut self,
        diff: &mut BlockDiff,
        block: &Block,
        height: Height,
    ) -> Result<(), BlockError> {
        self.mature_delayed_outputs(diff, height);
        self.expire_file_contracts(diff, height);

        let mut fees = Currency::zero();
        for transaction in &block.transactions {
            self.valid_transaction(transaction)?;
            self.apply_transaction(diff, transaction, height);
            for fee in &transaction.miner_fees {
                fees += fee;
            }
        }

        let expected_payout = block_subsidy(height) + fees;
        block_check::miner_payouts_are_valid(block, &expected_payout)?;
        for (i, payout) in block.miner_payouts.iter().enumerate() {
            self.apply_delayed_diff(
                diff,
                DelayedSiacoinOutputDiff {
                    maturity_height: height.plus(MATURITY_DELAY),
                    direction: DiffDirection::Add,
                    id: block.miner_payout_id(i as u64),
                    output: payout.clone(),
                },
            );
        }

        Ok(())
    }

    /// Step 1: outputs whose maturity height is `height` become spendable.
    fn mature_delayed_outputs(&mut self, diff: &mut BlockDiff, height: Height) {
        let matured: Vec<_> = match self.delayed_siacoin_outputs.get(&height) {
            Some(outputs) => outputs
                .iter()
                .map(|(id, output)| (*id, output.clone()))
                .collect(),
            None => return,
        };
        for (id, output) in matured {
            self.apply_siacoin_diff(
                diff,
                SiacoinOutputDiff {
                    direction: DiffDirection::Add,
                    id,
                    output: output.clone(),
                },
            );
            self.apply_delayed_diff(
                diff,
                DelayedSiacoinOutputDiff {
                    maturity_height: height,
                    direction: DiffDirection::Remove,
                    id,
                    output,
                },
            );
        }
    }

    /// Step 2: contracts expiring at `height` resolve as missed, scheduling
    /// their missed payouts into the delayed set.
    fn expire_file_contracts(&mut self, diff: &mut BlockDiff, height: Height) {
        let expired: Vec<_> = self
            .file_contracts
            .iter()
            .filter(|(_, contract)| contract.expiration == height)
            .map(|(id, contract)| (*id, contract.clone()))
            .collect();
        for (id, contract) in expired {
            for (i, payout) in contract.missed_proof_outputs.iter().enumerate() {
                self.apply_delayed_diff(
                    diff,
                    DelayedSiacoinOutputDiff {
                        maturity_height: height.plus(MATURITY_DELAY),
                        direction: DiffDirection::Add,
                        id: id.storage_proof_output_id(false, i as u64),
                        output: payout.clone(),
                    },
                );
            }
            self.apply_contract_diff(
                diff,
                FileContractDiff {
                    direction: DiffDirection::Remove,
                    id,
                    contract,
                },
            );
        }
    }

    /// Applies one already-validated transaction, recording its mutations.
    fn apply_transaction(&mut self, diff: &mut BlockDiff, t: &Transaction, height: Height) {
        let maturity = height.plus(MATURITY_DELAY);

        for input in &t.siacoin_inputs {
            let output = self
                .siacoin_outputs
                .get(&input.parent_id)
                .expect("validated siacoin input is missing from the utxo set")
                .clone();
            self.apply_siacoin_diff(
                diff,
                SiacoinOutputDiff {
                    direction: DiffDirection::Remove,
                    id: input.parent_id,
                    output,
                },
            );
        }

        for (i, output) in t.siacoin_outputs.iter().enumerate() {
            self.apply_siacoin_diff(
                diff,
                SiacoinOutputDiff {
                    direction: DiffDirection::Add,
                    id: t.siacoin_output_id(i as u64),
                    output: output.clone(),
                },
            );
        }

        for (i, contract) in t.file_contracts.iter().enumerate() {
            self.apply_contract_diff(
                diff,
                FileContractDiff {
                    direction: DiffDirection::Add,
                    id: t.file_contract_id(i as u64),
                    contract: contract.clone(),
                },
            );
            // Only the tax skimmed off the payout accrues to the pool; the
            // rest is escrowed for the proof outputs. Claims divide the
            // accrued tax among the fund shares.
            self.siafund_pool += &contract.tax();
        }

        for termination in &t.file_contract_terminations {
            let contract = self
                .file_contracts
                .get(&termination.parent_id)
                .expect("validated termination references a missing contract")
                .clone();
            self.apply_contract_diff(
                diff,
                FileContractDiff {
                    direction: DiffDirection::Remove,
                    id: termination.parent_id,
                    contract,
                },
            );
            for (i, payout) in termination.payouts.iter().enumerate() {
                self.apply_delayed_diff(
                    diff,
                    DelayedSiacoinOutputDiff {
                        maturity_height: maturity,
                        direction: DiffDirection::Add,
                        id: termination.parent_id.termination_payout_id(i as u64),
                        output: payout.clone(),
                    },
                );
            }
        }

        for proof in &t.storage_proofs {
            let contract = self
                .file_contracts
                .get(&proof.parent_id)
                .expect("validated storage proof references a missing contract")
                .clone();
            for (i, payout) in contract.valid_proof_outputs.iter().enumerate() {
                self.apply_delayed_diff(
                    diff,
                    DelayedSiacoinOutputDiff {
                        maturity_height: maturity,
                        direction: DiffDirection::Add,
                        id: proof.parent_id.storage_proof_output_id(true, i as u64),
                        output: payout.clone(),
                    },
                );
            }
            self.apply_contract_diff(
                diff,
                FileContractDiff {
                    direction: DiffDirection::Remove,
                    id: proof.parent_id,
                    contract,
                },
            );
        }

        for (i, input) in t.siafund_inputs.iter().enumerate() {
            let output = self
                .siafund_outputs
                .get(&input.parent_id)
                .expect("validated siafund input is missing from the output set")
                .clone();
            let growth = self
                .siafund_pool
                .checked_sub(&output.claim_start)
                .expect("siafund claim start exceeds the current pool");
            let claim = &(&growth * &output.value) / sia_chain::parameters::SIAFUND_COUNT;
            if !claim.is_zero() {
                self.apply_delayed_diff(
                    diff,
                    DelayedSiacoinOutputDiff {
                        maturity_height: maturity,
                        direction: DiffDirection::Add,
                        id: t.siafund_claim_id(i as u64),
                        output: SiacoinOutput {
                            value: claim,
                            unlock_hash: input.claim_unlock_hash,
                        },
                    },
                );
            }
            self.apply_siafund_diff(
                diff,
                SiafundOutputDiff {
                    direction: DiffDirection::Remove,
                    id: input.parent_id,
                    output,
                },
            );
        }

        for (i, output) in t.siafund_outputs.iter().enumerate() {
            // The author does not choose the claim start; consensus pins it
            // to the pool value at creation.
            let output = SiafundOutput {
                value: output.value.clone(),
                unlock_hash: output.unlock_hash,
                claim_start: self.siafund_pool.clone(),
            };
            self.apply_siafund_diff(
                diff,
                SiafundOutputDiff {
                    direction: DiffDirection::Add,
                    id: t.siafund_output_id(i as u64),
                    output,
                },
            );
        }
    }

    // Record-and-commit helpers. Each mutates the state in the apply
    // direction and appends the entry to the block diff, so a partially
    // applied block can always be unwound from what was recorded.

    fn apply_siacoin_diff(&mut self, diff: &mut BlockDiff, entry: SiacoinOutputDiff) {
        self.commit_siacoin_diff(&entry, CommitDirection::Apply);
        diff.siacoin_output_diffs.push(entry);
    }

    fn apply_contract_diff(&mut self, diff: &mut BlockDiff, entry: FileContractDiff) {
        self.commit_contract_diff(&entry, CommitDirection::Apply);
        diff.file_contract_diffs.push(entry);
    }

    fn apply_siafund_diff(&mut self, diff: &mut BlockDiff, entry: SiafundOutputDiff) {
        self.commit_siafund_diff(&entry, CommitDirection::Apply);
        diff.siafund_output_diffs.push(entry);
    }

    fn apply_delayed_diff(&mut self, diff: &mut BlockDiff, entry: DelayedSiacoinOutputDiff) {
        self.commit_delayed_diff(&entry, CommitDirection::Apply);
        diff.delayed_output_diffs.push(entry);
    }

    /// Undoes the entries recorded so far for a block that failed partway
    /// through application. The pool is restored separately by snapshot.
    fn revert_recorded_entries(&mut self, diff: &BlockDiff) {
        for entry in diff.delayed_output_diffs.iter().rev() {
            self.commit_delayed_diff(entry, CommitDirection::Revert);
        }
        for entry in diff.siafund_output_diffs.iter().rev() {
            self.commit_siafund_diff(entry, CommitDirection::Revert);
        }
        for entry in diff.file_contract_diffs.iter().rev() {
            self.commit_contract_diff(entry, CommitDirection::Revert);
        }
        for entry in diff.siacoin_output_diffs.iter().rev() {
            self.commit_siacoin_diff(entry, CommitDirection::Revert);
        }
    }

    /// Commits a whole block diff in the given direction. Reverting walks
    /// every list backwards so that entries touching the same ID (an output
    /// created and spent within one block) unwind in the right order.
    pub(crate) fn commit_block_diff(&mut self, diff: &BlockDiff, direction: CommitDirection) {
        match direction {
            CommitDirection::Apply => {
                for entry in &diff.siacoin_output_diffs {
                    self.commit_siacoin_diff(entry, direction);
                }
                for entry in &diff.file_contract_diffs {
                    self.commit_contract_diff(entry, direction);
                }
                for entry in &diff.siafund_output_diffs {
                    self.commit_siafund_diff(entry, direction);
                }
                for entry in &diff.delayed_output_diffs {
                    self.commit_delayed_diff(entry, direction);
                }
                self.commit_pool_diff(&diff.siafund_pool_diff, direction);
            }
            CommitDirection::Revert => {
                self.commit_pool_diff(&diff.siafund_pool_diff, direction);
                for entry in diff.delayed_output_diffs.iter().rev() {
                    self.commit_delayed_diff(entry, direction);
                }
                for entry in diff.siafund_output_diffs.iter().rev() {
                    self.commit_siafund_diff(entry, direction);
                }
                for entry in diff.file_contract_diffs.iter().rev() {
                    self.commit_contract_diff(entry, direction);
                }
                for entry in diff.siacoin_output_diffs.iter().rev() {
                    self.commit_siacoin_diff(entry, direction);
                }
            }
        }
    }

    fn commit_siacoin_diff(&mut self, entry: &SiacoinOutputDiff, direction: CommitDirection) {
        match effective(entry.direction, direction) {
            DiffDirection::Add => {
                let replaced = self.siacoin_outputs.insert(entry.id, entry.output.clone());
                assert!(replaced.is_none(), "siacoin output id collision");
            }
            DiffDirection::Remove => {
                self.siacoin_outputs
                    .remove(&entry.id)
                    .expect("removing a siacoin output that does not exist");
            }
        }
    }

    fn commit_contract_diff(&mut self, entry: &FileContractDiff, direction: CommitDirection) {
        match effective(entry.direction, direction) {
            DiffDirection::Add => {
                let replaced = self
                    .file_contracts
                    .insert(entry.id, entry.contract.clone());
                assert!(replaced.is_none(), "file contract id collision");
            }
            DiffDirection::Remove => {
                self.file_contracts
                    .remove(&entry.id)
                    .expect("removing a file contract that does not exist");
            }
        }
    }

    fn commit_siafund_diff(&mut self, entry: &SiafundOutputDiff, direction: CommitDirection) {
        match effective(entry.direction, direction) {
            DiffDirection::Add => {
                let replaced = self.siafund_outputs.insert(entry.id, entry.output.clone());
                assert!(replaced.is_none(), "siafund output id collision");
            }
            DiffDirection::Remove => {
                self.siafund_outputs
                    .remove(&entry.id)
                    .expect("removing a siafund output that does not exist");
            }
        }
    }

    fn commit_delayed_diff(&mut self, entry: &DelayedSiacoinOutputDiff, direction: CommitDirection) {
        match effective(entry.direction, direction) {
            DiffDirection::Add => {
                let replaced = self
                    .delayed_siacoin_outputs
                    .entry(entry.maturity_height)
                    .or_insert_with(Default::default)
                    .insert(entry.id, entry.output.clone());
                assert!(replaced.is_none(), "delayed output id collision");
            }
            DiffDirection::Remove => {
                let outputs = self
                    .delayed_siacoin_outputs
                    .get_mut(&entry.maturity_height)
                    .expect("removing a delayed output from an empty maturity height");
                outputs
                    .remove(&entry.id)
                    .expect("removing a delayed output that does not exist");
                if outputs.is_empty() {
                    self.delayed_siacoin_outputs.remove(&entry.maturity_height);
                }
            }
        }
    }

    fn commit_pool_diff(&mut self, entry: &SiafundPoolDiff, direction: CommitDirection) {
        let grow = effective(entry.direction, direction) == DiffDirection::Add;
        if grow {
            self.siafund_pool += &entry.adjustment;
        } else {
            self.siafund_pool = self
                .siafund_pool
                .checked_sub(&entry.adjustment)
                .expect("siafund pool underflow while committing a diff");
        }
    }
}

fn effective(entry: DiffDirection, direction: CommitDirection) -> DiffDirection {
    match direction {
        CommitDirection::Apply => entry,
        CommitDirection::Revert => entry.inverse(),
    }
}
