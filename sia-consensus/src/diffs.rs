//! Reversible state diffs.
//!
//! Applying a block produces a `BlockDiff`: the exact list of index
//! mutations the block caused, in order. Committing the same diff in the
//! opposite direction restores the precise prior state, which is what makes
//! reorganizations safe. Diffs are also the engine's outbound language:
//! subscribers mirror consensus state purely by replaying them.

use serde::{Deserialize, Serialize};

use sia_chain::block::{BlockID, Height};
use sia_chain::contract::{FileContract, FileContractID};
use sia_chain::currency::Currency;
use sia_chain::siacoin::{SiacoinOutput, SiacoinOutputID};
use sia_chain::siafund::{SiafundOutput, SiafundOutputID};

/// Whether a diff entry introduces or deletes its object.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum DiffDirection {
    Add,
    Remove,
}

impl DiffDirection {
    pub fn inverse(self) -> DiffDirection {
        match self {
            DiffDirection::Add => DiffDirection::Remove,
            DiffDirection::Remove => DiffDirection::Add,
        }
    }
}

/// A change to the unspent siacoin output set.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SiacoinOutputDiff {
    pub direction: DiffDirection,
    pub id: SiacoinOutputID,
    pub output: SiacoinOutput,
}

/// A change to the active file contract set.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FileContractDiff {
    pub direction: DiffDirection,
    pub id: FileContractID,
    pub contract: FileContract,
}

/// A change to the unspent siafund output set.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SiafundOutputDiff {
    pub direction: DiffDirection,
    pub id: SiafundOutputID,
    pub output: SiafundOutput,
}

/// A change to the delayed output set: an output scheduled to join the
/// spendable set at `maturity_height`, or removed from the schedule because
/// it matured.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DelayedSiacoinOutputDiff {
    pub maturity_height: Height,
    pub direction: DiffDirection,
    pub id: SiacoinOutputID,
    pub output: SiacoinOutput,
}

/// The block's net effect on the siafund fee pool.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SiafundPoolDiff {
    pub direction: DiffDirection,
    pub adjustment: Currency,
}

impl Default for SiafundPoolDiff {
    fn default() -> Self {
        SiafundPoolDiff {
            direction: DiffDirection::Add,
            adjustment: Currency::zero(),
        }
    }
}

/// Every index mutation caused by one block, in application order.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BlockDiff {
    /// The block that produced these diffs.
    pub block_id: BlockID,
    pub siacoin_output_diffs: Vec<SiacoinOutputDiff>,
    pub file_contract_diffs: Vec<FileContractDiff>,
    pub siafund_output_diffs: Vec<SiafundOutputDiff>,
    pub delayed_output_diffs: Vec<DelayedSiacoinOutputDiff>,
    pub siafund_pool_diff: SiafundPoolDiff,
}

impl BlockDiff {
    pub fn new(block_id: BlockID) -> BlockDiff {
        BlockDiff {
            block_id,
            siacoin_output_diffs: Vec::new(),
            file_contract_diffs: Vec::new(),
            siafund_output_diffs: Vec::new(),
            delayed_output_diffs: Vec::new(),
            siafund_pool_diff: SiafundPoolDiff::default(),
        }
    }
}

/// One notification batch: everything a single `accept_block` call undid,
/// in the order it was undone, followed by everything it applied, in height
/// order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConsensusChange {
    pub reverted: Vec<BlockDiff>,
    pub applied: Vec<BlockDiff>,
}
