//! The consensus state: the block tree and every derived index.
//!
//! `State` is guarded by the single engine lock in [`crate::ConsensusSet`].
//! Public API methods take the lock exactly once at entry; every method in
//! this module assumes the lock is already held and must not be reachable
//! any other way. Helpers here never re-acquire the lock.
//!
//! The block tree is an arena: nodes live in a `Vec` for the lifetime of the
//! process and refer to each other by index, with a map from block ID to
//! index on the side. All value indexes are ordered maps so that iteration
//! (and therefore diff emission, subscriber notification, and the state
//! checksum) is deterministic across runs and platforms.

use std::collections::{BTreeMap, HashMap};

use tokio::sync::mpsc::UnboundedSender;

use sia_chain::block::{Block, BlockID, Height, Timestamp};
use sia_chain::contract::{FileContract, FileContractID};
use sia_chain::crypto::{self, Hash};
use sia_chain::currency::Currency;
use sia_chain::parameters::{
    GENESIS_BLOCK, GENESIS_BLOCK_ID, GENESIS_SIAFUND_ALLOCATION, GENESIS_SIAFUND_OUTPUT_ID,
    MEDIAN_TIMESTAMP_WINDOW, ROOT_TARGET,
};
use sia_chain::siacoin::{SiacoinOutput, SiacoinOutputID};
use sia_chain::siafund::{SiafundOutput, SiafundOutputID};
use sia_chain::work::{Depth, Target};
use sia_chain::SiaSerialize;

use crate::diffs::{BlockDiff, ConsensusChange, DiffDirection, SiafundOutputDiff};
use crate::error::TransactionError;

/// A block and its position in the tree.
pub(crate) struct BlockNode {
    pub block: Block,
    pub id: BlockID,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub height: Height,
    /// Cumulative weight of the chain ending at this block.
    pub depth: Depth,
    /// The target this node's children must meet.
    pub target: Target,
    /// Whether `diff` has been generated by applying this block. Blocks off
    /// the current path may never have diffs.
    pub diffs_generated: bool,
    pub diff: BlockDiff,
    /// Set when this block (or an ancestor) failed full validation while
    /// being applied; descendants of invalid blocks are never applied.
    pub invalid: bool,
}

pub(crate) struct State {
    pub nodes: Vec<BlockNode>,
    pub node_index: HashMap<BlockID, usize>,
    /// The heaviest known chain, dense from genesis at index 0 to the tip.
    pub current_path: Vec<BlockID>,

    pub siacoin_outputs: BTreeMap<SiacoinOutputID, SiacoinOutput>,
    pub file_contracts: BTreeMap<FileContractID, FileContract>,
    pub siafund_outputs: BTreeMap<SiafundOutputID, SiafundOutput>,
    /// Outputs that exist but cannot be spent until their maturity height,
    /// keyed by that height.
    pub delayed_siacoin_outputs: BTreeMap<Height, BTreeMap<SiacoinOutputID, SiacoinOutput>>,
    /// Running total of the tax skimmed from file contract payouts, the
    /// basis for siafund claims.
    pub siafund_pool: Currency,

    pub subscribers: Vec<UnboundedSender<ConsensusChange>>,
}

impl State {
    /// A state containing only the genesis block, with the genesis siafund
    /// allocation applied through the ordinary diff machinery so that
    /// subscribers replaying from the beginning see it like any other
    /// change.
    pub(crate) fn new() -> State {
        let genesis_id = *GENESIS_BLOCK_ID;
        let mut diff = BlockDiff::new(genesis_id);
        diff.siafund_output_diffs.push(SiafundOutputDiff {
            direction: DiffDirection::Add,
            id: *GENESIS_SIAFUND_OUTPUT_ID,
            output: GENESIS_SIAFUND_ALLOCATION.clone(),
        });

        let genesis_node = BlockNode {
            block: GENESIS_BLOCK.clone(),
            id: genesis_id,
            parent: None,
            children: Vec::new(),
            height: Height(0),
            depth: Depth::from_target(&ROOT_TARGET),
            target: ROOT_TARGET,
            diffs_generated: true,
            diff: diff.clone(),
            invalid: false,
        };

        let mut state = State {
            nodes: vec![genesis_node],
            node_index: HashMap::new(),
            current_path: vec![genesis_id],
            siacoin_outputs: BTreeMap::new(),
            file_contracts: BTreeMap::new(),
            siafund_outputs: BTreeMap::new(),
            delayed_siacoin_outputs: BTreeMap::new(),
            siafund_pool: Currency::zero(),
            subscribers: Vec::new(),
        };
        state.node_index.insert(genesis_id, 0);
        state.commit_block_diff(&diff, crate::update::CommitDirection::Apply);
        state
    }

    /// The height of the current path's tip.
    pub(crate) fn height(&self) -> Height {
        Height(self.current_path.len() as u64 - 1)
    }

    pub(crate) fn current_block_id(&self) -> BlockID {
        *self
            .current_path
            .last()
            .expect("current path always contains the genesis block")
    }

    pub(crate) fn current_block_index(&self) -> usize {
        self.index_of(&self.current_block_id())
            .expect("current path tip is missing from the block map")
    }

    pub(crate) fn index_of(&self, id: &BlockID) -> Option<usize> {
        self.node_index.get(id).copied()
    }

    /// Whether `index` sits on the current path at its own height.
    pub(crate) fn is_on_current_path(&self, index: usize) -> bool {
        let node = &self.nodes[index];
        self.current_path.get(node.height.0 as usize) == Some(&node.id)
    }

    /// The minimum timestamp a child of `index` may carry: the median of the
    /// trailing window of timestamps ending at `index`.
    pub(crate) fn earliest_child_timestamp(&self, index: usize) -> Timestamp {
        let mut timestamps = Vec::with_capacity(MEDIAN_TIMESTAMP_WINDOW);
        let mut cursor = Some(index);
        while let Some(i) = cursor {
            if timestamps.len() == MEDIAN_TIMESTAMP_WINDOW {
                break;
            }
            timestamps.push(self.nodes[i].block.timestamp);
            cursor = self.nodes[i].parent;
        }
        timestamps.sort();
        timestamps[timestamps.len() / 2]
    }

    /// Walks from `index` back toward genesis until reaching a node on the
    /// current path, returning the indexes from that common ancestor up to
    /// `index` in ascending height order.
    pub(crate) fn backtrack_to_current_path(&self, index: usize) -> Vec<usize> {
        let mut path = Vec::new();
        let mut cursor = index;
        loop {
            path.push(cursor);
            if self.is_on_current_path(cursor) {
                break;
            }
            cursor = self.nodes[cursor]
                .parent
                .expect("every block node chains back to the genesis block");
        }
        path.reverse();
        path
    }

    /// The segment a storage proof for `id` must reveal. The challenge mixes
    /// the contract ID with the block that sealed the contract's window
    /// start, so it is unpredictable until that block is mined.
    pub(crate) fn storage_proof_segment(
        &self,
        id: FileContractID,
    ) -> Result<u64, TransactionError> {
        let contract = self
            .file_contracts
            .get(&id)
            .ok_or(TransactionError::MissingFileContract)?;

        let trigger_height = contract
            .start
            .predecessor()
            .ok_or(TransactionError::MissingTriggerBlock)?;
        if trigger_height > self.height() {
            return Err(TransactionError::MissingTriggerBlock);
        }
        let trigger_id = self.current_path[trigger_height.0 as usize];

        let seed = crypto::hash_all(&[&(trigger_id.0).0, &(id.0).0]);
        Ok(seed.modulo(contract.segment_count()))
    }

    /// All unspent siacoin outputs in ascending numerical ID order.
    pub(crate) fn sorted_utxo_set(&self) -> Vec<(SiacoinOutputID, SiacoinOutput)> {
        self.siacoin_outputs
            .iter()
            .map(|(id, output)| (*id, output.clone()))
            .collect()
    }

    /// All unspent siafund outputs in ascending numerical ID order.
    pub(crate) fn sorted_siafund_set(&self) -> Vec<(SiafundOutputID, SiafundOutput)> {
        self.siafund_outputs
            .iter()
            .map(|(id, output)| (*id, output.clone()))
            .collect()
    }

    /// A digest of everything consensus-critical in the state. Two engines
    /// that accepted the same blocks must produce identical checksums.
    pub(crate) fn consensus_checksum(&self) -> Hash {
        let mut writer = crypto::Writer::default();

        ser(&self.current_path, &mut writer);

        ser(&(self.siacoin_outputs.len() as u64), &mut writer);
        for (id, output) in &self.siacoin_outputs {
            ser(id, &mut writer);
            ser(output, &mut writer);
        }

        ser(&(self.file_contracts.len() as u64), &mut writer);
        for (id, contract) in &self.file_contracts {
            ser(id, &mut writer);
            ser(contract, &mut writer);
        }

        ser(&(self.siafund_outputs.len() as u64), &mut writer);
        for (id, output) in &self.siafund_outputs {
            ser(id, &mut writer);
            ser(output, &mut writer);
        }

        ser(&(self.delayed_siacoin_outputs.len() as u64), &mut writer);
        for (maturity, outputs) in &self.delayed_siacoin_outputs {
            ser(maturity, &mut writer);
            ser(&(outputs.len() as u64), &mut writer);
            for (id, output) in outputs {
                ser(id, &mut writer);
                ser(output, &mut writer);
            }
        }

        ser(&self.siafund_pool, &mut writer);

        writer.finish()
    }
}

fn ser<T: SiaSerialize>(value: &T, writer: &mut crypto::Writer) {
    value
        .sia_serialize(writer)
        .expect("hash writers are infallible");
}
