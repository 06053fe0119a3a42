//! Read queries. Every method takes the shared lock once and answers from a
//! consistent snapshot: a reader sees the state after some prefix of
//! accepted blocks, never a partial application.

use sia_chain::block::{Block, BlockID, Height, Timestamp};
use sia_chain::contract::{FileContract, FileContractID};
use sia_chain::crypto::Hash;
use sia_chain::currency::Currency;
use sia_chain::siacoin::{SiacoinOutput, SiacoinOutputID};
use sia_chain::siafund::{SiafundOutput, SiafundOutputID};
use sia_chain::transaction::Transaction;
use sia_chain::work::Target;

use crate::diffs::SiacoinOutputDiff;
use crate::error::{QueryError, TransactionError};
use crate::state::State;
use crate::ConsensusSet;

impl ConsensusSet {
    fn read<T>(&self, query: impl FnOnce(&State) -> T) -> T {
        let state = self.state.read().expect("consensus set lock poisoned");
        query(&state)
    }

    /// The height of the heaviest known chain.
    pub fn height(&self) -> Height {
        self.read(|state| state.height())
    }

    /// The tip of the heaviest known chain.
    pub fn current_block(&self) -> Block {
        self.read(|state| {
            state.nodes[state.current_block_index()].block.clone()
        })
    }

    /// The target the next block must meet to extend the current tip.
    pub fn current_target(&self) -> Target {
        self.read(|state| state.nodes[state.current_block_index()].target)
    }

    /// The target a child of `id` must meet, or `None` for unknown blocks.
    pub fn child_target(&self, id: BlockID) -> Option<Target> {
        self.read(|state| state.index_of(&id).map(|index| state.nodes[index].target))
    }

    /// The earliest timestamp a child of `id` may carry, or `None` for
    /// unknown blocks.
    pub fn earliest_child_timestamp(&self, id: BlockID) -> Option<Timestamp> {
        self.read(|state| {
            state
                .index_of(&id)
                .map(|index| state.earliest_child_timestamp(index))
        })
    }

    /// The block at `height` on the current path.
    pub fn block_at_height(&self, height: Height) -> Option<Block> {
        self.read(|state| {
            let id = state.current_path.get(height.0 as usize)?;
            let index = state.index_of(id)?;
            Some(state.nodes[index].block.clone())
        })
    }

    /// The block with the given ID, on any fork.
    pub fn block(&self, id: BlockID) -> Option<Block> {
        self.read(|state| state.index_of(&id).map(|index| state.nodes[index].block.clone()))
    }

    /// The blocks of the current path with heights in `[start, stop]`,
    /// inclusive.
    pub fn block_range(&self, start: Height, stop: Height) -> Result<Vec<Block>, QueryError> {
        self.read(|state| {
            if start > stop || stop > state.height() {
                return Err(QueryError::InvalidRange);
            }
            let mut blocks = Vec::with_capacity((stop.0 - start.0 + 1) as usize);
            for id in &state.current_path[start.0 as usize..=stop.0 as usize] {
                let index = state
                    .index_of(id)
                    .expect("current path id is missing from the block map");
                blocks.push(state.nodes[index].block.clone());
            }
            Ok(blocks)
        })
    }

    /// The height of the block with the given ID, on any fork.
    pub fn height_of_block(&self, id: BlockID) -> Option<Height> {
        self.read(|state| state.index_of(&id).map(|index| state.nodes[index].height))
    }

    /// The siacoin output diffs generated by a block. Fails for blocks that
    /// have never been applied on a best chain.
    pub fn block_output_diffs(&self, id: BlockID) -> Result<Vec<SiacoinOutputDiff>, QueryError> {
        self.read(|state| {
            let index = state.index_of(&id).ok_or(QueryError::UnknownBlock)?;
            let node = &state.nodes[index];
            if !node.diffs_generated {
                return Err(QueryError::DiffsNotGenerated);
            }
            Ok(node.diff.siacoin_output_diffs.clone())
        })
    }

    /// How the current path differs from the chain ending at `id`: the
    /// blocks that left the path since then (tip-first) and the blocks that
    /// joined it (ascending).
    pub fn blocks_since(
        &self,
        id: BlockID,
    ) -> Result<(Vec<BlockID>, Vec<BlockID>), QueryError> {
        self.read(|state| {
            let index = state.index_of(&id).ok_or(QueryError::UnknownBlock)?;
            let path = state.backtrack_to_current_path(index);

            let removed: Vec<BlockID> = path[1..]
                .iter()
                .rev()
                .map(|&i| state.nodes[i].id)
                .collect();
            let ancestor_height = state.nodes[path[0]].height;
            let added = state.current_path[(ancestor_height.0 + 1) as usize..].to_vec();
            Ok((removed, added))
        })
    }

    /// The unspent siacoin output with the given ID.
    pub fn siacoin_output(&self, id: SiacoinOutputID) -> Option<SiacoinOutput> {
        self.read(|state| state.siacoin_outputs.get(&id).cloned())
    }

    /// The unspent siafund output with the given ID.
    pub fn siafund_output(&self, id: SiafundOutputID) -> Option<SiafundOutput> {
        self.read(|state| state.siafund_outputs.get(&id).cloned())
    }

    /// The active file contract with the given ID.
    pub fn file_contract(&self, id: FileContractID) -> Option<FileContract> {
        self.read(|state| state.file_contracts.get(&id).cloned())
    }

    /// Every unspent siacoin output, in ascending numerical ID order.
    pub fn sorted_utxo_set(&self) -> Vec<(SiacoinOutputID, SiacoinOutput)> {
        self.read(|state| state.sorted_utxo_set())
    }

    /// Every unspent siafund output, in ascending numerical ID order.
    pub fn sorted_siafund_set(&self) -> Vec<(SiafundOutputID, SiafundOutput)> {
        self.read(|state| state.sorted_siafund_set())
    }

    /// The segment index a storage proof for `id` must reveal.
    pub fn storage_proof_segment(&self, id: FileContractID) -> Result<u64, TransactionError> {
        self.read(|state| state.storage_proof_segment(id))
    }

    /// The accumulated contract-fee pool backing siafund claims.
    pub fn siafund_pool(&self) -> Currency {
        self.read(|state| state.siafund_pool.clone())
    }

    /// A digest of the whole consensus-critical state; equal checksums mean
    /// byte-identical states.
    pub fn consensus_checksum(&self) -> Hash {
        self.read(|state| state.consensus_checksum())
    }

    /// Checks only the storage proofs of `t` against the consensus state.
    /// Exposed for the transaction pool, which needs unconfirmed proof
    /// validity without the rest of contextual validation.
    pub fn valid_storage_proofs(&self, t: &Transaction) -> Result<(), TransactionError> {
        self.read(|state| state.valid_storage_proofs(t))
    }
}
