//! Accepting blocks: the fork-choice state machine.
//!
//! `accept_block` classifies a candidate block (known, orphan, future,
//! policy-rejected), attaches it to the block tree, and — when the new tip
//! is strictly heavier than the current one — rewinds to the common
//! ancestor and fast-forwards along the new branch, validating blocks that
//! have never been on a best chain and replaying cached diffs for blocks
//! that have. Equal-weight tips never trigger a switch: first seen wins,
//! keeping every node's choice deterministic.

use chrono::Utc;
use tracing::{debug, info, trace};

use sia_chain::block::{Block, BlockID};
use sia_chain::crypto::{self, tag};
use sia_chain::parameters::{
    BLOCK_FREQUENCY, BLOCK_SIZE_LIMIT, EXTREME_FUTURE_THRESHOLD, FUTURE_THRESHOLD, TARGET_WINDOW,
};
use sia_chain::work::Target;
use sia_chain::SiaSerialize;

use crate::diffs::ConsensusChange;
use crate::error::BlockError;
use crate::state::{BlockNode, State};
use crate::ConsensusSet;

/// The outcome of submitting a block to the engine.
///
/// Rejections ride in `Invalid` with the specific rule that failed, so
/// callers can hold the submitting peer accountable. `Known`, `Orphan`, and
/// `Future` are not judgments about validity: known blocks make repeated
/// submission idempotent, orphans must be resubmitted behind their parents,
/// and future blocks should be resubmitted once the clock catches up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AcceptResult {
    /// The block joined the heaviest chain; subscribers were notified.
    Extended,
    /// The block attached to the tree but its chain is not the heaviest.
    NonExtending,
    /// The block is already in the block map.
    Known,
    /// The block's parent is unknown; the block was discarded.
    Orphan,
    /// The block's timestamp is in the near future; resubmit later.
    Future,
    /// The block broke a consensus rule and was rejected.
    Invalid(BlockError),
}

impl ConsensusSet {
    /// Submit a candidate block to the engine.
    pub fn accept_block(&self, block: Block) -> AcceptResult {
        let now = Utc::now().timestamp();
        let mut state = self.state.write().expect("consensus set lock poisoned");
        let result = state.accept_block(block, now);
        if result == AcceptResult::Extended {
            metrics::counter!("consensus.accepted_blocks", 1);
            metrics::gauge!("consensus.height", state.height().0 as _);
        }
        result
    }
}

impl State {
    pub(crate) fn accept_block(&mut self, block: Block, now: i64) -> AcceptResult {
        let encoded = block
            .sia_serialize_to_vec()
            .expect("serializing to a Vec is infallible");
        let id = BlockID(crypto::hash_all(&[tag::BLOCK, &encoded]));

        if self.node_index.contains_key(&id) {
            return AcceptResult::Known;
        }
        if encoded.len() as u64 > BLOCK_SIZE_LIMIT {
            return AcceptResult::Invalid(BlockError::TooLarge);
        }
        let parent_index = match self.index_of(&block.parent_id) {
            Some(index) => index,
            None => {
                debug!(%id, parent = %block.parent_id, "discarding orphan block");
                return AcceptResult::Orphan;
            }
        };
        if self.nodes[parent_index].invalid {
            return AcceptResult::Invalid(BlockError::InvalidAncestor);
        }

        // Header policy checks, all against the parent's chain.
        if block.timestamp < self.earliest_child_timestamp(parent_index) {
            return AcceptResult::Invalid(BlockError::TimestampTooEarly);
        }
        if block.timestamp.0 > now + EXTREME_FUTURE_THRESHOLD {
            return AcceptResult::Invalid(BlockError::ExtremeFutureTimestamp);
        }
        if block.timestamp.0 > now + FUTURE_THRESHOLD {
            // Not stored: the caller is expected to resubmit after sleeping,
            // at which point the block is judged fresh.
            return AcceptResult::Future;
        }
        if !self.nodes[parent_index].target.is_met_by(id.0) {
            return AcceptResult::Invalid(BlockError::InsufficientWork);
        }

        let index = self.add_block_node(parent_index, block, id);
        trace!(%id, height = self.nodes[index].height.0, "attached block to the tree");

        let current_index = self.current_block_index();
        if !self.nodes[index]
            .depth
            .is_heavier_than(&self.nodes[current_index].depth)
        {
            debug!(%id, "block does not extend the heaviest chain");
            return AcceptResult::NonExtending;
        }

        match self.fork_to(index) {
            Ok(change) => {
                self.notify(change);
                AcceptResult::Extended
            }
            Err(error) => AcceptResult::Invalid(error),
        }
    }

    /// Links a new block into the tree, computing its height, cumulative
    /// depth, and the target its own children must meet.
    fn add_block_node(&mut self, parent_index: usize, block: Block, id: BlockID) -> usize {
        let child_target = self.child_target_for(parent_index);
        let parent = &self.nodes[parent_index];
        let node = BlockNode {
            height: parent.height.plus(1),
            depth: parent.depth.add_weight(&parent.target),
            target: child_target,
            block,
            id,
            parent: Some(parent_index),
            children: Vec::new(),
            diffs_generated: false,
            diff: crate::diffs::BlockDiff::new(id),
            invalid: false,
        };
        let index = self.nodes.len();
        self.nodes.push(node);
        self.nodes[parent_index].children.push(index);
        self.node_index.insert(id, index);
        index
    }

    /// The retarget rule: scale the parent's target by how long the trailing
    /// window actually took versus how long it should have taken, clamped
    /// per block.
    fn child_target_for(&self, parent_index: usize) -> Target {
        let parent = &self.nodes[parent_index];

        let mut window_index = parent_index;
        let mut window_blocks: u64 = 0;
        while window_blocks < TARGET_WINDOW {
            match self.nodes[window_index].parent {
                Some(grandparent) => {
                    window_index = grandparent;
                    window_blocks += 1;
                }
                None => break,
            }
        }
        if window_blocks == 0 {
            // The parent is the genesis block; nothing to measure yet.
            return parent.target;
        }

        let actual_time =
            parent.block.timestamp.0 - self.nodes[window_index].block.timestamp.0;
        let expected_time = BLOCK_FREQUENCY * window_blocks as i64;
        parent.target.child_target(actual_time, expected_time)
    }

    /// Switches the current path to the strictly-heavier tip at `index`:
    /// rewind to the common ancestor, then validate-or-replay forward. On a
    /// mid-extension validation failure the offending block and all its
    /// descendants are marked invalid and the previous path is restored
    /// exactly.
    fn fork_to(&mut self, index: usize) -> Result<ConsensusChange, BlockError> {
        let path = self.backtrack_to_current_path(index);
        let ancestor_height = self.nodes[path[0]].height;

        // Rewind the current chain down to the common ancestor, newest
        // first.
        let mut reverted = Vec::new();
        while self.height() > ancestor_height {
            let tip = self.current_block_index();
            self.revert_block(tip);
            reverted.push(self.nodes[tip].diff.clone());
        }

        // Fast-forward along the new branch.
        let mut applied = Vec::new();
        let mut applied_indexes = Vec::new();
        let mut failure = None;
        for &branch_index in &path[1..] {
            let outcome = if self.nodes[branch_index].diffs_generated {
                self.reapply_block(branch_index);
                Ok(())
            } else {
                self.apply_block(branch_index)
            };
            match outcome {
                Ok(()) => {
                    applied.push(self.nodes[branch_index].diff.clone());
                    applied_indexes.push(branch_index);
                }
                Err(error) => {
                    failure = Some((branch_index, error));
                    break;
                }
            }
        }

        if let Some((bad_index, error)) = failure {
            info!(
                id = %self.nodes[bad_index].id,
                %error,
                "invalid block on what would be the best chain; restoring previous path"
            );
            self.mark_invalid(bad_index);
            for &branch_index in applied_indexes.iter().rev() {
                self.revert_block(branch_index);
            }
            for diff in reverted.iter().rev() {
                let restore_index = self
                    .index_of(&diff.block_id)
                    .expect("reverted block vanished from the block map");
                self.reapply_block(restore_index);
            }
            return Err(error);
        }

        if !reverted.is_empty() {
            info!(
                reverted = reverted.len(),
                applied = applied.len(),
                height = self.height().0,
                "reorganized to a heavier chain"
            );
        }
        Ok(ConsensusChange { reverted, applied })
    }

    /// Marks a block and every descendant invalid. None of them can ever be
    /// applied, and children arriving later are rejected against the flag.
    fn mark_invalid(&mut self, index: usize) {
        let mut pending = vec![index];
        while let Some(current) = pending.pop() {
            self.nodes[current].invalid = true;
            pending.extend(&self.nodes[current].children);
        }
    }
}
