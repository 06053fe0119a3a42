//! The consensus engine: a deterministic state machine that validates
//! blocks and transactions, maintains the unspent-output sets and active
//! file contracts, and resolves competing forks by accumulated work.
//!
//! The engine is driven and observed by external collaborators — the
//! gateway feeds it candidate blocks, the transaction pool asks it about
//! unconfirmed validity, the miner reads the current target, and
//! subscribers mirror its state from the diff stream. None of those
//! concerns live here: this crate is only the rules and the indexes.
//!
//! # Locking
//!
//! One `RwLock` guards the whole state. Public API methods acquire it
//! exactly once at entry (exclusive for [`ConsensusSet::accept_block`] and
//! subscription, shared for every read query); everything below the public
//! surface assumes the lock is held and never re-acquires it. No network or
//! disk I/O happens inside the critical section — persistence belongs to
//! subscribers, fed by the diff stream.
//!
//! # Panics
//!
//! Domain errors (a bad block from a peer) are returned as values. A broken
//! engine invariant — an output missing mid-apply, a path entry without
//! diffs — panics instead: continuing from a corrupt consensus state would
//! silently fork the node off the network.

#![allow(clippy::unit_arg)]

mod accept;
mod block;
mod diffs;
mod error;
mod info;
mod parameters;
mod state;
mod subscribe;
mod transaction;
mod update;
mod valid;

use std::sync::RwLock;

use state::State;

pub use accept::AcceptResult;
pub use diffs::{
    BlockDiff, ConsensusChange, DelayedSiacoinOutputDiff, DiffDirection, FileContractDiff,
    SiacoinOutputDiff, SiafundOutputDiff, SiafundPoolDiff,
};
pub use error::{BlockError, QueryError, TransactionError};
pub use parameters::block_subsidy;
pub use subscribe::ChangeStream;
pub use transaction::check::standalone_valid;

/// The consensus engine. Cheap to share behind an `Arc`; all methods take
/// `&self`.
pub struct ConsensusSet {
    state: RwLock<State>,
}

impl ConsensusSet {
    /// An engine containing only the genesis block and the genesis siafund
    /// allocation.
    pub fn new() -> ConsensusSet {
        ConsensusSet {
            state: RwLock::new(State::new()),
        }
    }
}

impl Default for ConsensusSet {
    fn default() -> Self {
        ConsensusSet::new()
    }
}
