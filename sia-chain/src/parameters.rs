//! Protocol constants and the genesis block.
//!
//! Every value here is part of the protocol definition, not a tuning knob:
//! two nodes disagreeing on any of them are on different networks. The
//! numbers are documented where they are used by the consensus rules.

use lazy_static::lazy_static;
use num_traits::pow;

use crate::block::{Block, BlockID, Height, Timestamp};
use crate::crypto::{self, tag};
use crate::currency::Currency;
use crate::siafund::{SiafundOutput, SiafundOutputID};
use crate::unlock::UnlockConditions;
use crate::work::Target;

/// The maximum size of a canonically-encoded block, in bytes.
pub const BLOCK_SIZE_LIMIT: u64 = 2 * 1024 * 1024;

/// The encoded-size budget reserved for the non-transaction parts of a
/// block; a single transaction may use everything else.
pub const TRANSACTION_SIZE_LIMIT: u64 = BLOCK_SIZE_LIMIT - 5_000;

/// The target number of seconds between consecutive blocks.
pub const BLOCK_FREQUENCY: i64 = 600;

/// How many blocks a miner payout, storage-proof payout, or siafund claim
/// stays in the delayed set before it can be spent.
pub const MATURITY_DELAY: u64 = 50;

/// How many trailing timestamps feed the minimum-timestamp median rule.
pub const MEDIAN_TIMESTAMP_WINDOW: usize = 11;

/// Blocks stamped further than this into the future are held back for
/// resubmission rather than accepted.
pub const FUTURE_THRESHOLD: i64 = 3 * BLOCK_FREQUENCY;

/// Blocks stamped further than this into the future are rejected outright.
pub const EXTREME_FUTURE_THRESHOLD: i64 = 5 * BLOCK_FREQUENCY;

/// Per-block clamp on how much easier the target may get, as a ratio.
pub const MAX_ADJUSTMENT_UP: (u64, u64) = (251, 250);

/// Per-block clamp on how much harder the target may get, as a ratio.
pub const MAX_ADJUSTMENT_DOWN: (u64, u64) = (250, 251);

/// How many trailing blocks the retarget rule measures.
pub const TARGET_WINDOW: u64 = 1_000;

/// The unit of storage-proof challenges: files are committed to and proven
/// in segments of this many bytes.
pub const SEGMENT_SIZE: u64 = 64;

/// The fixed number of siafund shares. Consensus conserves this total
/// exactly; it never inflates or burns.
pub const SIAFUND_COUNT: u64 = 10_000;

/// The share of every file contract payout skimmed into the siafund pool
/// when the contract is created, as a ratio. The skim comes out of the
/// payout before the proof-output escrow is formed, so siafund claims are
/// always backed by coins the contract creator actually paid.
pub const SIAFUND_PORTION: (u64, u64) = (39, 1_000);

/// The subsidy of the genesis-adjacent blocks, in whole coins. Decreases by
/// one coin per block until reaching [`MINIMUM_COINBASE`].
pub const INITIAL_COINBASE: u64 = 300_000;

/// The perpetual floor of the block subsidy, in whole coins.
pub const MINIMUM_COINBASE: u64 = 30_000;

/// The timestamp of the genesis block.
pub const GENESIS_TIMESTAMP: Timestamp = Timestamp(1_433_600_000);

/// The target the first mined block must meet. Deployment-specific: an easy
/// root keeps simulated networks and tests cheap to mine, and the retarget
/// rule walks difficulty to wherever the real hash rate sits.
pub const ROOT_TARGET: Target = Target([
    0x20, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0,
]);

lazy_static! {
    /// Base units per whole coin. Currency values in consensus rules are
    /// denominated in base units.
    pub static ref COIN: Currency = Currency::from(pow(num_bigint::BigUint::from(10u32), 24));

    /// The genesis block. It has no parent, no payouts, and no
    /// transactions; the siafund allocation is seeded directly into the
    /// consensus state as the genesis block's diff.
    pub static ref GENESIS_BLOCK: Block = Block {
        parent_id: BlockID(crypto::Hash([0; 32])),
        nonce: 0,
        timestamp: GENESIS_TIMESTAMP,
        miner_payouts: Vec::new(),
        transactions: Vec::new(),
    };

    /// The ID of the genesis block.
    pub static ref GENESIS_BLOCK_ID: BlockID = GENESIS_BLOCK.id();

    /// The conditions holding the genesis siafund allocation. A placeholder
    /// anyone-can-spend predicate (zero required signatures) standing in
    /// for a launch allocation.
    pub static ref GENESIS_SIAFUND_UNLOCK_CONDITIONS: UnlockConditions = UnlockConditions {
        timelock: Height(0),
        public_keys: Vec::new(),
        signatures_required: 0,
    };

    /// The single output carrying the entire siafund supply at genesis.
    pub static ref GENESIS_SIAFUND_ALLOCATION: SiafundOutput = SiafundOutput {
        value: Currency::from(SIAFUND_COUNT),
        unlock_hash: GENESIS_SIAFUND_UNLOCK_CONDITIONS.unlock_hash(),
        claim_start: Currency::zero(),
    };

    /// The ID of the genesis siafund output, derived from the genesis block
    /// the way transaction-created outputs derive from their transaction.
    pub static ref GENESIS_SIAFUND_OUTPUT_ID: SiafundOutputID = SiafundOutputID(
        crypto::hash_all(&[
            tag::SIAFUND_OUTPUT,
            &(GENESIS_BLOCK_ID.0).0,
            &0u64.to_le_bytes(),
        ])
    );
}
