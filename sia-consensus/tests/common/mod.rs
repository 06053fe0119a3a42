//! Shared harness for the integration tests: key management, transaction
//! building, and a nonce-grinding miner driven entirely through the public
//! engine API.

// Each integration test binary compiles its own copy and uses a subset.
#![allow(dead_code)]

use sia_chain::block::{Block, BlockID, Height, Timestamp};
use sia_chain::crypto::Hash;
use sia_chain::currency::Currency;
use sia_chain::parameters::{BLOCK_FREQUENCY, GENESIS_TIMESTAMP};
use sia_chain::siacoin::SiacoinOutput;
use sia_chain::transaction::{CoveredFields, Signature, Transaction, TransactionSignature};
use sia_chain::unlock::{PublicKey, UnlockConditions, UnlockHash};
use sia_consensus::{block_subsidy, AcceptResult, ConsensusSet};

/// An ed25519 keypair plus its single-key unlock conditions.
pub struct TestKey {
    pub signing_key: ed25519_zebra::SigningKey,
    pub public_key: PublicKey,
}

impl TestKey {
    pub fn generate() -> TestKey {
        let signing_key = ed25519_zebra::SigningKey::new(rand::thread_rng());
        let public_key = PublicKey(ed25519_zebra::VerificationKey::from(&signing_key).into());
        TestKey {
            signing_key,
            public_key,
        }
    }

    pub fn unlock_conditions(&self) -> UnlockConditions {
        UnlockConditions::single_key(self.public_key)
    }

    pub fn unlock_hash(&self) -> UnlockHash {
        self.unlock_conditions().unlock_hash()
    }
}

/// A throwaway address nobody can spend from.
pub fn burn_address(seed: &[u8]) -> UnlockHash {
    UnlockHash(sia_chain::crypto::hash_bytes(seed))
}

/// Appends a whole-transaction signature for `parent` signed by `key`.
/// Earlier signatures stay valid: whole coverage never includes the
/// signature list implicitly.
pub fn append_signature(t: &mut Transaction, key: &TestKey, parent: Hash) {
    t.signatures.push(TransactionSignature {
        parent_id: parent,
        public_key_index: 0,
        timelock: Height(0),
        covered_fields: CoveredFields::whole_transaction(),
        signature: Signature([0; 64]),
    });
    let index = t.signatures.len() - 1;
    let sig_hash = t.sig_hash(index).expect("whole coverage always hashes");
    t.signatures[index].signature = Signature(key.signing_key.sign(&sig_hash.0).into());
}

/// The deterministic timestamp the harness stamps on a block at `height`:
/// one block interval per height above genesis. Keeping timestamps a pure
/// function of height makes every mined chain reproducible across runs.
pub fn timestamp_at(height: Height) -> Timestamp {
    Timestamp(GENESIS_TIMESTAMP.0 + height.0 as i64 * BLOCK_FREQUENCY)
}

/// Assembles and mines a block on top of `parent_id`, claiming the full
/// subsidy plus fees to `payout_to`, and grinds the nonce until the block's
/// ID meets the parent's child target.
pub fn mine_block_on(
    engine: &ConsensusSet,
    parent_id: BlockID,
    transactions: Vec<Transaction>,
    payout_to: UnlockHash,
) -> Block {
    let height = engine
        .height_of_block(parent_id)
        .expect("mining on an unknown parent")
        .plus(1);
    let target = engine
        .child_target(parent_id)
        .expect("mining on an unknown parent");
    let earliest = engine
        .earliest_child_timestamp(parent_id)
        .expect("mining on an unknown parent");
    let timestamp = std::cmp::max(earliest, timestamp_at(height));

    let mut fees = Currency::zero();
    for transaction in &transactions {
        for fee in &transaction.miner_fees {
            fees += fee;
        }
    }
    let reward = block_subsidy(height) + fees;

    let mut block = Block {
        parent_id,
        nonce: 0,
        timestamp,
        miner_payouts: vec![SiacoinOutput {
            value: reward,
            unlock_hash: payout_to,
        }],
        transactions,
    };
    while !target.is_met_by(block.id().0) {
        block.nonce += 1;
    }
    block
}

/// Mines on the current tip.
pub fn mine_block(
    engine: &ConsensusSet,
    transactions: Vec<Transaction>,
    payout_to: UnlockHash,
) -> Block {
    let parent_id = engine.current_block().id();
    mine_block_on(engine, parent_id, transactions, payout_to)
}

/// Mines on the current tip and requires the engine to extend with it.
pub fn mine_and_accept(
    engine: &ConsensusSet,
    transactions: Vec<Transaction>,
    payout_to: UnlockHash,
) -> Block {
    let block = mine_block(engine, transactions, payout_to);
    assert_eq!(engine.accept_block(block.clone()), AcceptResult::Extended);
    block
}

/// Mines `count` empty blocks on the current tip, paying an unspendable
/// address.
pub fn mine_empty_blocks(engine: &ConsensusSet, count: u64) -> Vec<Block> {
    (0..count)
        .map(|i| mine_and_accept(engine, Vec::new(), burn_address(&i.to_le_bytes())))
        .collect()
}

/// Mines a coinbase to `key` and buries it past the maturity delay, leaving
/// the engine at a height where the coinbase output is spendable. Returns
/// the matured output's ID and value.
pub fn fund_key(
    engine: &ConsensusSet,
    key: &TestKey,
) -> (sia_chain::siacoin::SiacoinOutputID, Currency) {
    let coinbase = mine_and_accept(engine, Vec::new(), key.unlock_hash());
    let output_id = coinbase.miner_payout_id(0);
    let value = coinbase.miner_payouts[0].value.clone();
    mine_empty_blocks(engine, sia_chain::parameters::MATURITY_DELAY);
    assert!(
        engine.siacoin_output(output_id).is_some(),
        "coinbase output failed to mature"
    );
    (output_id, value)
}
