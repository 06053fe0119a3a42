//! Chain-level integration tests: genesis state, spends, forks, and the
//! accept-block state machine, driven through the public engine API.

mod common;

use std::time::{SystemTime, UNIX_EPOCH};

use common::*;
use sia_chain::block::{BlockID, Height, Timestamp};
use sia_chain::crypto::hash_bytes;
use sia_chain::currency::Currency;
use sia_chain::parameters::{
    EXTREME_FUTURE_THRESHOLD, FUTURE_THRESHOLD, GENESIS_BLOCK, GENESIS_BLOCK_ID,
    GENESIS_SIAFUND_ALLOCATION, GENESIS_SIAFUND_OUTPUT_ID, GENESIS_SIAFUND_UNLOCK_CONDITIONS,
    SIAFUND_COUNT,
};
use sia_chain::siacoin::{SiacoinInput, SiacoinOutput, SiacoinOutputID};
use sia_chain::siafund::{SiafundInput, SiafundOutput};
use sia_chain::transaction::Transaction;
use sia_consensus::{AcceptResult, BlockError, ConsensusSet, QueryError, TransactionError};

#[test]
fn genesis_only_state() {
    sia_test::init();
    let engine = ConsensusSet::new();

    assert_eq!(engine.height(), Height(0));
    assert_eq!(engine.current_block(), GENESIS_BLOCK.clone());
    assert!(engine.sorted_utxo_set().is_empty());
    assert_eq!(
        engine.siacoin_output(SiacoinOutputID(hash_bytes(b"nonexistent"))),
        None,
    );

    // The only value in existence is the genesis siafund allocation.
    assert_eq!(
        engine.sorted_siafund_set(),
        vec![(*GENESIS_SIAFUND_OUTPUT_ID, GENESIS_SIAFUND_ALLOCATION.clone())],
    );

    assert_eq!(engine.block_range(Height(0), Height(0)).unwrap().len(), 1);
    assert_eq!(
        engine.block_range(Height(1), Height(0)),
        Err(QueryError::InvalidRange),
    );
    assert_eq!(
        engine.block_range(Height(0), Height(1)),
        Err(QueryError::InvalidRange),
    );

    // Genesis carries its allocation diff.
    assert_eq!(engine.block_output_diffs(*GENESIS_BLOCK_ID), Ok(Vec::new()));
    assert_eq!(
        engine.block_output_diffs(BlockID(hash_bytes(b"unknown"))),
        Err(QueryError::UnknownBlock),
    );
}

#[test]
fn accept_is_idempotent() {
    sia_test::init();
    let engine = ConsensusSet::new();

    assert_eq!(
        engine.accept_block(GENESIS_BLOCK.clone()),
        AcceptResult::Known,
    );

    let block = mine_block(&engine, Vec::new(), burn_address(b"idempotent"));
    assert_eq!(engine.accept_block(block.clone()), AcceptResult::Extended);
    let checksum = engine.consensus_checksum();
    assert_eq!(engine.accept_block(block), AcceptResult::Known);
    assert_eq!(engine.consensus_checksum(), checksum);
}

#[test]
fn orphans_are_discarded() {
    sia_test::init();
    let engine = ConsensusSet::new();

    let mut orphan = mine_block(&engine, Vec::new(), burn_address(b"orphan"));
    orphan.parent_id = BlockID(hash_bytes(b"no such parent"));
    assert_eq!(engine.accept_block(orphan), AcceptResult::Orphan);
    assert_eq!(engine.height(), Height(0));
}

#[test]
fn header_policy_rejections() {
    sia_test::init();
    let engine = ConsensusSet::new();
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("the clock is past the epoch")
        .as_secs() as i64;

    // Earlier than the median of the parent chain.
    let mut early = mine_block(&engine, Vec::new(), burn_address(b"early"));
    early.timestamp = Timestamp(0);
    assert_eq!(
        engine.accept_block(early),
        AcceptResult::Invalid(BlockError::TimestampTooEarly),
    );

    // Near future: held back, not stored.
    let mut future = mine_block(&engine, Vec::new(), burn_address(b"future"));
    future.timestamp = Timestamp(now + FUTURE_THRESHOLD + 60);
    let future_id = future.id();
    assert_eq!(engine.accept_block(future.clone()), AcceptResult::Future);
    assert_eq!(engine.height_of_block(future_id), None);

    // Extreme future: rejected outright.
    let mut extreme = mine_block(&engine, Vec::new(), burn_address(b"extreme"));
    extreme.timestamp = Timestamp(now + EXTREME_FUTURE_THRESHOLD + 60);
    assert_eq!(
        engine.accept_block(extreme),
        AcceptResult::Invalid(BlockError::ExtremeFutureTimestamp),
    );

    // Insufficient work: find a nonce whose ID misses the target.
    let target = engine.current_target();
    let mut weak = mine_block(&engine, Vec::new(), burn_address(b"weak"));
    while target.is_met_by(weak.id().0) {
        weak.nonce += 1;
    }
    assert_eq!(
        engine.accept_block(weak),
        AcceptResult::Invalid(BlockError::InsufficientWork),
    );

    assert_eq!(engine.height(), Height(0));
}

#[test]
fn bad_miner_payout_is_rejected() {
    sia_test::init();
    let engine = ConsensusSet::new();

    let mut block = mine_block(&engine, Vec::new(), burn_address(b"greedy"));
    block.miner_payouts[0].value += &Currency::from(1);
    // Re-mine with the inflated payout.
    let target = engine.current_target();
    while !target.is_met_by(block.id().0) {
        block.nonce += 1;
    }
    assert_eq!(
        engine.accept_block(block),
        AcceptResult::Invalid(BlockError::BadMinerPayout),
    );
}

#[test]
fn simple_spend_after_maturity() {
    sia_test::init();
    let engine = ConsensusSet::new();
    let key = TestKey::generate();

    let coinbase = mine_and_accept(&engine, Vec::new(), key.unlock_hash());
    let coinbase_id = coinbase.miner_payout_id(0);
    let value = coinbase.miner_payouts[0].value.clone();

    // The payout is delayed: it is not spendable the moment it is mined.
    assert_eq!(engine.siacoin_output(coinbase_id), None);
    let mut premature = Transaction {
        siacoin_inputs: vec![SiacoinInput {
            parent_id: coinbase_id,
            unlock_conditions: key.unlock_conditions(),
        }],
        siacoin_outputs: vec![SiacoinOutput {
            value: value.clone(),
            unlock_hash: burn_address(b"too soon"),
        }],
        ..Transaction::default()
    };
    append_signature(&mut premature, &key, coinbase_id.0);
    let premature_block = mine_block(&engine, vec![premature], burn_address(b"pb"));
    assert_eq!(
        engine.accept_block(premature_block),
        AcceptResult::Invalid(BlockError::Transaction(
            TransactionError::MissingSiacoinOutput
        )),
    );

    mine_empty_blocks(&engine, sia_chain::parameters::MATURITY_DELAY);
    assert_eq!(
        engine.siacoin_output(coinbase_id).map(|o| o.value),
        Some(value.clone()),
    );

    // Spend the matured coinbase into a fresh output.
    let destination = burn_address(b"destination");
    let mut spend = Transaction {
        siacoin_inputs: vec![SiacoinInput {
            parent_id: coinbase_id,
            unlock_conditions: key.unlock_conditions(),
        }],
        siacoin_outputs: vec![SiacoinOutput {
            value: value.clone(),
            unlock_hash: destination,
        }],
        ..Transaction::default()
    };
    append_signature(&mut spend, &key, coinbase_id.0);
    let new_output_id = spend.siacoin_output_id(0);
    mine_and_accept(&engine, vec![spend], burn_address(b"sb"));

    assert_eq!(engine.siacoin_output(coinbase_id), None);
    let new_output = engine.siacoin_output(new_output_id).expect("spend output exists");
    assert_eq!(new_output.value, value);
    assert_eq!(new_output.unlock_hash, destination);
}

#[test]
fn wrong_key_cannot_spend() {
    sia_test::init();
    let engine = ConsensusSet::new();
    let key = TestKey::generate();
    let thief = TestKey::generate();

    let (output_id, value) = fund_key(&engine, &key);

    let mut theft = Transaction {
        siacoin_inputs: vec![SiacoinInput {
            parent_id: output_id,
            // The thief's own conditions hash to the wrong unlock hash.
            unlock_conditions: thief.unlock_conditions(),
        }],
        siacoin_outputs: vec![SiacoinOutput {
            value,
            unlock_hash: thief.unlock_hash(),
        }],
        ..Transaction::default()
    };
    append_signature(&mut theft, &thief, output_id.0);
    let block = mine_block(&engine, vec![theft], burn_address(b"tb"));
    assert_eq!(
        engine.accept_block(block),
        AcceptResult::Invalid(BlockError::Transaction(
            TransactionError::UnlockHashMismatch
        )),
    );
}

#[test]
fn unbalanced_spend_is_rejected() {
    sia_test::init();
    let engine = ConsensusSet::new();
    let key = TestKey::generate();

    let (output_id, value) = fund_key(&engine, &key);

    let mut overspend = Transaction {
        siacoin_inputs: vec![SiacoinInput {
            parent_id: output_id,
            unlock_conditions: key.unlock_conditions(),
        }],
        siacoin_outputs: vec![SiacoinOutput {
            value: value + &Currency::from(1),
            unlock_hash: burn_address(b"extra"),
        }],
        ..Transaction::default()
    };
    append_signature(&mut overspend, &key, output_id.0);
    let block = mine_block(&engine, vec![overspend], burn_address(b"ob"));
    assert_eq!(
        engine.accept_block(block),
        AcceptResult::Invalid(BlockError::Transaction(TransactionError::OutputSumMismatch)),
    );
}

#[tokio::test]
async fn reorg_switches_to_the_heavier_chain() {
    sia_test::init();
    let engine = ConsensusSet::new();

    // Chain A: three blocks on genesis.
    let a1 = mine_and_accept(&engine, Vec::new(), burn_address(b"a1"));
    let a2 = mine_and_accept(&engine, Vec::new(), burn_address(b"a2"));
    let a3 = mine_and_accept(&engine, Vec::new(), burn_address(b"a3"));

    let mut stream = engine.subscribe_to_consensus_changes();
    let initial = stream.recv().await.expect("initial replay batch");
    assert!(initial.reverted.is_empty());
    assert_eq!(initial.applied.len(), 4); // genesis + A1..A3

    // Chain B: four blocks on genesis. Equal-weight tips never win.
    let b1 = mine_block_on(&engine, *GENESIS_BLOCK_ID, Vec::new(), burn_address(b"b1"));
    assert_eq!(engine.accept_block(b1.clone()), AcceptResult::NonExtending);
    let b2 = mine_block_on(&engine, b1.id(), Vec::new(), burn_address(b"b2"));
    assert_eq!(engine.accept_block(b2.clone()), AcceptResult::NonExtending);
    let b3 = mine_block_on(&engine, b2.id(), Vec::new(), burn_address(b"b3"));
    assert_eq!(engine.accept_block(b3.clone()), AcceptResult::NonExtending);
    assert_eq!(engine.current_block().id(), a3.id());

    let b4 = mine_block_on(&engine, b3.id(), Vec::new(), burn_address(b"b4"));
    assert_eq!(engine.accept_block(b4.clone()), AcceptResult::Extended);
    assert_eq!(engine.height(), Height(4));
    assert_eq!(engine.current_block().id(), b4.id());

    // One batch: A reverted tip-first, B applied in height order.
    let change = stream.recv().await.expect("reorg batch");
    let reverted_ids: Vec<BlockID> = change.reverted.iter().map(|d| d.block_id).collect();
    let applied_ids: Vec<BlockID> = change.applied.iter().map(|d| d.block_id).collect();
    assert_eq!(reverted_ids, vec![a3.id(), a2.id(), a1.id()]);
    assert_eq!(applied_ids, vec![b1.id(), b2.id(), b3.id(), b4.id()]);

    // The engine's state equals a fresh engine that only ever saw B.
    let replay = ConsensusSet::new();
    for block in [&b1, &b2, &b3, &b4] {
        assert_eq!(replay.accept_block(block.clone()), AcceptResult::Extended);
    }
    assert_eq!(engine.consensus_checksum(), replay.consensus_checksum());
    assert_eq!(engine.sorted_utxo_set(), replay.sorted_utxo_set());

    // blocks_since sees the fork from A3's perspective.
    let (removed, added) = engine.blocks_since(a3.id()).unwrap();
    assert_eq!(removed, vec![a3.id(), a2.id(), a1.id()]);
    assert_eq!(added, vec![b1.id(), b2.id(), b3.id(), b4.id()]);
}

#[test]
fn double_spend_across_forks() {
    sia_test::init();
    let engine = ConsensusSet::new();
    let key = TestKey::generate();

    let (output_id, value) = fund_key(&engine, &key);
    let fork_point = engine.current_block().id();

    let spend_to = |destination: &[u8]| {
        let mut t = Transaction {
            siacoin_inputs: vec![SiacoinInput {
                parent_id: output_id,
                unlock_conditions: key.unlock_conditions(),
            }],
            siacoin_outputs: vec![SiacoinOutput {
                value: value.clone(),
                unlock_hash: burn_address(destination),
            }],
            ..Transaction::default()
        };
        append_signature(&mut t, &key, output_id.0);
        t
    };

    // Chain A spends the output one way.
    let spend_a = spend_to(b"chain a destination");
    let a_output = spend_a.siacoin_output_id(0);
    let a1 = mine_block_on(&engine, fork_point, vec![spend_a], burn_address(b"fa"));
    assert_eq!(engine.accept_block(a1.clone()), AcceptResult::Extended);
    assert!(engine.siacoin_output(a_output).is_some());

    // Chain B spends it differently and grows heavier.
    let spend_b = spend_to(b"chain b destination");
    let b_output = spend_b.siacoin_output_id(0);
    let b1 = mine_block_on(&engine, fork_point, vec![spend_b], burn_address(b"fb"));
    assert_eq!(engine.accept_block(b1.clone()), AcceptResult::NonExtending);
    let b2 = mine_block_on(&engine, b1.id(), Vec::new(), burn_address(b"fb2"));
    assert_eq!(engine.accept_block(b2), AcceptResult::Extended);

    // The reorg restored the parent output and replayed the B-side spend.
    assert_eq!(engine.siacoin_output(a_output), None);
    assert!(engine.siacoin_output(b_output).is_some());
    assert_eq!(engine.siacoin_output(output_id), None);
}

#[test]
fn sequential_double_spend_is_rejected() {
    sia_test::init();
    let engine = ConsensusSet::new();
    let key = TestKey::generate();

    let (output_id, value) = fund_key(&engine, &key);

    let mut first = Transaction {
        siacoin_inputs: vec![SiacoinInput {
            parent_id: output_id,
            unlock_conditions: key.unlock_conditions(),
        }],
        siacoin_outputs: vec![SiacoinOutput {
            value: value.clone(),
            unlock_hash: burn_address(b"first spend"),
        }],
        ..Transaction::default()
    };
    append_signature(&mut first, &key, output_id.0);
    let mut second = first.clone();
    second.siacoin_outputs[0].unlock_hash = burn_address(b"second spend");
    second.signatures.clear();
    append_signature(&mut second, &key, output_id.0);

    mine_and_accept(&engine, vec![first], burn_address(b"ds1"));
    let block = mine_block(&engine, vec![second], burn_address(b"ds2"));
    assert_eq!(
        engine.accept_block(block),
        AcceptResult::Invalid(BlockError::Transaction(
            TransactionError::MissingSiacoinOutput
        )),
    );
}

#[test]
fn genesis_siafunds_can_move() {
    sia_test::init();
    let engine = ConsensusSet::new();
    let key = TestKey::generate();

    // The genesis allocation requires zero signatures to spend.
    let spend = Transaction {
        siafund_inputs: vec![SiafundInput {
            parent_id: *GENESIS_SIAFUND_OUTPUT_ID,
            unlock_conditions: GENESIS_SIAFUND_UNLOCK_CONDITIONS.clone(),
            claim_unlock_hash: burn_address(b"claims"),
        }],
        siafund_outputs: vec![SiafundOutput {
            value: Currency::from(SIAFUND_COUNT),
            unlock_hash: key.unlock_hash(),
            claim_start: Currency::zero(),
        }],
        ..Transaction::default()
    };
    let new_fund_id = spend.siafund_output_id(0);
    mine_and_accept(&engine, vec![spend], burn_address(b"sf"));

    assert_eq!(engine.siafund_output(*GENESIS_SIAFUND_OUTPUT_ID), None);
    let moved = engine.siafund_output(new_fund_id).expect("moved allocation");
    assert_eq!(moved.value, Currency::from(SIAFUND_COUNT));
    assert_eq!(moved.unlock_hash, key.unlock_hash());

    // Supply is conserved exactly.
    let total: Currency = engine
        .sorted_siafund_set()
        .iter()
        .map(|(_, output)| &output.value)
        .sum();
    assert_eq!(total, Currency::from(SIAFUND_COUNT));
}

#[test]
fn unbalanced_siafund_spend_is_rejected() {
    sia_test::init();
    let engine = ConsensusSet::new();

    let spend = Transaction {
        siafund_inputs: vec![SiafundInput {
            parent_id: *GENESIS_SIAFUND_OUTPUT_ID,
            unlock_conditions: GENESIS_SIAFUND_UNLOCK_CONDITIONS.clone(),
            claim_unlock_hash: burn_address(b"claims"),
        }],
        siafund_outputs: vec![SiafundOutput {
            value: Currency::from(SIAFUND_COUNT - 1),
            unlock_hash: burn_address(b"short"),
            claim_start: Currency::zero(),
        }],
        ..Transaction::default()
    };
    let block = mine_block(&engine, vec![spend], burn_address(b"usf"));
    assert_eq!(
        engine.accept_block(block),
        AcceptResult::Invalid(BlockError::Transaction(
            TransactionError::FundSupplyImbalance
        )),
    );
}
