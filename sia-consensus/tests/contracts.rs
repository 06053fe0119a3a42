//! File contract lifecycle tests: creation, storage proofs, missed proofs,
//! terminations, and siafund claims on the accrued pool.

mod common;

use common::*;
use sia_chain::block::Height;
use sia_chain::contract::{FileContract, FileContractID, FileContractTermination, StorageProof};
use sia_chain::crypto::merkle;
use sia_chain::currency::Currency;
use sia_chain::parameters::{
    GENESIS_SIAFUND_OUTPUT_ID, GENESIS_SIAFUND_UNLOCK_CONDITIONS, MATURITY_DELAY, SIAFUND_COUNT,
};
use sia_chain::siacoin::{SiacoinInput, SiacoinOutput};
use sia_chain::siafund::{SiafundInput, SiafundOutput};
use sia_chain::transaction::Transaction;
use sia_chain::unlock::UnlockHash;
use sia_consensus::{AcceptResult, BlockError, ConsensusSet, TransactionError};

/// A deterministic "file" of four segments with a ragged tail.
fn file_data() -> Vec<u8> {
    (0..200u32).map(|i| (i * 7) as u8).collect()
}

struct ContractSetup {
    engine: ConsensusSet,
    key: TestKey,
    termination_key: TestKey,
    contract_id: FileContractID,
    tax: Currency,
    escrow: Currency,
    valid_to: UnlockHash,
    missed_to: UnlockHash,
}

/// Funds a key, then pays the whole coinbase into a contract over
/// [`file_data`]: the tax goes to the siafund pool and the rest is escrowed
/// for the proof outputs. The proof window opens `start_offset` blocks after
/// the creation block and stays open for `window` blocks.
fn create_contract(start_offset: u64, window: u64) -> ContractSetup {
    let engine = ConsensusSet::new();
    let key = TestKey::generate();
    let termination_key = TestKey::generate();
    let (funding_id, payout) = fund_key(&engine, &key);

    let data = file_data();
    let creation_height = engine.height().plus(1);
    let valid_to = burn_address(b"host payout");
    let missed_to = burn_address(b"renter refund");
    let mut contract = FileContract {
        file_size: data.len() as u64,
        file_merkle_root: merkle::file_merkle_root(&data),
        start: Height(creation_height.0 + start_offset),
        expiration: Height(creation_height.0 + start_offset + window),
        payout,
        valid_proof_outputs: Vec::new(),
        missed_proof_outputs: Vec::new(),
        termination_hash: termination_key.unlock_hash(),
    };
    let tax = contract.tax();
    let escrow = contract.escrow();
    contract.valid_proof_outputs = vec![SiacoinOutput {
        value: escrow.clone(),
        unlock_hash: valid_to,
    }];
    contract.missed_proof_outputs = vec![SiacoinOutput {
        value: escrow.clone(),
        unlock_hash: missed_to,
    }];

    let mut transaction = Transaction {
        siacoin_inputs: vec![SiacoinInput {
            parent_id: funding_id,
            unlock_conditions: key.unlock_conditions(),
        }],
        file_contracts: vec![contract],
        ..Transaction::default()
    };
    append_signature(&mut transaction, &key, funding_id.0);
    let contract_id = transaction.file_contract_id(0);
    mine_and_accept(&engine, vec![transaction], burn_address(b"cc"));
    assert!(engine.file_contract(contract_id).is_some());

    ContractSetup {
        engine,
        key,
        termination_key,
        contract_id,
        tax,
        escrow,
        valid_to,
        missed_to,
    }
}

fn mine_to_height(engine: &ConsensusSet, height: Height) {
    assert!(engine.height() <= height);
    mine_empty_blocks(engine, height.0 - engine.height().0);
}

#[test]
fn storage_proof_happy_path() {
    sia_test::init();
    let setup = create_contract(3, 6);
    let engine = &setup.engine;
    let contract = engine.file_contract(setup.contract_id).unwrap();

    // Move into the proof window, then answer the challenge.
    mine_to_height(engine, contract.start);
    let segment_index = engine
        .storage_proof_segment(setup.contract_id)
        .expect("challenge index is derivable inside the window");
    // The challenge is pinned by the chain; asking twice cannot change it.
    assert_eq!(
        engine.storage_proof_segment(setup.contract_id),
        Ok(segment_index),
    );

    let (segment, hash_set) = merkle::build_segment_proof(&file_data(), segment_index);
    let proof = Transaction {
        storage_proofs: vec![StorageProof {
            parent_id: setup.contract_id,
            segment,
            hash_set,
        }],
        ..Transaction::default()
    };
    let proof_height = engine.height().plus(1);
    mine_and_accept(engine, vec![proof], burn_address(b"pr"));

    // The contract resolved; its payout is scheduled, not yet spendable.
    assert_eq!(engine.file_contract(setup.contract_id), None);
    let valid_output_id = setup.contract_id.storage_proof_output_id(true, 0);
    assert_eq!(engine.siacoin_output(valid_output_id), None);

    mine_to_height(engine, Height(proof_height.0 + MATURITY_DELAY));
    let payout = engine
        .siacoin_output(valid_output_id)
        .expect("valid proof output matured");
    assert_eq!(payout.value, setup.escrow);
    assert_eq!(payout.unlock_hash, setup.valid_to);

    // The missed output never exists on this branch of the lifecycle.
    let missed_output_id = setup.contract_id.storage_proof_output_id(false, 0);
    assert_eq!(engine.siacoin_output(missed_output_id), None);
}

#[test]
fn bad_storage_proof_is_rejected() {
    sia_test::init();
    let setup = create_contract(3, 6);
    let engine = &setup.engine;
    let contract = engine.file_contract(setup.contract_id).unwrap();

    mine_to_height(engine, contract.start);
    let segment_index = engine.storage_proof_segment(setup.contract_id).unwrap();

    // Proof over corrupted data: the Merkle path cannot reach the root.
    let mut corrupted = file_data();
    corrupted[3] ^= 0x40;
    let (segment, hash_set) = merkle::build_segment_proof(&corrupted, segment_index);
    let proof = Transaction {
        storage_proofs: vec![StorageProof {
            parent_id: setup.contract_id,
            segment,
            hash_set,
        }],
        ..Transaction::default()
    };
    let block = mine_block(engine, vec![proof], burn_address(b"bp"));
    assert_eq!(
        engine.accept_block(block),
        AcceptResult::Invalid(BlockError::Transaction(
            TransactionError::InvalidStorageProof
        )),
    );
    assert!(engine.file_contract(setup.contract_id).is_some());
}

#[test]
fn missed_proof_schedules_refund_at_expiration() {
    sia_test::init();
    let setup = create_contract(3, 6);
    let engine = &setup.engine;
    let contract = engine.file_contract(setup.contract_id).unwrap();

    // Let the window close with no proof.
    mine_to_height(engine, contract.expiration);
    assert_eq!(engine.file_contract(setup.contract_id), None);

    // A proof after expiration has nothing to prove against.
    let late_proof = Transaction {
        storage_proofs: vec![StorageProof {
            parent_id: setup.contract_id,
            segment: vec![0; 64],
            hash_set: Vec::new(),
        }],
        ..Transaction::default()
    };
    let block = mine_block(engine, vec![late_proof], burn_address(b"lp"));
    assert_eq!(
        engine.accept_block(block),
        AcceptResult::Invalid(BlockError::Transaction(
            TransactionError::MissingFileContract
        )),
    );

    let missed_output_id = setup.contract_id.storage_proof_output_id(false, 0);
    assert_eq!(engine.siacoin_output(missed_output_id), None);
    mine_to_height(engine, Height(contract.expiration.0 + MATURITY_DELAY));
    let refund = engine
        .siacoin_output(missed_output_id)
        .expect("missed proof output matured");
    assert_eq!(refund.value, setup.escrow);
    assert_eq!(refund.unlock_hash, setup.missed_to);
}

#[test]
fn termination_before_window_opens() {
    sia_test::init();
    let setup = create_contract(4, 6);
    let engine = &setup.engine;

    let payout_to = burn_address(b"termination payout");
    let mut termination = Transaction {
        file_contract_terminations: vec![FileContractTermination {
            parent_id: setup.contract_id,
            termination_conditions: setup.termination_key.unlock_conditions(),
            payouts: vec![SiacoinOutput {
                value: setup.escrow.clone(),
                unlock_hash: payout_to,
            }],
        }],
        ..Transaction::default()
    };
    append_signature(&mut termination, &setup.termination_key, setup.contract_id.0);
    let termination_height = engine.height().plus(1);
    mine_and_accept(engine, vec![termination], burn_address(b"tm"));

    // The escrow comes back; the tax stays in the pool.
    assert_eq!(engine.file_contract(setup.contract_id), None);
    assert_eq!(engine.siafund_pool(), setup.tax);
    let payout_id = setup.contract_id.termination_payout_id(0);
    mine_to_height(engine, Height(termination_height.0 + MATURITY_DELAY));
    let payout = engine.siacoin_output(payout_id).expect("termination payout matured");
    assert_eq!(payout.value, setup.escrow);
    assert_eq!(payout.unlock_hash, payout_to);
}

#[test]
fn termination_after_window_opens_is_rejected() {
    sia_test::init();
    let setup = create_contract(2, 6);
    let engine = &setup.engine;
    let contract = engine.file_contract(setup.contract_id).unwrap();

    // At `start` the window is open and termination is no longer possible.
    mine_to_height(engine, Height(contract.start.0 - 1));

    let mut termination = Transaction {
        file_contract_terminations: vec![FileContractTermination {
            parent_id: setup.contract_id,
            termination_conditions: setup.termination_key.unlock_conditions(),
            payouts: vec![SiacoinOutput {
                value: setup.escrow.clone(),
                unlock_hash: burn_address(b"late termination"),
            }],
        }],
        ..Transaction::default()
    };
    append_signature(&mut termination, &setup.termination_key, setup.contract_id.0);
    let block = mine_block(engine, vec![termination], burn_address(b"lt"));
    assert_eq!(
        engine.accept_block(block),
        AcceptResult::Invalid(BlockError::Transaction(TransactionError::TerminationTooLate)),
    );
    assert!(engine.file_contract(setup.contract_id).is_some());
}

#[test]
fn siafund_claims_accrue_from_contract_tax() {
    sia_test::init();
    let setup = create_contract(5, 10);
    let engine = &setup.engine;

    // The pool grew by the tax skimmed off the payout, nothing more; the
    // escrow stays earmarked for the proof outputs.
    assert_eq!(engine.siafund_pool(), setup.tax);

    // Spending the entire genesis allocation claims the entire pool growth.
    let claim_to = burn_address(b"claim destination");
    let spend = Transaction {
        siafund_inputs: vec![SiafundInput {
            parent_id: *GENESIS_SIAFUND_OUTPUT_ID,
            unlock_conditions: GENESIS_SIAFUND_UNLOCK_CONDITIONS.clone(),
            claim_unlock_hash: claim_to,
        }],
        siafund_outputs: vec![SiafundOutput {
            value: Currency::from(SIAFUND_COUNT),
            unlock_hash: setup.key.unlock_hash(),
            claim_start: Currency::zero(),
        }],
        ..Transaction::default()
    };
    let claim_id = spend.siafund_claim_id(0);
    let new_fund_id = spend.siafund_output_id(0);
    let spend_height = engine.height().plus(1);
    mine_and_accept(engine, vec![spend], burn_address(b"cl"));

    // The new fund output snapshots the pool for the next claim.
    let new_fund = engine.siafund_output(new_fund_id).unwrap();
    assert_eq!(new_fund.claim_start, setup.tax);

    mine_to_height(engine, Height(spend_height.0 + MATURITY_DELAY));
    let claim = engine.siacoin_output(claim_id).expect("claim matured");
    assert_eq!(claim.value, setup.tax);
    assert_eq!(claim.unlock_hash, claim_to);
}
