use proptest::prelude::*;

use super::*;
use crate::serialization::SiaDeserializeInto;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn transaction_roundtrip(transaction in any::<Transaction>()) {
        sia_test::init();

        let bytes = transaction.sia_serialize_to_vec()?;
        let decoded: Transaction = bytes.as_slice().sia_deserialize_into()?;
        prop_assert_eq!(&transaction, &decoded);

        // Decoding and re-encoding must reproduce the wire bytes exactly,
        // or peers could not safely reject non-canonical messages.
        prop_assert_eq!(bytes, decoded.sia_serialize_to_vec()?);
    }

    #[test]
    fn ids_are_disjoint_per_index(transaction in any::<Transaction>()) {
        sia_test::init();

        prop_assert_ne!(transaction.siacoin_output_id(0), transaction.siacoin_output_id(1));
        prop_assert_ne!(
            (transaction.siacoin_output_id(0).0).0,
            (transaction.file_contract_id(0).0).0
        );
        prop_assert_ne!(
            (transaction.siacoin_output_id(0).0).0,
            (transaction.siafund_output_id(0).0).0
        );
    }
}

#[test]
fn whole_transaction_sig_hash_binds_the_signing_triple() {
    sia_test::init();

    let mut transaction = Transaction {
        arbitrary_data: vec![b"host announcement".to_vec()],
        signatures: vec![TransactionSignature {
            parent_id: crate::crypto::hash_bytes(b"parent"),
            public_key_index: 0,
            timelock: Height(0),
            covered_fields: CoveredFields::whole_transaction(),
            signature: Signature([0; 64]),
        }],
        ..Transaction::default()
    };
    let original = transaction.sig_hash(0).expect("whole coverage never dangles");

    // The signature bytes themselves are not covered.
    transaction.signatures[0].signature = Signature([9; 64]);
    assert_eq!(transaction.sig_hash(0), Some(original));

    // But the triple binding the signature to its input is.
    transaction.signatures[0].public_key_index = 1;
    assert_ne!(transaction.sig_hash(0), Some(original));
}

#[test]
fn partial_sig_hash_covers_only_listed_fields() {
    sia_test::init();

    let mut transaction = Transaction {
        miner_fees: vec![Currency::from(10), Currency::from(20)],
        arbitrary_data: vec![b"one".to_vec(), b"two".to_vec()],
        signatures: vec![TransactionSignature {
            parent_id: crate::crypto::hash_bytes(b"parent"),
            public_key_index: 0,
            timelock: Height(0),
            covered_fields: CoveredFields {
                miner_fees: vec![0],
                ..CoveredFields::default()
            },
            signature: Signature([0; 64]),
        }],
        ..Transaction::default()
    };
    let original = transaction.sig_hash(0).unwrap();

    // An uncovered field can change freely.
    transaction.arbitrary_data[0] = b"changed".to_vec();
    assert_eq!(transaction.sig_hash(0), Some(original));

    // A covered field cannot.
    transaction.miner_fees[0] = Currency::from(11);
    assert_ne!(transaction.sig_hash(0), Some(original));
}

#[test]
fn sig_hash_rejects_dangling_covered_index() {
    sia_test::init();

    let transaction = Transaction {
        signatures: vec![TransactionSignature {
            parent_id: crate::crypto::hash_bytes(b"parent"),
            public_key_index: 0,
            timelock: Height(0),
            covered_fields: CoveredFields {
                miner_fees: vec![3],
                ..CoveredFields::default()
            },
            signature: Signature([0; 64]),
        }],
        ..Transaction::default()
    };
    assert_eq!(transaction.sig_hash(0), None);
}
