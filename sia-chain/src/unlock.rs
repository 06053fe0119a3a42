//! Unlock conditions: the spending predicate outputs commit to.
//!
//! An output stores only the 32-byte `UnlockHash`; the spender reveals the
//! full `UnlockConditions` in the input and supplies the required number of
//! signatures. The hash is a Merkle root over the timelock, the ordered
//! public keys, and the required-signature count, so the conditions cannot
//! be altered after the output is created.

use serde::{Deserialize, Serialize};
use sia_serde_derive::{SiaDeserialize, SiaSerialize};

use crate::block::Height;
use crate::crypto::{self, merkle};
use crate::serialization::{SerializationError, SiaDeserialize, SiaSerialize};

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

/// An ed25519 public key.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    SiaSerialize,
    SiaDeserialize,
)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    /// Whether `signature` is a valid ed25519 signature by this key over
    /// `message`. Key bytes that do not decode to a curve point simply fail
    /// verification; they are representable on the wire, so they must not
    /// panic.
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> bool {
        use std::convert::TryFrom;
        let key = match ed25519_zebra::VerificationKey::try_from(self.0) {
            Ok(key) => key,
            Err(_) => return false,
        };
        key.verify(&ed25519_zebra::Signature::from(*signature), message)
            .is_ok()
    }
}

/// The address outputs commit to.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    SiaSerialize,
    SiaDeserialize,
)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct UnlockHash(pub crypto::Hash);

impl std::fmt::Display for UnlockHash {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// The spending predicate revealed by an input.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, SiaSerialize, SiaDeserialize)]
pub struct UnlockConditions {
    /// The output cannot be spent before this height.
    pub timelock: Height,
    /// The keys eligible to sign, in order. `PublicKeyIndex` in a
    /// transaction signature indexes into this list.
    pub public_keys: Vec<PublicKey>,
    /// How many distinct keys must sign.
    pub signatures_required: u64,
}

impl UnlockConditions {
    /// A single-key predicate with no timelock.
    pub fn single_key(key: PublicKey) -> UnlockConditions {
        UnlockConditions {
            timelock: Height(0),
            public_keys: vec![key],
            signatures_required: 1,
        }
    }

    /// The Merkle root committing to these conditions. Each field is a leaf
    /// in its canonical encoding: the timelock, then every key, then the
    /// required-signature count.
    pub fn unlock_hash(&self) -> UnlockHash {
        let mut leaves: Vec<Vec<u8>> = Vec::with_capacity(self.public_keys.len() + 2);
        leaves.push(
            self.timelock
                .sia_serialize_to_vec()
                .expect("serializing to a Vec is infallible"),
        );
        for key in &self.public_keys {
            leaves.push(
                key.sia_serialize_to_vec()
                    .expect("serializing to a Vec is infallible"),
            );
        }
        leaves.push(
            self.signatures_required
                .sia_serialize_to_vec()
                .expect("serializing to a Vec is infallible"),
        );

        let leaf_slices: Vec<&[u8]> = leaves.iter().map(|leaf| leaf.as_slice()).collect();
        UnlockHash(merkle::root(&leaf_slices))
    }
}
