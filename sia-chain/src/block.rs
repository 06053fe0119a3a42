//! Blocks and block-related structures (heights, timestamps, IDs).

#[cfg(any(test, feature = "proptest-impl"))]
mod arbitrary;
#[cfg(test)]
mod tests;

use std::fmt;

use serde::{Deserialize, Serialize};
use sia_serde_derive::{SiaDeserialize, SiaSerialize};

use crate::crypto::{self, tag};
use crate::serialization::{SerializationError, SiaDeserialize, SiaSerialize};
use crate::siacoin::{SiacoinOutput, SiacoinOutputID};
use crate::transaction::Transaction;

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

/// The height of a block: the number of blocks between it and the genesis
/// block, which sits at height zero.
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
pub struct Height(pub u64);

impl Height {
    /// The height `delta` blocks above this one.
    pub fn plus(&self, delta: u64) -> Height {
        Height(self.0 + delta)
    }

    /// The height directly below this one, or `None` at genesis.
    pub fn predecessor(&self) -> Option<Height> {
        self.0.checked_sub(1).map(Height)
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// A Unix timestamp in seconds.
#[derive(
    Copy,
    Clone,
    Debug,
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
pub struct Timestamp(pub i64);

/// A hash of a block, used to identify blocks and link them into a chain.
///
/// The ID is also the proof-of-work candidate: a block is only minable if
/// its ID, read as a 256-bit big-endian integer, does not exceed the child
/// target stored on its parent.
#[derive(
    Copy,
    Clone,
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
pub struct BlockID(pub crypto::Hash);

impl fmt::Display for BlockID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for BlockID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("BlockID")
            .field(&hex::encode(&(self.0).0))
            .finish()
    }
}

impl std::str::FromStr for BlockID {
    type Err = SerializationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(BlockID)
    }
}

/// A block: a batch of transactions extending a parent, stamped with the
/// nonce that satisfied the proof-of-work and the payouts claiming the
/// subsidy and fees.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, SiaSerialize, SiaDeserialize)]
pub struct Block {
    /// The ID of this block's parent, chaining it to the rest of history.
    pub parent_id: BlockID,
    /// Ground by the miner until the block's ID meets the target.
    pub nonce: u64,
    /// When the miner assembled the block (according to the miner).
    pub timestamp: Timestamp,
    /// How the block subsidy plus the block's transaction fees are split.
    /// These outputs are delayed by the maturity window before they can be
    /// spent.
    pub miner_payouts: Vec<SiacoinOutput>,
    /// The block transactions, applied in order.
    pub transactions: Vec<Transaction>,
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Block")
            .field("id", &self.id())
            .field("parent", &self.parent_id)
            .finish()
    }
}

impl Block {
    /// Compute the ID of this block.
    pub fn id(&self) -> BlockID {
        BlockID(crypto::hash_object(tag::BLOCK, self))
    }

    /// The ID of the miner payout output at `index`.
    pub fn miner_payout_id(&self, index: u64) -> SiacoinOutputID {
        SiacoinOutputID(crypto::hash_all(&[
            tag::MINER_PAYOUT,
            &((self.id().0).0),
            &index.to_le_bytes(),
        ]))
    }

    /// The serialized length of the block in bytes, the quantity bounded by
    /// the block size limit.
    pub fn encoded_len(&self) -> u64 {
        self.sia_serialize_to_vec()
            .expect("serializing to a Vec is infallible")
            .len() as u64
    }
}
