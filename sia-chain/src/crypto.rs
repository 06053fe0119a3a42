//! Hashing primitives.
//!
//! Every identifier in the protocol is a 32-byte blake2b digest of the
//! canonical encoding of its parent object, prefixed with a domain-separating
//! tag so that no two object kinds can ever collide on the same bytes.

pub mod merkle;

use std::{fmt, io};

use serde::{Deserialize, Serialize};
use sia_serde_derive::{SiaDeserialize, SiaSerialize};

use crate::serialization::{SerializationError, SiaDeserialize, SiaSerialize};

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

/// The number of bytes in a digest.
pub const HASH_SIZE: usize = 32;

/// Domain-separating tags, prefixed to the canonical encoding of an object
/// before hashing. These strings are consensus-critical.
pub mod tag {
    pub const BLOCK: &[u8] = b"block";
    pub const TRANSACTION: &[u8] = b"transaction";
    pub const SIACOIN_OUTPUT: &[u8] = b"siacoin output";
    pub const FILE_CONTRACT: &[u8] = b"file contract";
    pub const SIAFUND_OUTPUT: &[u8] = b"siafund output";
    pub const STORAGE_PROOF: &[u8] = b"storage proof";
    pub const CONTRACT_TERMINATION: &[u8] = b"contract termination";
    pub const MINER_PAYOUT: &[u8] = b"miner payout";
    pub const SIAFUND_CLAIM: &[u8] = b"siafund claim";
}

/// A 32-byte blake2b digest.
///
/// `Ord` compares the raw big-endian bytes, so sorting hashes (or the
/// identifier newtypes wrapping them) yields numerical order. The ordered
/// consensus indexes rely on this to emit diffs deterministically.
#[derive(
    Copy,
    Clone,
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
pub struct Hash(pub [u8; HASH_SIZE]);

impl Hash {
    /// Interprets the digest as a big-endian integer and reduces it modulo
    /// `modulus`. Used to derive the storage-proof challenge index; the
    /// slight bias toward low values is accepted by the protocol.
    pub fn modulo(&self, modulus: u64) -> u64 {
        let n = primitive_types::U256::from_big_endian(&self.0);
        (n % primitive_types::U256::from(modulus)).low_u64()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Hash").field(&hex::encode(&self.0)).finish()
    }
}

impl std::str::FromStr for Hash {
    type Err = SerializationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0; HASH_SIZE];
        if hex::decode_to_slice(s, &mut bytes[..]).is_err() {
            Err(SerializationError::Parse("hex decoding error"))
        } else {
            Ok(Hash(bytes))
        }
    }
}

/// An [`io::Write`] adapter that hashes everything written to it.
///
/// Allows hashing canonical encodings without buffering them in memory, in
/// the same way the serialization traits stream into any writer.
pub struct Writer {
    state: blake2b_simd::State,
}

impl Default for Writer {
    fn default() -> Self {
        let state = blake2b_simd::Params::new().hash_length(HASH_SIZE).to_state();
        Writer { state }
    }
}

impl Writer {
    /// Consume the writer and produce the digest of all bytes written so far.
    pub fn finish(self) -> Hash {
        let digest = self.state.finalize();
        let mut bytes = [0u8; HASH_SIZE];
        bytes.copy_from_slice(digest.as_bytes());
        Hash(bytes)
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.state.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Hash a raw byte string.
pub fn hash_bytes(data: &[u8]) -> Hash {
    hash_all(&[data])
}

/// Hash the concatenation of several byte strings.
pub fn hash_all(parts: &[&[u8]]) -> Hash {
    let mut state = blake2b_simd::Params::new().hash_length(HASH_SIZE).to_state();
    for part in parts {
        state.update(part);
    }
    let digest = state.finalize();
    let mut bytes = [0u8; HASH_SIZE];
    bytes.copy_from_slice(digest.as_bytes());
    Hash(bytes)
}

/// Hash the canonical encoding of `object`, prefixed with `tag`.
pub fn hash_object<T: SiaSerialize>(tag: &[u8], object: &T) -> Hash {
    let mut writer = Writer::default();
    use io::Write;
    writer
        .write_all(tag)
        .expect("writing to a hash writer is infallible");
    object
        .sia_serialize(&mut writer)
        .expect("hash writers are infallible");
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_separate_domains() {
        let value = 7u64;
        assert_ne!(
            hash_object(tag::SIACOIN_OUTPUT, &value),
            hash_object(tag::SIAFUND_OUTPUT, &value),
        );
    }

    #[test]
    fn streaming_matches_buffered() {
        let value = vec![1u8, 2, 3, 4];
        let buffered = {
            let mut bytes = tag::BLOCK.to_vec();
            bytes.extend(value.sia_serialize_to_vec().unwrap());
            hash_bytes(&bytes)
        };
        assert_eq!(hash_object(tag::BLOCK, &value), buffered);
    }

    #[test]
    fn modulo_small_hash() {
        let mut bytes = [0u8; HASH_SIZE];
        bytes[31] = 13;
        assert_eq!(Hash(bytes).modulo(5), 3);
    }
}
