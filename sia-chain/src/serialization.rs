//! Consensus-critical serialization.
//!
//! This module contains three traits: `SiaSerialize` and `SiaDeserialize`,
//! analogs of the Serde `Serialize` and `Deserialize` traits but intended for
//! the canonical consensus encoding, and `SiaDeserializeInto`, an extension
//! trait for deserializing via type inference. Every hash, identifier, and
//! signed payload in the protocol is derived from these bytes, so two
//! implementations must produce identical output for identical values.
//!
//! The encoding rules:
//! - fixed-width integers are little-endian at their natural width;
//! - byte strings and sequences carry an 8-byte little-endian length prefix;
//! - structs encode their fields in declaration order with no framing
//!   (see the `sia_serde_derive` macros);
//! - fixed-size arrays (hashes, public keys, signatures) are raw bytes.

mod deserialize;
mod error;

pub use deserialize::{SiaDeserialize, SiaDeserializeInto};
pub use error::SerializationError;

use byteorder::{LittleEndian, WriteBytesExt};

pub trait SiaSerialize {
    fn sia_serialize<W: std::io::Write>(&self, target: W) -> Result<(), std::io::Error>;

    fn sia_serialize_to_vec(&self) -> Result<Vec<u8>, std::io::Error> {
        let mut data = Vec::new();
        self.sia_serialize(&mut data)?;
        Ok(data)
    }
}

impl SiaSerialize for bool {
    fn sia_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_all(&[*self as u8])
    }
}

impl SiaSerialize for u16 {
    fn sia_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_u16::<LittleEndian>(*self)
    }
}

impl SiaSerialize for u32 {
    fn sia_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_u32::<LittleEndian>(*self)
    }
}

impl SiaSerialize for u64 {
    fn sia_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_u64::<LittleEndian>(*self)
    }
}

impl SiaSerialize for i64 {
    fn sia_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_i64::<LittleEndian>(*self)
    }
}

// TODO: Replace the per-size impls with const generics when the minimum
// supported compiler has them.
macro_rules! impl_serializable_byte_array {
    ($size:expr) => {
        impl SiaSerialize for [u8; $size] {
            fn sia_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
            where
                W: std::io::Write,
            {
                target.write_all(self)
            }
        }
    };
}

impl_serializable_byte_array!(32);
impl_serializable_byte_array!(64);

impl SiaSerialize for Vec<u8> {
    fn sia_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_u64::<LittleEndian>(self.len() as u64)?;
        target.write_all(self)?;
        Ok(())
    }
}

// Note: there is deliberately no `impl SiaSerialize for u8`; it would make
// this impl overlap with the length-prefixed `Vec<u8>` impl above.
impl<T> SiaSerialize for Vec<T>
where
    T: SiaSerialize,
{
    fn sia_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        target.write_u64::<LittleEndian>(self.len() as u64)?;
        for item in self.iter() {
            item.sia_serialize(&mut target)?;
        }
        Ok(())
    }
}
