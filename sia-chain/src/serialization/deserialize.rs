use byteorder::{LittleEndian, ReadBytesExt};
use std::io;

use super::SerializationError;
use crate::parameters::BLOCK_SIZE_LIMIT;

type Result<R> = std::result::Result<R, SerializationError>;

pub trait SiaDeserialize {
    fn sia_deserialize<R: io::Read>(reader: R) -> Result<Self>
    where
        Self: Sized;
}

/// Helper for deserializing more succinctly via type inference
pub trait SiaDeserializeInto {
    /// Deserialize based on type inference
    fn sia_deserialize_into<T>(self) -> Result<T>
    where
        T: SiaDeserialize;
}

impl<R: io::Read> SiaDeserializeInto for R {
    fn sia_deserialize_into<T>(self) -> Result<T>
    where
        T: SiaDeserialize,
    {
        T::sia_deserialize(self)
    }
}

/// Reads an 8-byte little-endian length prefix, rejecting lengths that could
/// not describe an object inside a valid block. The cap keeps a malicious
/// prefix from forcing a giant allocation or an unbounded element loop.
fn read_length_prefix<R: io::Read>(mut reader: R) -> Result<usize> {
    let len = reader.read_u64::<LittleEndian>()?;
    if len > BLOCK_SIZE_LIMIT {
        return Err(SerializationError::Parse("length prefix exceeds block size limit"));
    }
    Ok(len as usize)
}

impl SiaDeserialize for bool {
    fn sia_deserialize<R: io::Read>(mut reader: R) -> Result<bool> {
        let value = reader.read_u8()?;
        match value {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(SerializationError::Parse("invalid bool")),
        }
    }
}

impl SiaDeserialize for u8 {
    fn sia_deserialize<R: io::Read>(mut reader: R) -> Result<u8> {
        Ok(reader.read_u8()?)
    }
}

impl SiaDeserialize for u16 {
    fn sia_deserialize<R: io::Read>(mut reader: R) -> Result<u16> {
        Ok(reader.read_u16::<LittleEndian>()?)
    }
}

impl SiaDeserialize for u32 {
    fn sia_deserialize<R: io::Read>(mut reader: R) -> Result<u32> {
        Ok(reader.read_u32::<LittleEndian>()?)
    }
}

impl SiaDeserialize for u64 {
    fn sia_deserialize<R: io::Read>(mut reader: R) -> Result<u64> {
        Ok(reader.read_u64::<LittleEndian>()?)
    }
}

impl SiaDeserialize for i64 {
    fn sia_deserialize<R: io::Read>(mut reader: R) -> Result<i64> {
        Ok(reader.read_i64::<LittleEndian>()?)
    }
}

impl<T> SiaDeserialize for Vec<T>
where
    T: SiaDeserialize,
{
    fn sia_deserialize<R: io::Read>(mut reader: R) -> Result<Vec<T>> {
        let len = read_length_prefix(&mut reader)?;
        // Limit preallocation since blind preallocation from an attacker
        // controlled length prefix is a DOS vulnerability.
        let blind_alloc_limit = 1024;
        let mut result: Vec<T> = Vec::with_capacity(std::cmp::min(len, blind_alloc_limit));
        for _ in 0..len {
            result.push(T::sia_deserialize(&mut reader)?);
        }
        Ok(result)
    }
}

// TODO: Replace when const generics stabilize
macro_rules! impl_deserializable_byte_array {
    ($size:expr) => {
        impl SiaDeserialize for [u8; $size] {
            fn sia_deserialize<R: io::Read>(mut reader: R) -> Result<[u8; $size]> {
                let mut result = [0u8; $size];
                reader.read_exact(&mut result)?;
                Ok(result)
            }
        }
    };
}

impl_deserializable_byte_array!(32);
impl_deserializable_byte_array!(64);
