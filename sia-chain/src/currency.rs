//! The `Currency` type, an unbounded non-negative amount of coins.
//!
//! Consensus sums values across whole chains, so the type must not saturate
//! or wrap; it is a thin wrapper over an arbitrary-precision unsigned
//! integer. Subtraction is checked: going below zero is a validation error,
//! never a panic.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul};

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::serialization::{SerializationError, SiaDeserialize, SiaSerialize};

/// The canonical encoding caps the magnitude at this many bytes. Far beyond
/// any reachable supply, but small enough that a hostile length prefix
/// cannot force a large allocation.
const MAX_CURRENCY_LEN: u64 = 128;

/// An unbounded non-negative quantity of currency.
#[derive(Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Currency(BigUint);

impl Currency {
    pub fn zero() -> Currency {
        Currency(BigUint::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// `self - rhs`, or `None` if the result would be negative.
    pub fn checked_sub(&self, rhs: &Currency) -> Option<Currency> {
        if self.0 >= rhs.0 {
            Some(Currency(&self.0 - &rhs.0))
        } else {
            None
        }
    }
}

impl From<u64> for Currency {
    fn from(value: u64) -> Currency {
        Currency(BigUint::from(value))
    }
}

impl From<BigUint> for Currency {
    fn from(value: BigUint) -> Currency {
        Currency(value)
    }
}

impl Add for Currency {
    type Output = Currency;
    fn add(self, rhs: Currency) -> Currency {
        Currency(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a Currency> for Currency {
    type Output = Currency;
    fn add(self, rhs: &'a Currency) -> Currency {
        Currency(self.0 + &rhs.0)
    }
}

impl<'a> AddAssign<&'a Currency> for Currency {
    fn add_assign(&mut self, rhs: &'a Currency) {
        self.0 += &rhs.0;
    }
}

impl<'a, 'b> Mul<&'b Currency> for &'a Currency {
    type Output = Currency;
    fn mul(self, rhs: &'b Currency) -> Currency {
        Currency(&self.0 * &rhs.0)
    }
}

impl Mul<u64> for &Currency {
    type Output = Currency;
    fn mul(self, rhs: u64) -> Currency {
        Currency(&self.0 * rhs)
    }
}

/// Floor division; dividing by zero is an engine bug and panics.
impl Div<u64> for &Currency {
    type Output = Currency;
    fn div(self, rhs: u64) -> Currency {
        Currency(&self.0 / rhs)
    }
}

impl<'a> Sum<&'a Currency> for Currency {
    fn sum<I: Iterator<Item = &'a Currency>>(iter: I) -> Currency {
        let mut total = Currency::zero();
        for value in iter {
            total += value;
        }
        total
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for Currency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Currency").field(&self.0.to_string()).finish()
    }
}

impl SiaSerialize for Currency {
    fn sia_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
    where
        W: std::io::Write,
    {
        // Minimal big-endian magnitude; zero encodes as the empty string.
        let bytes = if self.0.is_zero() {
            Vec::new()
        } else {
            self.0.to_bytes_be()
        };
        target.write_u64::<LittleEndian>(bytes.len() as u64)?;
        target.write_all(&bytes)
    }
}

impl SiaDeserialize for Currency {
    fn sia_deserialize<R: std::io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let len = reader.read_u64::<LittleEndian>()?;
        if len > MAX_CURRENCY_LEN {
            return Err(SerializationError::Parse("currency length prefix too large"));
        }
        let mut bytes = vec![0u8; len as usize];
        reader.read_exact(&mut bytes)?;
        // Only one byte string may decode to each value, or encodings would
        // not round-trip byte-identically.
        if !bytes.is_empty() && bytes[0] == 0 {
            return Err(SerializationError::Parse("currency encoding is not minimal"));
        }
        Ok(Currency(BigUint::from_bytes_be(&bytes)))
    }
}

#[cfg(any(test, feature = "proptest-impl"))]
impl proptest::arbitrary::Arbitrary for Currency {
    type Parameters = ();
    type Strategy = proptest::strategy::BoxedStrategy<Self>;

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        use proptest::prelude::*;
        any::<u128>()
            .prop_map(|value| Currency(BigUint::from_bytes_be(&value.to_be_bytes())))
            .boxed()
    }
}
