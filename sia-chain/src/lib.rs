//! Core chain types for a proof-of-work UTXO cryptocurrency with
//! first-class file-storage contracts.
//!
//! This crate defines the primitive types (hashes, currency, heights,
//! targets), the canonical consensus serialization every identifier and
//! signature hash is derived from, and the block/transaction data model.
//! The consensus rules that judge these types live in `sia-consensus`.

#![allow(clippy::unit_arg)]

pub mod block;
pub mod contract;
pub mod crypto;
pub mod currency;
pub mod parameters;
pub mod serialization;
pub mod siacoin;
pub mod siafund;
pub mod transaction;
pub mod unlock;
pub mod work;

pub use serialization::{SerializationError, SiaDeserialize, SiaDeserializeInto, SiaSerialize};
