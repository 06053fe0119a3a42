//! Derive macros for the consensus serialization format.
//!
//! `SiaSerialize` and `SiaDeserialize` expand to field-ordered encoding
//! implementations: each field is encoded in declaration order with no
//! framing, which is exactly the canonical struct rule. The traits
//! themselves live in the chain crate; the expansion refers to them by
//! name, so deriving modules must have `SiaSerialize`, `SiaDeserialize`
//! and `SerializationError` in scope.

extern crate proc_macro;
use proc_macro::TokenStream;

mod deserialize;
mod serialize;

#[proc_macro_derive(SiaSerialize)]
pub fn serializable(input: TokenStream) -> TokenStream {
    let ast = syn::parse(input).unwrap();
    serialize::impl_ser_macro(&ast)
}

#[proc_macro_derive(SiaDeserialize)]
pub fn deserializable(input: TokenStream) -> TokenStream {
    let ast = syn::parse(input).unwrap();
    deserialize::impl_deser_macro(&ast)
}
