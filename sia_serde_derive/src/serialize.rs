use proc_macro::TokenStream;
use quote::quote;

pub fn impl_ser_macro(ast: &syn::DeriveInput) -> TokenStream {
    let name = ast.ident.clone();
    let data = match ast.data {
        syn::Data::Struct(ref data) => data,
        // No wire type is an enum; a union has no canonical field order.
        _ => panic!("SiaSerialize can only be derived for structs"),
    };

    let statements: Vec<proc_macro2::TokenStream> = data
        .fields
        .iter()
        .enumerate()
        .map(|(index, field)| serialize_field(field, index))
        .collect();

    let expanded = quote! {
        impl SiaSerialize for #name {
            fn sia_serialize<W>(&self, mut target: W) -> Result<(), std::io::Error>
            where
                W: std::io::Write,
            {
                #(#statements)*
                Ok(())
            }
        }
    };
    TokenStream::from(expanded)
}

fn serialize_field(field: &syn::Field, index: usize) -> proc_macro2::TokenStream {
    match field.ident.clone() {
        Some(id) => quote! { self.#id.sia_serialize(&mut target)?; },
        None => {
            let index = syn::Index::from(index);
            quote! { self.#index.sia_serialize(&mut target)?; }
        }
    }
}
