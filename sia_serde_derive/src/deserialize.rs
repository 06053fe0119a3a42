use proc_macro::TokenStream;
use quote::quote;

pub fn impl_deser_macro(ast: &syn::DeriveInput) -> TokenStream {
    let name = ast.ident.clone();
    let data = match ast.data {
        syn::Data::Struct(ref data) => data,
        _ => panic!("SiaDeserialize can only be derived for structs"),
    };
    let is_tuple_struct = matches!(data.fields, syn::Fields::Unnamed(_));

    let statements: Vec<proc_macro2::TokenStream> = data
        .fields
        .iter()
        .map(deserialize_field)
        .collect();

    let expanded = if is_tuple_struct {
        quote! {
            impl SiaDeserialize for #name {
                fn sia_deserialize<R: std::io::Read>(mut reader: R) -> Result<Self, SerializationError> {
                    Ok(#name (
                        #(#statements)*
                    ))
                }
            }
        }
    } else {
        quote! {
            impl SiaDeserialize for #name {
                fn sia_deserialize<R: std::io::Read>(mut reader: R) -> Result<Self, SerializationError> {
                    Ok(#name {
                        #(#statements)*
                    })
                }
            }
        }
    };

    TokenStream::from(expanded)
}

fn deserialize_field(field: &syn::Field) -> proc_macro2::TokenStream {
    let ty = field.ty.clone();
    match field.ident.clone() {
        Some(name) => {
            quote! { #name: <#ty as SiaDeserialize>::sia_deserialize(&mut reader)?, }
        }
        None => {
            quote! { <#ty as SiaDeserialize>::sia_deserialize(&mut reader)?, }
        }
    }
}
