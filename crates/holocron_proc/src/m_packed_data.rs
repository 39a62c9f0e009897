use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Type};

pub fn packed_data_derive(input: TokenStream) -> TokenStream {
    let parsed = parse_macro_input!(input as DeriveInput);
    match expand(&parsed) {
        Ok(tokens) => tokens.into(),
        Err(error) => error.to_compile_error().into(),
    }
}

fn expand(parsed: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &parsed.ident;

    let (reader, writer) = match &parsed.data {
        Data::Struct(data) => {
            let Fields::Named(fields) = &data.fields else {
                return Err(syn::Error::new_spanned(
                    &parsed.ident,
                    "PackedData requires named struct fields",
                ));
            };

            let field_names: Vec<_> = fields.named.iter().map(|f| &f.ident).collect();
            let field_types: Vec<_> = fields.named.iter().map(|f| &f.ty).collect();

            (
                quote! {
                    Ok(Self {
                        #(#field_names: <#field_types as ::holocron_utils::packed::PackedData>::read_packed(r)?,)*
                    })
                },
                quote! {
                    #(::holocron_utils::packed::PackedData::write_packed(&self.#field_names, w)?;)*
                    Ok(())
                },
            )
        }
        Data::Enum(_) => {
            let parse_as = parsed
                .attrs
                .iter()
                .find(|attribute| attribute.path.is_ident("parse_as"))
                .ok_or_else(|| {
                    syn::Error::new_spanned(&parsed.ident, "enums need a #[parse_as(T)] attribute")
                })?;
            let parse_type: Type = parse_as.parse_args()?;

            (
                quote! {
                    let raw = <#parse_type as ::holocron_utils::packed::PackedData>::read_packed(r)?;
                    Ok(Self::try_from(raw)?)
                },
                quote! {
                    let raw = <#parse_type>::from(self.clone());
                    ::holocron_utils::packed::PackedData::write_packed(&raw, w)
                },
            )
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                &parsed.ident,
                "PackedData can't be derived for unions",
            ))
        }
    };

    Ok(quote! {
        impl ::holocron_utils::packed::PackedData for #name {
            fn read_packed<R: ::std::io::Read>(r: &mut R) -> ::holocron_utils::AnyResult<Self> {
                #reader
            }

            fn write_packed<W: ::std::io::Write>(&self, w: &mut W) -> ::holocron_utils::AnyResult {
                #writer
            }
        }
    })
}
