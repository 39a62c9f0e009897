use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, ItemEnum, Type};

pub fn ext_repr(input: TokenStream, source_item: TokenStream) -> TokenStream {
    let item = parse_macro_input!(source_item as ItemEnum);
    let repr_type = parse_macro_input!(input as Type);
    let enum_name = &item.ident;

    let Some(last) = item.variants.last().map(|variant| &variant.ident) else {
        return syn::Error::new_spanned(&item, "ext_repr requires at least one variant")
            .to_compile_error()
            .into();
    };

    let value_consts: Vec<_> = item
        .variants
        .iter()
        .map(|variant| format_ident!("{}_VALUE", variant.ident.to_string().to_uppercase()))
        .collect();
    let idents: Vec<_> = item.variants.iter().map(|variant| &variant.ident).collect();

    let try_from_repr = quote! {
        impl TryFrom<#repr_type> for #enum_name {
            type Error = ::holocron_utils::EnumParseError;

            #[allow(non_upper_case_globals)]
            fn try_from(value: #repr_type) -> Result<Self, ::holocron_utils::EnumParseError> {
                #(const #value_consts: #repr_type = #enum_name::#idents as #repr_type;)*
                match value {
                    #(#value_consts => Ok(Self::#idents),)*
                    _ => Err(::holocron_utils::EnumParseError),
                }
            }
        }
    };

    let from_self = quote! {
        impl From<#enum_name> for #repr_type {
            fn from(value: #enum_name) -> #repr_type {
                value as #repr_type
            }
        }
    };

    let names = quote! {
        impl<'a> TryFrom<&'a str> for #enum_name {
            type Error = ::holocron_utils::EnumParseError;

            fn try_from(value: &'a str) -> Result<Self, ::holocron_utils::EnumParseError> {
                #(
                    if value.eq_ignore_ascii_case(stringify!(#idents)) {
                        return Ok(Self::#idents);
                    }
                )*
                Err(::holocron_utils::EnumParseError)
            }
        }

        impl From<#enum_name> for &'static str {
            fn from(value: #enum_name) -> &'static str {
                match value {
                    #(#enum_name::#idents => stringify!(#idents),)*
                }
            }
        }
    };

    let last_const = quote! {
        impl #enum_name {
            /// Last declared variant, used as the upper bound when clamping raw values.
            pub const LAST: Self = Self::#last;
        }
    };

    quote! {
        #[repr(#repr_type)]
        #item

        #try_from_repr
        #from_self
        #names
        #last_const
    }
    .into()
}
