use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr};

pub fn expand_derive(input: DeriveInput) -> TokenStream {
    match expand(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let ident = &input.ident;
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(ident, "PropertyEnum can only be derived for enums"));
    };

    let prefix = prefix(input)?;
    let mut variants = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "PropertyEnum variants cannot carry data",
            ));
        }
        variants.push(&variant.ident);
    }

    let qualified: Vec<String> =
        variants.iter().map(|v| format!("{}.{v}", prefix.value())).collect();
    let bare: Vec<String> = variants.iter().map(ToString::to_string).collect();

    Ok(quote! {
        #[automatically_derived]
        impl #ident {
            /// Namespace of the enumerator strings on the bus.
            pub const PREFIX: &'static str = #prefix;

            /// The fully-qualified enumerator string.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    #(Self::#variants => #qualified,)*
                }
            }

            /// Resolves either a fully-qualified or a bare enumerator name.
            #[must_use]
            pub fn from_name(name: &str) -> Option<Self> {
                let bare = name
                    .strip_prefix(Self::PREFIX)
                    .and_then(|rest| rest.strip_prefix('.'))
                    .unwrap_or(name);
                match bare {
                    #(#bare => Some(Self::#variants),)*
                    _ => None,
                }
            }
        }

        #[automatically_derived]
        impl ::std::convert::From<#ident> for ::pim_inventory::Value {
            fn from(value: #ident) -> Self {
                ::pim_inventory::Value::String(value.as_str().to_owned())
            }
        }

        #[automatically_derived]
        impl ::pim_inventory::FromValue for #ident {
            fn from_value(value: ::pim_inventory::Value) -> Result<Self, ::pim_inventory::ConversionError> {
                match value {
                    ::pim_inventory::Value::String(s) => Self::from_name(&s).ok_or_else(|| {
                        ::pim_inventory::ConversionError::UnknownEnumerator {
                            message: s.into(),
                            context: Some(Self::PREFIX.into()),
                        }
                    }),
                    other => Err(::pim_inventory::ConversionError::mismatch("string", &other)),
                }
            }
        }
    })
}

fn prefix(input: &DeriveInput) -> syn::Result<LitStr> {
    let mut prefix = None;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("property_enum")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("prefix") {
                prefix = Some(meta.value()?.parse::<LitStr>()?);
                Ok(())
            } else {
                Err(meta.error("expected `prefix = \"...\"`"))
            }
        })?;
    }
    prefix.ok_or_else(|| {
        syn::Error::new_spanned(&input.ident, "missing #[property_enum(prefix = \"...\")]")
    })
}
