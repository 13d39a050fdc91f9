use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, LitStr, Type};

struct Property<'a> {
    field: &'a Ident,
    ty: &'a Type,
    name: String,
}

pub fn expand_derive(input: DeriveInput) -> TokenStream {
    match expand(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let ident = &input.ident;
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(ident, "Interface can only be derived for structs"));
    };
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(&input.generics, "Interface types cannot be generic"));
    }

    let interface_name = interface_name(input)?;
    let properties = match &data.fields {
        Fields::Named(named) => named
            .named
            .iter()
            .map(|f| {
                let field = f.ident.as_ref().ok_or_else(|| {
                    syn::Error::new_spanned(f, "Interface properties must be named")
                })?;
                let name = match property_rename(&f.attrs)? {
                    Some(rename) => rename,
                    None => pascal_case(&field.to_string()),
                };
                Ok(Property { field, ty: &f.ty, name })
            })
            .collect::<syn::Result<Vec<_>>>()?,
        Fields::Unit => Vec::new(),
        Fields::Unnamed(_) => {
            return Err(syn::Error::new_spanned(
                ident,
                "Interface requires named fields or a unit struct",
            ));
        },
    };

    let names: Vec<&str> = properties.iter().map(|p| p.name.as_str()).collect();

    let get_arms = properties.iter().map(|p| {
        let field = p.field;
        let name = &p.name;
        quote! { #name => Some(::pim_inventory::Value::from(self.#field.clone())), }
    });

    let check_arms = properties.iter().map(|p| {
        let ty = p.ty;
        let name = &p.name;
        quote! {
            #name => <#ty as ::pim_inventory::FromValue>::from_value(value.clone())
                .map(drop)
                .map_err(|source| ::pim_inventory::interface::conversion_failed(<Self as ::pim_inventory::InterfaceSchema>::NAME, name, source)),
        }
    });

    let set_arms = properties.iter().map(|p| {
        let field = p.field;
        let ty = p.ty;
        let name = &p.name;
        quote! {
            #name => {
                let next = <#ty as ::pim_inventory::FromValue>::from_value(value)
                    .map_err(|source| ::pim_inventory::interface::conversion_failed(<Self as ::pim_inventory::InterfaceSchema>::NAME, name, source))?;
                if self.#field == next {
                    Ok(false)
                } else {
                    self.#field = next;
                    Ok(true)
                }
            },
        }
    });

    Ok(quote! {
        #[automatically_derived]
        impl ::pim_inventory::InterfaceSchema for #ident {
            const NAME: &'static str = #interface_name;
        }

        #[automatically_derived]
        impl ::pim_inventory::Interface for #ident {
            fn interface_name(&self) -> &'static str {
                <Self as ::pim_inventory::InterfaceSchema>::NAME
            }

            fn property_names(&self) -> &'static [&'static str] {
                &[#(#names),*]
            }

            fn property(&self, name: &str) -> Option<::pim_inventory::Value> {
                match name {
                    #(#get_arms)*
                    _ => None,
                }
            }

            #[allow(unused_variables)]
            fn check_property(
                &self,
                name: &str,
                value: &::pim_inventory::Value,
            ) -> Result<(), ::pim_inventory::InterfaceError> {
                match name {
                    #(#check_arms)*
                    _ => Err(::pim_inventory::interface::unknown_property(<Self as ::pim_inventory::InterfaceSchema>::NAME, name)),
                }
            }

            #[allow(unused_variables)]
            fn set_property(
                &mut self,
                name: &str,
                value: ::pim_inventory::Value,
            ) -> Result<bool, ::pim_inventory::InterfaceError> {
                match name {
                    #(#set_arms)*
                    _ => Err(::pim_inventory::interface::unknown_property(<Self as ::pim_inventory::InterfaceSchema>::NAME, name)),
                }
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
        }
    })
}

fn interface_name(input: &DeriveInput) -> syn::Result<LitStr> {
    let mut name = None;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("interface")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                if lit.value().is_empty() {
                    return Err(meta.error("interface name cannot be empty"));
                }
                name = Some(lit);
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"`"))
            }
        })?;
    }
    name.ok_or_else(|| {
        syn::Error::new_spanned(
            &input.ident,
            "missing #[interface(name = \"...\")] on Interface derive",
        )
    })
}

fn property_rename(attrs: &[syn::Attribute]) -> syn::Result<Option<String>> {
    let mut rename = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("property")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                rename = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("expected `rename = \"...\"`"))
            }
        })?;
    }
    Ok(rename)
}

fn pascal_case(field: &str) -> String {
    field
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect::<String>()
            })
        })
        .collect()
}
