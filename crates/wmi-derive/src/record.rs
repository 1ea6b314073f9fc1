// #[derive(Record)] implementation
//
// Generates a static FieldBinding table for the struct.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, Result};

/// Options read from `#[wmi(...)]` on a field.
#[derive(Default)]
struct FieldOptions {
    rename: Option<String>,
    skip: bool,
}

/// Options read from `#[wmi(...)]` on the struct.
#[derive(Default)]
struct ContainerOptions {
    class: Option<String>,
}

fn field_options(attrs: &[Attribute]) -> Result<FieldOptions> {
    let mut options = FieldOptions::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("wmi")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let name: LitStr = meta.value()?.parse()?;
                if name.value().is_empty() {
                    return Err(meta.error("property name cannot be empty"));
                }
                options.rename = Some(name.value());
                Ok(())
            } else if meta.path.is_ident("skip") {
                options.skip = true;
                Ok(())
            } else {
                Err(meta.error("expected `rename = \"...\"` or `skip`"))
            }
        })?;
    }
    Ok(options)
}

fn container_options(attrs: &[Attribute]) -> Result<ContainerOptions> {
    let mut options = ContainerOptions::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("wmi")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("class") {
                let class: LitStr = meta.value()?.parse()?;
                options.class = Some(class.value());
                Ok(())
            } else {
                Err(meta.error("expected `class = \"...\"`"))
            }
        })?;
    }
    Ok(options)
}

/// `interface_index` -> `InterfaceIndex`
pub(crate) fn pascal_case(field: &str) -> String {
    let field = field.strip_prefix("r#").unwrap_or(field);
    let mut out = String::with_capacity(field.len());
    let mut upper = true;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Expands `#[derive(Record)]`.
///
/// Example expansion:
/// ```ignore
/// impl ::wmi_core::Record for Adapter {
///     const CLASS: Option<&'static str> = Some("Win32_NetworkAdapter");
///
///     fn bindings() -> &'static [::wmi_core::FieldBinding<Self>] {
///         static BINDINGS: [::wmi_core::FieldBinding<Adapter>; 1] = [
///             ::wmi_core::FieldBinding {
///                 field: "name",
///                 property: "Name",
///                 assign: |record, value| { ... },
///                 extract: |record| { ... },
///             },
///         ];
///         &BINDINGS
///     }
/// }
/// ```
pub fn expand_record(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record cannot be derived for generic types",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "Record requires a struct with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Record can only be derived for structs",
            ))
        }
    };

    let container = container_options(&input.attrs)?;

    let mut bindings = Vec::new();
    let mut seen: Vec<(String, &syn::Ident)> = Vec::new();
    for field in fields {
        let options = field_options(&field.attrs)?;
        if options.skip {
            continue;
        }

        let ident = field.ident.as_ref().ok_or_else(|| {
            syn::Error::new_spanned(field, "Record requires a struct with named fields")
        })?;
        let ty = &field.ty;
        let field_name = ident.to_string();
        let property = options
            .rename
            .unwrap_or_else(|| pascal_case(&field_name));

        if let Some((_, other)) = seen
            .iter()
            .find(|(p, _)| p.eq_ignore_ascii_case(&property))
        {
            return Err(syn::Error::new_spanned(
                ident,
                format!("property '{}' is already bound to field `{}`", property, other),
            ));
        }
        seen.push((property.clone(), ident));

        let field_name = field_name.trim_start_matches("r#").to_string();
        bindings.push(quote! {
            ::wmi_core::FieldBinding {
                field: #field_name,
                property: #property,
                assign: |record, value| {
                    record.#ident = <#ty as ::wmi_core::FromValue>::from_value(value)?;
                    ::core::result::Result::Ok(())
                },
                extract: |record| ::wmi_core::ToValue::to_value(&record.#ident),
            }
        });
    }

    let count = bindings.len();
    let class = container.class.map(|class| {
        quote! {
            const CLASS: ::core::option::Option<&'static str> =
                ::core::option::Option::Some(#class);
        }
    });

    Ok(quote! {
        impl ::wmi_core::Record for #name {
            #class

            fn bindings() -> &'static [::wmi_core::FieldBinding<Self>] {
                static BINDINGS: [::wmi_core::FieldBinding<#name>; #count] = [
                    #(#bindings),*
                ];
                &BINDINGS
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("name"), "Name");
        assert_eq!(pascal_case("interface_index"), "InterfaceIndex");
        assert_eq!(pascal_case("mac_address"), "MacAddress");
        assert_eq!(pascal_case("r#type"), "Type");
        assert_eq!(pascal_case("__class"), "Class");
    }

    #[test]
    fn test_rejects_tuple_struct() {
        let input: DeriveInput = syn::parse_quote! {
            struct Pair(u32, u32);
        };
        assert!(expand_record(input).is_err());
    }

    #[test]
    fn test_rejects_duplicate_property() {
        let input: DeriveInput = syn::parse_quote! {
            struct Dup {
                name: String,
                #[wmi(rename = "NAME")]
                other: String,
            }
        };
        let err = expand_record(input).unwrap_err();
        assert!(err.to_string().contains("already bound"));
    }

    #[test]
    fn test_skip_and_class() {
        let input: DeriveInput = syn::parse_quote! {
            #[wmi(class = "Win32_Process")]
            struct Process {
                name: String,
                #[wmi(skip)]
                cached: bool,
            }
        };
        let tokens = expand_record(input).unwrap().to_string();
        assert!(tokens.contains("\"Win32_Process\""));
        assert!(tokens.contains("\"Name\""));
        assert!(!tokens.contains("cached"));
    }
}
