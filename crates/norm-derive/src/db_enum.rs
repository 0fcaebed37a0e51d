//! `#[derive(DbEnum)]`: store a unit-only enum by variant name (or ordinal,
//! chosen per field with `#[orm(enumerated = "ordinal")]`).

use heck::{ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    let variants = match &input.data {
        Data::Enum(e) => &e.variants,
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "DbEnum can only be derived for enums",
            ));
        }
    };
    if variants.is_empty() {
        return Err(syn::Error::new_spanned(
            &input,
            "DbEnum needs at least one variant",
        ));
    }

    let rename_all = parse_rename_all(&input.attrs)?;

    let mut stored_names = Vec::new();
    let mut to_name_arms = Vec::new();
    let mut from_name_arms = Vec::new();

    for variant in variants {
        if !matches!(&variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "DbEnum variants must be unit variants (no fields)",
            ));
        }

        let variant_ident = &variant.ident;
        let stored = match parse_rename(&variant.attrs)? {
            Some(explicit) => explicit,
            None => rename_all.apply(&variant_ident.to_string()),
        };
        if stored_names.contains(&stored) {
            return Err(syn::Error::new_spanned(
                variant,
                format!("two variants are stored as \"{stored}\""),
            ));
        }

        to_name_arms.push(quote! { #name::#variant_ident => #stored, });
        from_name_arms.push(quote! { #stored => ::std::option::Option::Some(#name::#variant_ident), });
        stored_names.push(stored);
    }

    let type_name = name.to_string();

    Ok(quote! {
        impl ::norm::DbEnum for #name {
            const TYPE_NAME: &'static str = #type_name;
            const VARIANTS: &'static [&'static str] = &[#(#stored_names),*];

            fn variant_name(&self) -> &'static str {
                match self {
                    #(#to_name_arms)*
                }
            }

            fn from_variant_name(name: &str) -> ::std::option::Option<Self> {
                match name {
                    #(#from_name_arms)*
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl ::norm::ToValue for #name {
            fn to_value(&self) -> ::norm::Value {
                ::norm::Value::Text(
                    ::std::string::ToString::to_string(::norm::DbEnum::variant_name(self)),
                )
            }
        }

        impl ::norm::FromValue for #name {
            fn from_value(value: ::norm::Value) -> ::norm::NormResult<Self> {
                match value {
                    ::norm::Value::Text(s) => {
                        <Self as ::norm::DbEnum>::from_variant_name(&s).ok_or_else(|| {
                            ::norm::NormError::mapping(::std::format!(
                                "Enum value does not exist. value:{}",
                                s
                            ))
                        })
                    }
                    other => ::std::result::Result::Err(
                        ::norm::NormError::conversion(#type_name, other.kind()),
                    ),
                }
            }
        }

        impl ::norm::ColumnType for #name {
            fn data_type() -> ::norm::DataType {
                ::norm::DataType::Text
            }
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenameAll {
    None,
    Lower,
    Upper,
    Snake,
    ScreamingSnake,
    Kebab,
    Camel,
    Pascal,
}

impl RenameAll {
    fn apply(self, ident: &str) -> String {
        match self {
            RenameAll::None => ident.to_string(),
            RenameAll::Lower => ident.to_lowercase(),
            RenameAll::Upper => ident.to_uppercase(),
            RenameAll::Snake => ident.to_snake_case(),
            RenameAll::ScreamingSnake => ident.to_shouty_snake_case(),
            RenameAll::Kebab => ident.to_kebab_case(),
            RenameAll::Camel => ident.to_lower_camel_case(),
            RenameAll::Pascal => ident.to_upper_camel_case(),
        }
    }
}

/// Parse `#[orm(rename_all = "...")]` from the enum's attributes.
fn parse_rename_all(attrs: &[Attribute]) -> Result<RenameAll> {
    let mut out = RenameAll::None;
    for attr in attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                let lit: LitStr = meta.value()?.parse()?;
                out = match lit.value().as_str() {
                    "lowercase" => RenameAll::Lower,
                    "UPPERCASE" => RenameAll::Upper,
                    "snake_case" => RenameAll::Snake,
                    "SCREAMING_SNAKE_CASE" => RenameAll::ScreamingSnake,
                    "kebab-case" => RenameAll::Kebab,
                    "camelCase" => RenameAll::Camel,
                    "PascalCase" => RenameAll::Pascal,
                    _ => {
                        return Err(syn::Error::new_spanned(lit, "unsupported rename_all style"));
                    }
                };
                Ok(())
            } else {
                Err(meta.error("unknown DbEnum attribute"))
            }
        })?;
    }
    Ok(out)
}

/// Parse `#[orm(rename = "...")]` from a variant's attributes.
fn parse_rename(attrs: &[Attribute]) -> Result<Option<String>> {
    let mut out = None;
    for attr in attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                out = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("unknown DbEnum variant attribute"))
            }
        })?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn rename_all_styles() {
        assert_eq!(RenameAll::None.apply("InProgress"), "InProgress");
        assert_eq!(RenameAll::Snake.apply("InProgress"), "in_progress");
        assert_eq!(RenameAll::ScreamingSnake.apply("InProgress"), "IN_PROGRESS");
        assert_eq!(RenameAll::Kebab.apply("InProgress"), "in-progress");
        assert_eq!(RenameAll::Camel.apply("InProgress"), "inProgress");
        assert_eq!(RenameAll::Lower.apply("InProgress"), "inprogress");
    }

    #[test]
    fn rejects_data_variants() {
        let input: DeriveInput = parse_quote! {
            enum Shape { Circle(f64), Square }
        };
        assert!(expand(input).is_err());
    }

    #[test]
    fn rejects_structs_and_empty_enums() {
        let input: DeriveInput = parse_quote! { struct Status; };
        assert!(expand(input).is_err());
        let input: DeriveInput = parse_quote! { enum Never {} };
        assert!(expand(input).is_err());
    }

    #[test]
    fn rejects_colliding_names() {
        let input: DeriveInput = parse_quote! {
            #[orm(rename_all = "lowercase")]
            enum Status { Active, #[orm(rename = "active")] Enabled }
        };
        assert!(expand(input).is_err());
    }

    #[test]
    fn variant_rename_wins() {
        let input: DeriveInput = parse_quote! {
            #[orm(rename_all = "snake_case")]
            enum Status { InProgress, #[orm(rename = "DONE")] Done }
        };
        let tokens = expand(input).unwrap().to_string();
        assert!(tokens.contains("\"in_progress\""));
        assert!(tokens.contains("\"DONE\""));
    }
}
