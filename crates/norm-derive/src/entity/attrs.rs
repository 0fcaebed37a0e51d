//! Attribute parsing for the Entity derive macro.
//!
//! Handles struct-level and field-level `#[orm(...)]` attributes.

use syn::meta::ParseNestedMeta;
use syn::{Attribute, LitBool, LitInt, LitStr, Result};

/// Struct-level settings.
#[derive(Default)]
pub(super) struct StructAttrs {
    pub table: Option<String>,
    pub schema: Option<String>,
    pub column_order: Option<Vec<String>>,
    pub accessors: Vec<AccessorAttr>,
}

/// A method-backed property declared on the struct.
pub(super) struct AccessorAttr {
    pub name: LitStr,
    pub ty: syn::Type,
    pub get: syn::Ident,
    pub set: Option<syn::Ident>,
    pub column: Option<String>,
    pub is_id: bool,
    pub generated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum EnumMode {
    Name,
    Ordinal,
}

/// Column DDL settings; `None` fields keep the runtime defaults.
#[derive(Default)]
pub(super) struct ConstraintAttrs {
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub unique: Option<bool>,
    pub nullable: Option<bool>,
    pub definition: Option<String>,
}

impl ConstraintAttrs {
    pub fn is_empty(&self) -> bool {
        self.length.is_none()
            && self.precision.is_none()
            && self.scale.is_none()
            && self.unique.is_none()
            && self.nullable.is_none()
            && self.definition.is_none()
    }
}

/// Field-level settings.
#[derive(Default)]
pub(super) struct FieldAttrs {
    pub is_id: bool,
    pub generated: bool,
    pub transient: bool,
    pub column: Option<String>,
    pub enumerated: Option<EnumMode>,
    pub converter: Option<syn::Path>,
    pub serializer: Option<syn::Path>,
    pub get: Option<syn::Ident>,
    pub set: Option<syn::Ident>,
    pub constraints: ConstraintAttrs,
}

fn lit_str(meta: &ParseNestedMeta) -> Result<LitStr> {
    meta.value()?.parse()
}

fn lit_u32(meta: &ParseNestedMeta) -> Result<u32> {
    let lit: LitInt = meta.value()?.parse()?;
    lit.base10_parse()
}

/// `flag` or `flag = true|false`.
fn flag(meta: &ParseNestedMeta) -> Result<bool> {
    if meta.input.peek(syn::Token![=]) {
        let lit: LitBool = meta.value()?.parse()?;
        Ok(lit.value)
    } else {
        Ok(true)
    }
}

fn ident(lit: &LitStr) -> Result<syn::Ident> {
    lit.parse()
}

pub(super) fn parse_struct_attrs(attrs: &[Attribute]) -> Result<StructAttrs> {
    let mut out = StructAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                out.table = Some(lit_str(&meta)?.value());
            } else if meta.path.is_ident("schema") {
                out.schema = Some(lit_str(&meta)?.value());
            } else if meta.path.is_ident("column_order") {
                let list = lit_str(&meta)?.value();
                out.column_order = Some(
                    list.split(',')
                        .map(|c| c.trim().to_string())
                        .filter(|c| !c.is_empty())
                        .collect(),
                );
            } else if meta.path.is_ident("accessor") {
                out.accessors.push(parse_accessor(&meta)?);
            } else {
                return Err(meta.error("unknown struct-level orm attribute"));
            }
            Ok(())
        })?;
    }
    Ok(out)
}

fn parse_accessor(meta: &ParseNestedMeta) -> Result<AccessorAttr> {
    let mut name = None;
    let mut ty = None;
    let mut get = None;
    let mut set = None;
    let mut column = None;
    let mut is_id = false;
    let mut generated = false;

    meta.parse_nested_meta(|inner| {
        if inner.path.is_ident("name") {
            name = Some(lit_str(&inner)?);
        } else if inner.path.is_ident("ty") {
            ty = Some(lit_str(&inner)?.parse::<syn::Type>()?);
        } else if inner.path.is_ident("get") {
            get = Some(ident(&lit_str(&inner)?)?);
        } else if inner.path.is_ident("set") {
            set = Some(ident(&lit_str(&inner)?)?);
        } else if inner.path.is_ident("column") {
            column = Some(lit_str(&inner)?.value());
        } else if inner.path.is_ident("id") {
            is_id = flag(&inner)?;
        } else if inner.path.is_ident("generated") {
            generated = flag(&inner)?;
        } else {
            return Err(inner.error("unknown accessor attribute"));
        }
        Ok(())
    })?;

    let name = name.ok_or_else(|| meta.error("accessor requires `name = \"...\"`"))?;
    let ty = ty.ok_or_else(|| meta.error("accessor requires `ty = \"...\"`"))?;
    let get = match get {
        Some(get) => get,
        None => ident(&name)?,
    };
    Ok(AccessorAttr {
        name,
        ty,
        get,
        set,
        column,
        is_id,
        generated,
    })
}

pub(super) fn parse_field_attrs(attrs: &[Attribute]) -> Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                out.is_id = flag(&meta)?;
            } else if meta.path.is_ident("generated") {
                out.generated = flag(&meta)?;
            } else if meta.path.is_ident("transient") {
                out.transient = flag(&meta)?;
            } else if meta.path.is_ident("column") {
                out.column = Some(lit_str(&meta)?.value());
            } else if meta.path.is_ident("enumerated") {
                out.enumerated = Some(if meta.input.peek(syn::Token![=]) {
                    let lit = lit_str(&meta)?;
                    match lit.value().to_ascii_lowercase().as_str() {
                        "ordinal" => EnumMode::Ordinal,
                        "name" | "string" => EnumMode::Name,
                        _ => {
                            return Err(syn::Error::new_spanned(
                                lit,
                                "enumerated must be \"name\" or \"ordinal\"",
                            ));
                        }
                    }
                } else {
                    EnumMode::Name
                });
            } else if meta.path.is_ident("converter") {
                out.converter = Some(lit_str(&meta)?.parse()?);
            } else if meta.path.is_ident("serializer") {
                out.serializer = Some(lit_str(&meta)?.parse()?);
            } else if meta.path.is_ident("get") {
                out.get = Some(ident(&lit_str(&meta)?)?);
            } else if meta.path.is_ident("set") {
                out.set = Some(ident(&lit_str(&meta)?)?);
            } else if meta.path.is_ident("length") {
                out.constraints.length = Some(lit_u32(&meta)?);
            } else if meta.path.is_ident("precision") {
                out.constraints.precision = Some(lit_u32(&meta)?);
            } else if meta.path.is_ident("scale") {
                out.constraints.scale = Some(lit_u32(&meta)?);
            } else if meta.path.is_ident("unique") {
                out.constraints.unique = Some(flag(&meta)?);
            } else if meta.path.is_ident("nullable") {
                out.constraints.nullable = Some(flag(&meta)?);
            } else if meta.path.is_ident("definition") {
                out.constraints.definition = Some(lit_str(&meta)?.value());
            } else {
                return Err(meta.error("unknown field-level orm attribute"));
            }
            Ok(())
        })?;
    }

    let codecs = [
        out.enumerated.is_some(),
        out.converter.is_some(),
        out.serializer.is_some(),
    ];
    if codecs.iter().filter(|set| **set).count() > 1 {
        return Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            "a field takes at most one of enumerated, converter and serializer",
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn parses_field_flags_and_values() {
        let field: syn::Field = parse_quote! {
            #[orm(id, generated, column = "person_id", length = 40, nullable = false)]
            id: i64
        };
        let attrs = parse_field_attrs(&field.attrs).unwrap();
        assert!(attrs.is_id);
        assert!(attrs.generated);
        assert_eq!(attrs.column.as_deref(), Some("person_id"));
        assert_eq!(attrs.constraints.length, Some(40));
        assert_eq!(attrs.constraints.nullable, Some(false));
        assert!(attrs.constraints.unique.is_none());
    }

    #[test]
    fn parses_enum_modes() {
        let field: syn::Field = parse_quote! { #[orm(enumerated = "ordinal")] s: Status };
        assert_eq!(
            parse_field_attrs(&field.attrs).unwrap().enumerated,
            Some(EnumMode::Ordinal)
        );
        let field: syn::Field = parse_quote! { #[orm(enumerated)] s: Status };
        assert_eq!(
            parse_field_attrs(&field.attrs).unwrap().enumerated,
            Some(EnumMode::Name)
        );
        let field: syn::Field = parse_quote! { #[orm(enumerated = "bits")] s: Status };
        assert!(parse_field_attrs(&field.attrs).is_err());
    }

    #[test]
    fn rejects_two_codecs() {
        let field: syn::Field = parse_quote! {
            #[orm(enumerated, converter = "IntListConverter")]
            s: Status
        };
        assert!(parse_field_attrs(&field.attrs).is_err());
    }

    #[test]
    fn parses_struct_attrs() {
        let input: syn::DeriveInput = parse_quote! {
            #[orm(table = "people", schema = "crm", column_order = "name, id")]
            #[orm(accessor(name = "nick", ty = "String", set = "set_nick"))]
            struct Person { id: i64, name: String }
        };
        let attrs = parse_struct_attrs(&input.attrs).unwrap();
        assert_eq!(attrs.table.as_deref(), Some("people"));
        assert_eq!(attrs.schema.as_deref(), Some("crm"));
        assert_eq!(
            attrs.column_order,
            Some(vec!["name".to_string(), "id".to_string()])
        );
        assert_eq!(attrs.accessors.len(), 1);
        let accessor = &attrs.accessors[0];
        assert_eq!(accessor.get, "nick");
        assert_eq!(accessor.set.as_ref().map(ToString::to_string).as_deref(), Some("set_nick"));
    }

    #[test]
    fn rejects_unknown_keys() {
        let input: syn::DeriveInput = parse_quote! {
            #[orm(tabel = "people")]
            struct Person { id: i64 }
        };
        assert!(parse_struct_attrs(&input.attrs).is_err());
    }
}
