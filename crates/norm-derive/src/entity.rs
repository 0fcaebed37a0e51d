//! `#[derive(Entity)]`: the property declarations a descriptor is built from.

mod attrs;

use crate::common::syn_types::enum_type;
use attrs::{ConstraintAttrs, EnumMode, FieldAttrs, parse_field_attrs, parse_struct_attrs};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let struct_attrs = parse_struct_attrs(&input.attrs)?;

    let mut steps = Vec::new();
    if let Some(table) = &struct_attrs.table {
        steps.push(quote! { let builder = builder.table(#table); });
    }
    if let Some(schema) = &struct_attrs.schema {
        steps.push(quote! { let builder = builder.schema(#schema); });
    }
    if let Some(order) = &struct_attrs.column_order {
        steps.push(quote! { let builder = builder.column_order([#(#order),*]); });
    }

    for field in fields {
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.transient {
            continue;
        }
        let Some(ident) = &field.ident else {
            continue;
        };
        let def = field_property(ident, &field.ty, &attrs);
        steps.push(quote! { let builder = builder.property(#def); });
    }

    for accessor in &struct_attrs.accessors {
        let member = accessor.name.value();
        let ty = &accessor.ty;
        let get = &accessor.get;
        let setter = match &accessor.set {
            Some(set) => quote! {
                ::std::option::Option::Some(|r: &mut Self, v: ::norm::Value| {
                    r.#set(::norm::FromValue::from_value(v)?);
                    ::std::result::Result::Ok(())
                })
            },
            None => quote! { ::std::option::Option::None },
        };
        let mut def = quote! {
            ::norm::PropertyDef::accessor(
                #member,
                <#ty as ::norm::ColumnType>::data_type(),
                |r: &Self| ::norm::ToValue::to_value(&r.#get()),
                #setter,
            )
        };
        if let Some(column) = &accessor.column {
            def = quote! { #def.column(#column) };
        }
        if accessor.is_id {
            def = quote! { #def.primary_key() };
        }
        if accessor.generated {
            def = quote! { #def.generated() };
        }
        steps.push(quote! { let builder = builder.property(#def); });
    }

    let type_name = name.to_string();

    // Generic entities have no single type to register for warm-up.
    let registration = if input.generics.params.is_empty() {
        quote! {
            const _: () = {
                fn __norm_warm() -> ::norm::NormResult<()> {
                    <#name as ::norm::Entity>::descriptor().map(|_| ())
                }
                ::norm::inventory::submit! {
                    ::norm::EntityRegistration {
                        type_name: #type_name,
                        warm: __norm_warm,
                    }
                }
            };
        }
    } else {
        quote! {}
    };

    Ok(quote! {
        impl #impl_generics ::norm::Entity for #name #ty_generics #where_clause {
            fn describe(
                builder: ::norm::DescriptorBuilder<Self>,
            ) -> ::norm::NormResult<::norm::DescriptorBuilder<Self>> {
                #(#steps)*
                ::std::result::Result::Ok(builder)
            }
        }

        impl #impl_generics ::norm::FromRow for #name #ty_generics #where_clause {
            fn table_meta() -> ::norm::NormResult<
                ::std::option::Option<::std::sync::Arc<::norm::TableMeta>>,
            > {
                ::norm::row::entity_table_meta::<Self>()
            }

            fn from_row(row: ::norm::Row) -> ::norm::NormResult<Self> {
                ::norm::row::decode_entity::<Self>(row)
            }
        }

        #registration
    })
}

fn field_property(ident: &syn::Ident, ty: &syn::Type, attrs: &FieldAttrs) -> TokenStream {
    let member = ident.to_string();
    let data_type = if attrs.converter.is_some() || attrs.serializer.is_some() {
        quote! { ::norm::DataType::Text }
    } else {
        quote! { <#ty as ::norm::ColumnType>::data_type() }
    };

    let mut def = match (&attrs.get, &attrs.set) {
        (None, None) => quote! {
            ::norm::PropertyDef::field(
                #member,
                #data_type,
                |r: &Self| ::norm::ToValue::to_value(&r.#ident),
                |r: &mut Self, v: ::norm::Value| {
                    r.#ident = ::norm::FromValue::from_value(v)?;
                    ::std::result::Result::Ok(())
                },
            )
        },
        (get, set) => {
            let getter = match get {
                Some(get) => quote! { |r: &Self| ::norm::ToValue::to_value(&r.#get()) },
                None => quote! { |r: &Self| ::norm::ToValue::to_value(&r.#ident) },
            };
            let setter = match set {
                Some(set) => quote! {
                    ::std::option::Option::Some(|r: &mut Self, v: ::norm::Value| {
                        r.#set(::norm::FromValue::from_value(v)?);
                        ::std::result::Result::Ok(())
                    })
                },
                None => quote! { ::std::option::Option::None },
            };
            quote! {
                ::norm::PropertyDef::accessor(
                    #member,
                    #data_type,
                    #getter,
                    #setter,
                )
            }
        }
    };

    if let Some(column) = &attrs.column {
        def = quote! { #def.column(#column) };
    }
    if attrs.is_id {
        def = quote! { #def.primary_key() };
    }
    if attrs.generated {
        def = quote! { #def.generated() };
    }
    if let Some(mode) = attrs.enumerated {
        let enum_ty = enum_type(ty);
        let encoding = match mode {
            EnumMode::Name => quote! { ::norm::EnumEncoding::Name },
            EnumMode::Ordinal => quote! { ::norm::EnumEncoding::Ordinal },
        };
        def = quote! {
            #def.enumerated(<#enum_ty as ::norm::DbEnum>::enum_info(), #encoding)
        };
    }
    if let Some(path) = &attrs.converter {
        def = quote! {
            #def.converter(::std::sync::Arc::new(<#path as ::std::default::Default>::default()))
        };
    }
    if let Some(path) = &attrs.serializer {
        def = quote! {
            #def.serializer(::std::sync::Arc::new(<#path as ::std::default::Default>::default()))
        };
    }
    if !attrs.constraints.is_empty() {
        let constraints = constraints(&attrs.constraints);
        def = quote! { #def.constraints(#constraints) };
    }
    def
}

fn constraints(c: &ConstraintAttrs) -> TokenStream {
    let mut out = quote! { ::norm::ColumnConstraints::new() };
    if let Some(length) = c.length {
        out = quote! { #out.length(#length) };
    }
    if let Some(precision) = c.precision {
        out = quote! { #out.precision(#precision) };
    }
    if let Some(scale) = c.scale {
        out = quote! { #out.scale(#scale) };
    }
    if let Some(unique) = c.unique {
        out = quote! { #out.unique(#unique) };
    }
    if let Some(nullable) = c.nullable {
        out = quote! { #out.nullable(#nullable) };
    }
    if let Some(definition) = &c.definition {
        out = quote! { #out.definition(#definition) };
    }
    out
}
