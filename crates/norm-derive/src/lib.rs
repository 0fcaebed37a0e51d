//! Derive macros for norm
//!
//! Provides `#[derive(Entity)]` and `#[derive(DbEnum)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod common;
mod db_enum;
mod entity;

/// Derive `Entity` (and `FromRow`) for a struct with named fields.
///
/// # Example
///
/// ```ignore
/// use norm::{Entity, IntListConverter};
///
/// #[derive(Debug, Default, Entity)]
/// #[orm(table = "people", schema = "crm")]
/// struct Person {
///     #[orm(id, generated)]
///     id: i64,
///     #[orm(column = "full_name", length = 100, nullable = false)]
///     name: String,
///     #[orm(enumerated = "ordinal")]
///     status: Status,
///     #[orm(converter = "IntListConverter")]
///     scores: Vec<i32>,
///     #[orm(transient)]
///     cache: Option<String>,
/// }
/// ```
///
/// # Struct attributes
///
/// - `#[orm(table = "name")]` - Table name (defaults to the struct name)
/// - `#[orm(schema = "name")]` - Schema qualifier
/// - `#[orm(column_order = "a,b,c")]` - Column order; unlisted columns are not mapped
/// - `#[orm(accessor(name = "x", ty = "T", get = "x", set = "set_x"))]` - A
///   property reached through methods rather than a field (`set` optional;
///   also accepts `column`, `id`, `generated`)
///
/// # Field attributes
///
/// - `#[orm(id)]` - Primary key column (repeat for composite keys)
/// - `#[orm(generated)]` - Assigned by the database on insert
/// - `#[orm(transient)]` - Not mapped
/// - `#[orm(column = "name")]` - Column name override
/// - `#[orm(length = N, precision = N, scale = N, unique, nullable = false, definition = "...")]`
/// - `#[orm(enumerated)]` / `#[orm(enumerated = "ordinal")]` - `DbEnum` field stored by name or ordinal
/// - `#[orm(converter = "Path")]` - `AttributeConverter` (constructed with `Default`)
/// - `#[orm(serializer = "Path")]` - `DbSerializer` (constructed with `Default`)
/// - `#[orm(get = "method", set = "method")]` - Use accessor methods instead of the field
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `DbEnum` for a unit-only enum.
///
/// Also implements `ToValue`, `FromValue` and `ColumnType`, storing the
/// variant name as text.
///
/// # Attributes
///
/// - `#[orm(rename_all = "snake_case")]` - Case conversion for stored names
///   (`lowercase`, `UPPERCASE`, `snake_case`, `SCREAMING_SNAKE_CASE`,
///   `kebab-case`, `camelCase`, `PascalCase`)
/// - `#[orm(rename = "name")]` on a variant - Explicit stored name
#[proc_macro_derive(DbEnum, attributes(orm))]
pub fn derive_db_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    db_enum::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
