//! Entity descriptors.
//!
//! A descriptor is built once per record type from the declarations in
//! [`Entity::describe`] (normally generated by `#[derive(Entity)]`) and then
//! cached for the life of the process by the [`registry`](crate::registry).

mod meta;
mod property;

#[cfg(test)]
mod tests;

pub use meta::{SqlTemplate, TableMeta};
pub use property::{
    Accessor, ColumnConstraints, ColumnMeta, ColumnType, DataType, Getter, Property,
    PropertyDef, Setter,
};

use crate::error::{NormError, NormResult};
use crate::row::Row;
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A record type mapped to a table.
///
/// Implemented by `#[derive(Entity)]`; hand-written impls declare their
/// properties on the builder:
///
/// ```ignore
/// impl Entity for Person {
///     fn describe(b: DescriptorBuilder<Self>) -> NormResult<DescriptorBuilder<Self>> {
///         Ok(b.table("people")
///             .property(PropertyDef::field("id", DataType::BigInt, |p| p.id.to_value(),
///                 |p, v| { p.id = FromValue::from_value(v)?; Ok(()) }).primary_key().generated()))
///     }
/// }
/// ```
pub trait Entity: Default + Send + Sync + 'static {
    fn describe(builder: DescriptorBuilder<Self>) -> NormResult<DescriptorBuilder<Self>>;

    /// The cached descriptor for this type.
    fn descriptor() -> NormResult<Arc<EntityDescriptor<Self>>> {
        crate::registry::descriptor_of::<Self>()
    }
}

/// Collects property declarations and validates them into an [`EntityDescriptor`].
pub struct DescriptorBuilder<T> {
    type_name: &'static str,
    table: Option<String>,
    schema: Option<String>,
    column_order: Option<Vec<String>>,
    properties: Vec<PropertyDef<T>>,
}

impl<T> DescriptorBuilder<T> {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            table: None,
            schema: None,
            column_order: None,
            properties: Vec::new(),
        }
    }

    /// Builder named after `T`'s simple type name.
    pub fn for_type() -> Self {
        Self::new(simple_type_name::<T>())
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Explicit table name. Blank names fall back to the type name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = non_blank(table.into());
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = non_blank(schema.into());
        self
    }

    /// Reorder columns to this list. Columns not listed are dropped.
    pub fn column_order<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column_order = Some(columns.into_iter().map(|c| c.into().trim().to_string()).collect());
        self
    }

    pub fn property(mut self, property: PropertyDef<T>) -> Self {
        self.properties.push(property);
        self
    }

    pub fn build(self) -> NormResult<EntityDescriptor<T>> {
        let type_name = self.type_name;

        let mut members = HashSet::new();
        let mut retained = Vec::with_capacity(self.properties.len());
        for def in self.properties {
            if def.transient {
                continue;
            }
            if !members.insert(def.member) {
                return Err(NormError::DuplicateProperty {
                    column: def.member.to_string(),
                    type_name,
                });
            }
            retained.push(def);
        }

        if let Some(order) = &self.column_order {
            let mut ordered = Vec::with_capacity(order.len());
            for column in order {
                if let Some(pos) = retained.iter().position(|d| d.column_name() == column) {
                    ordered.push(retained.remove(pos));
                } else if ordered.iter().any(|d: &PropertyDef<T>| d.column_name() == column) {
                    return Err(NormError::DuplicateProperty {
                        column: column.clone(),
                        type_name,
                    });
                }
            }
            if !retained.is_empty() {
                tracing::debug!(
                    target: "norm.registry",
                    entity = type_name,
                    dropped = ?retained.iter().map(|d| d.column_name()).collect::<Vec<_>>(),
                    "columns outside the declared column order are not mapped"
                );
            }
            retained = ordered;
        }

        let mut properties = IndexMap::with_capacity(retained.len());
        for def in retained {
            let property = def.into_property();
            let column = property.meta.name.clone();
            if properties.contains_key(&column) {
                return Err(NormError::DuplicateProperty { column, type_name });
            }
            properties.insert(column, property);
        }

        let base = self.table.unwrap_or_else(|| type_name.to_string());
        let table = match self.schema {
            Some(schema) => format!("{schema}.{base}"),
            None => base,
        };

        let columns = properties.values().map(|p| p.meta.clone()).collect();
        let meta = Arc::new(TableMeta::new(type_name, table, columns));

        Ok(EntityDescriptor { meta, properties })
    }
}

fn non_blank(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Last path segment of `T`'s type name, without generic arguments.
pub fn simple_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Encoded column values of one record, by column name.
pub trait ColumnValues {
    fn column_value(&self, column: &str) -> NormResult<Value>;
}

impl ColumnValues for IndexMap<String, Value> {
    fn column_value(&self, column: &str) -> NormResult<Value> {
        self.get(column)
            .cloned()
            .ok_or_else(|| NormError::NoSuchProperty { name: column.to_string() })
    }
}

/// Validated, immutable mapping between `T` and its table.
pub struct EntityDescriptor<T> {
    meta: Arc<TableMeta>,
    properties: IndexMap<String, Property<T>>,
}

impl<T> fmt::Debug for EntityDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("table", &self.meta.table())
            .field("properties", &self.properties.values().collect::<Vec<_>>())
            .finish()
    }
}

impl<T> EntityDescriptor<T> {
    pub fn meta(&self) -> &TableMeta {
        &self.meta
    }

    pub fn meta_arc(&self) -> Arc<TableMeta> {
        Arc::clone(&self.meta)
    }

    pub fn table(&self) -> &str {
        self.meta.table()
    }

    /// Properties in column order.
    pub fn properties(&self) -> impl Iterator<Item = &Property<T>> {
        self.properties.values()
    }

    pub fn property(&self, column: &str) -> Option<&Property<T>> {
        self.properties.get(column)
    }

    fn property_strict(&self, column: &str) -> NormResult<&Property<T>> {
        self.properties
            .get(column)
            .ok_or_else(|| NormError::NoSuchProperty { name: column.to_string() })
    }

    /// Encoded value of one column.
    pub fn get_value(&self, record: &T, column: &str) -> NormResult<Value> {
        self.property_strict(column)?.read(record)
    }

    /// Decode `value` and write it into the property mapped to `column`.
    pub fn put_value(&self, record: &mut T, column: &str, value: Value) -> NormResult<()> {
        self.property_strict(column)?.write(record, value)
    }

    /// Like [`put_value`](Self::put_value) but unknown columns are ignored.
    /// Returns whether a property was written.
    pub fn put_value_lenient(&self, record: &mut T, column: &str, value: Value) -> NormResult<bool> {
        match self.properties.get(column) {
            Some(property) => property.write(record, value).map(|()| true),
            None => Ok(false),
        }
    }

    /// A [`ColumnValues`] view over `record`.
    pub fn values<'a>(&'a self, record: &'a T) -> EntityValues<'a, T> {
        EntityValues { descriptor: self, record }
    }

    fn args_for(&self, record: &T, columns: &[String]) -> NormResult<Vec<Value>> {
        columns.iter().map(|c| self.get_value(record, c)).collect()
    }

    /// Values for the insert columns, in order.
    pub fn insert_args(&self, record: &T) -> NormResult<Vec<Value>> {
        self.args_for(record, self.meta.insert_columns())
    }

    /// Values for the update columns followed by the key values.
    pub fn update_args(&self, record: &T) -> NormResult<Vec<Value>> {
        let mut args = self.args_for(record, self.meta.update_columns())?;
        args.extend(self.key_args(record)?);
        Ok(args)
    }

    pub fn key_args(&self, record: &T) -> NormResult<Vec<Value>> {
        self.args_for(record, self.meta.primary_key_names())
    }

    /// Write generated keys from an executed insert back into `record`.
    ///
    /// A single-column key row is assigned to the first target column whatever
    /// the driver called it. Wider rows are matched by name, exact first and
    /// then case-insensitively. Targets default to the generated columns.
    pub fn populate_generated_keys(
        &self,
        record: &mut T,
        keys: &Row,
        requested: &[String],
    ) -> NormResult<usize> {
        let targets = if requested.is_empty() {
            self.meta.generated_column_names()
        } else {
            requested
        };
        if keys.is_empty() || targets.is_empty() {
            return Ok(0);
        }

        if keys.len() == 1 {
            let value = keys.values()[0].clone();
            self.put_value(record, &targets[0], value)?;
            return Ok(1);
        }

        let mut written = 0;
        for target in targets {
            let value = keys
                .get_by_label(target)
                .or_else(|| keys.get_by_label_ignore_case(target));
            if let Some(value) = value {
                self.put_value(record, target, value.clone())?;
                written += 1;
            }
        }
        Ok(written)
    }
}

/// Encoded column values read on demand from a record.
pub struct EntityValues<'a, T> {
    descriptor: &'a EntityDescriptor<T>,
    record: &'a T,
}

impl<T> ColumnValues for EntityValues<'_, T> {
    fn column_value(&self, column: &str) -> NormResult<Value> {
        self.descriptor.get_value(self.record, column)
    }
}
