//! Result rows and decoding targets.

use crate::descriptor::{Entity, TableMeta};
use crate::error::{NormError, NormResult};
use crate::value::{FromValue, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use uuid::Uuid;

/// One result row: column labels shared across the result set, values by position.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Convenience for building rows by hand.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) =
            pairs.into_iter().map(|(c, v)| (c.into(), v)).unzip();
        Self::new(columns.into(), values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn get_by_label(&self, label: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == label)
            .and_then(|i| self.values.get(i))
    }

    pub fn get_by_label_ignore_case(&self, label: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(label))
            .and_then(|i| self.values.get(i))
    }

    /// Decode one column into a Rust type.
    pub fn try_get<T: FromValue>(&self, label: &str) -> NormResult<T> {
        let value = self
            .get_by_label(label)
            .cloned()
            .ok_or_else(|| NormError::NoSuchProperty { name: label.to_string() })?;
        T::from_value(value).map_err(|e| NormError::decode(label, e.to_string()))
    }

    /// `(label, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Generic key-value decoding target: every column by label, in result order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(pub IndexMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.0
    }
}

impl Deref for Record {
    type Target = IndexMap<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Record {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Anything a result row can be decoded into.
pub trait FromRow: Sized {
    /// Mapping used to build a `select` when the query gives no literal SQL.
    /// `None` for targets without declared columns.
    fn table_meta() -> NormResult<Option<Arc<TableMeta>>> {
        Ok(None)
    }

    fn from_row(row: Row) -> NormResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: Row) -> NormResult<Self> {
        Ok(row)
    }
}

impl FromRow for Record {
    fn from_row(row: Row) -> NormResult<Self> {
        let Row { columns, values } = row;
        Ok(Record(columns.iter().cloned().zip(values).collect()))
    }
}

macro_rules! impl_scalar_from_row {
    ($($ty:ty),* $(,)?) => {$(
        impl FromRow for $ty {
            fn from_row(row: Row) -> NormResult<Self> {
                scalar(row)
            }
        }
    )*};
}

impl_scalar_from_row!(
    bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, String, Decimal, NaiveDate,
    NaiveDateTime, DateTime<Utc>, Uuid, serde_json::Value, Value,
);

impl<T: FromValue> FromRow for Option<T> {
    fn from_row(row: Row) -> NormResult<Self> {
        scalar(row)
    }
}

fn scalar<T: FromValue>(row: Row) -> NormResult<T> {
    let label = row.columns.first().cloned().unwrap_or_default();
    let value = row
        .values
        .into_iter()
        .next()
        .ok_or_else(|| NormError::decode(label.clone(), "row has no columns"))?;
    T::from_value(value).map_err(|e| NormError::decode(label, e.to_string()))
}

/// Build an entity from a row through its descriptor. Columns that map to no
/// property are ignored.
pub fn decode_entity<T: Entity>(row: Row) -> NormResult<T> {
    let descriptor = T::descriptor()?;
    let mut record = T::default();
    let Row { columns, values } = row;
    for (label, value) in columns.iter().zip(values) {
        descriptor.put_value_lenient(&mut record, label, value)?;
    }
    Ok(record)
}

/// The table mapping of an entity, for [`FromRow::table_meta`].
pub fn entity_table_meta<T: Entity>() -> NormResult<Option<Arc<TableMeta>>> {
    T::descriptor().map(|d| Some(d.meta_arc()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        Row::from_pairs([("id", Value::I64(7)), ("Name", Value::Text("bob".into()))])
    }

    #[test]
    fn label_lookup() {
        let row = row();
        assert_eq!(row.get_by_label("id"), Some(&Value::I64(7)));
        assert_eq!(row.get_by_label("name"), None);
        assert_eq!(
            row.get_by_label_ignore_case("name"),
            Some(&Value::Text("bob".into()))
        );
        assert_eq!(row.try_get::<i32>("id").unwrap(), 7);
        assert!(row.try_get::<i32>("missing").is_err());
    }

    #[test]
    fn scalar_takes_first_column() {
        assert_eq!(i64::from_row(row()).unwrap(), 7);
        assert!(String::from_row(Row::from_pairs(Vec::<(String, Value)>::new())).is_err());
        assert_eq!(Option::<i32>::from_row(Row::from_pairs([("n", Value::Null)])).unwrap(), None);
    }

    #[test]
    fn record_keeps_every_column() {
        let record = Record::from_row(row()).unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("Name"), Some(&Value::Text("bob".into())));
        assert_eq!(record.keys().next().map(String::as_str), Some("id"));
    }
}
