use crate::codec::{AttributeConverter, DbSerializer, EnumEncoding, EnumInfo, ValueCodec};
use crate::error::{NormError, NormResult};
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Logical column type used when generating `create table` statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,
    BigInt,
    Double,
    Float,
    Decimal,
    DateTime,
    Boolean,
    Text,
}

/// Maps a Rust field type to its [`DataType`].
pub trait ColumnType {
    fn data_type() -> DataType;
}

macro_rules! impl_column_type {
    ($data_type:ident: $($ty:ty),* $(,)?) => {$(
        impl ColumnType for $ty {
            fn data_type() -> DataType {
                DataType::$data_type
            }
        }
    )*};
}

impl_column_type!(Integer: i8, i16, i32, u8, u16);
impl_column_type!(BigInt: i64, u32, u64);
impl_column_type!(Double: f64);
impl_column_type!(Float: f32);
impl_column_type!(Decimal: Decimal);
impl_column_type!(DateTime: NaiveDateTime, NaiveDate, DateTime<Utc>);
impl_column_type!(Boolean: bool);
impl_column_type!(
    Text: String, Uuid, serde_json::Value, Vec<u8>, Vec<i32>, Vec<i64>, Vec<f64>, Vec<bool>,
    Vec<String>, Vec<Uuid>, Value,
);

impl<T: ColumnType> ColumnType for Option<T> {
    fn data_type() -> DataType {
        T::data_type()
    }
}

/// Column-level DDL settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnConstraints {
    /// `varchar` length.
    pub length: u32,
    /// `decimal` precision.
    pub precision: u32,
    /// `decimal` scale.
    pub scale: u32,
    pub unique: bool,
    pub nullable: bool,
    /// Raw column definition; replaces the mapped type entirely.
    pub definition: Option<String>,
}

impl Default for ColumnConstraints {
    fn default() -> Self {
        Self {
            length: 255,
            precision: 10,
            scale: 2,
            unique: false,
            nullable: true,
            definition: None,
        }
    }
}

impl ColumnConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    pub fn precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    pub fn scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }
}

/// Reads a property as an (unencoded) attribute value.
pub type Getter<T> = fn(&T) -> Value;
/// Writes a decoded attribute value into a property.
pub type Setter<T> = fn(&mut T, Value) -> NormResult<()>;

/// How a property is reached on the record. Exactly one strategy per property.
pub enum Accessor<T> {
    /// Direct field access.
    Field { get: Getter<T>, set: Setter<T> },
    /// Getter/setter method pair. A property without a setter is read-only:
    /// decoded columns for it are skipped.
    Methods {
        get: Getter<T>,
        set: Option<Setter<T>>,
    },
}

impl<T> Clone for Accessor<T> {
    fn clone(&self) -> Self {
        match self {
            Accessor::Field { get, set } => Accessor::Field { get: *get, set: *set },
            Accessor::Methods { get, set } => Accessor::Methods { get: *get, set: *set },
        }
    }
}

impl<T> fmt::Debug for Accessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Field { .. } => f.write_str("Field"),
            Accessor::Methods { set, .. } => {
                if set.is_some() {
                    f.write_str("Methods")
                } else {
                    f.write_str("Methods(read-only)")
                }
            }
        }
    }
}

impl<T> Accessor<T> {
    pub fn is_field(&self) -> bool {
        matches!(self, Accessor::Field { .. })
    }

    fn getter(&self) -> Getter<T> {
        match self {
            Accessor::Field { get, .. } | Accessor::Methods { get, .. } => *get,
        }
    }

    fn setter(&self) -> Option<Setter<T>> {
        match self {
            Accessor::Field { set, .. } => Some(*set),
            Accessor::Methods { set, .. } => *set,
        }
    }
}

/// Column information shared with dialects (no access to the record type).
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    /// Column name.
    pub name: String,
    /// Rust member name the column came from.
    pub member: &'static str,
    pub data_type: DataType,
    pub primary_key: bool,
    pub generated: bool,
    /// Explicit column settings, if any were declared.
    pub constraints: Option<ColumnConstraints>,
}

/// One mapped member of a record type.
pub struct Property<T> {
    pub(crate) meta: ColumnMeta,
    pub(crate) accessor: Accessor<T>,
    pub(crate) codec: ValueCodec,
}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("meta", &self.meta)
            .field("accessor", &self.accessor)
            .field("codec", &self.codec)
            .finish()
    }
}

impl<T> Property<T> {
    /// Column name.
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn meta(&self) -> &ColumnMeta {
        &self.meta
    }

    pub fn accessor(&self) -> &Accessor<T> {
        &self.accessor
    }

    pub fn codec(&self) -> &ValueCodec {
        &self.codec
    }

    pub fn is_primary_key(&self) -> bool {
        self.meta.primary_key
    }

    pub fn is_generated(&self) -> bool {
        self.meta.generated
    }

    /// Read the property and encode it for the executor.
    pub fn read(&self, record: &T) -> NormResult<Value> {
        let raw = (self.accessor.getter())(record);
        self.codec.encode(raw)
    }

    /// Decode a column value and write it into the record.
    pub fn write(&self, record: &mut T, value: Value) -> NormResult<()> {
        let Some(set) = self.accessor.setter() else {
            tracing::trace!(
                target: "norm.registry",
                column = %self.meta.name,
                "skipping write to read-only property"
            );
            return Ok(());
        };
        let decoded = self.codec.decode(value)?;
        set(record, decoded).map_err(|e| match e {
            NormError::Conversion { .. } => NormError::decode(&self.meta.name, e.to_string()),
            other => other,
        })
    }
}

/// Declaration of one property, consumed by
/// [`DescriptorBuilder`](super::DescriptorBuilder).
pub struct PropertyDef<T> {
    pub(crate) member: &'static str,
    pub(crate) column: Option<String>,
    pub(crate) data_type: DataType,
    pub(crate) accessor: Accessor<T>,
    pub(crate) primary_key: bool,
    pub(crate) generated: bool,
    pub(crate) transient: bool,
    pub(crate) codec: ValueCodec,
    pub(crate) constraints: Option<ColumnConstraints>,
}

impl<T> PropertyDef<T> {
    fn new(member: &'static str, data_type: DataType, accessor: Accessor<T>) -> Self {
        Self {
            member,
            column: None,
            data_type,
            accessor,
            primary_key: false,
            generated: false,
            transient: false,
            codec: ValueCodec::Identity,
            constraints: None,
        }
    }

    /// A property backed by a struct field.
    pub fn field(
        member: &'static str,
        data_type: DataType,
        get: Getter<T>,
        set: Setter<T>,
    ) -> Self {
        Self::new(member, data_type, Accessor::Field { get, set })
    }

    /// A property backed by a getter/setter pair.
    pub fn accessor(
        member: &'static str,
        data_type: DataType,
        get: Getter<T>,
        set: Option<Setter<T>>,
    ) -> Self {
        Self::new(member, data_type, Accessor::Methods { get, set })
    }

    /// Override the column name (defaults to the member name). Blank names are ignored.
    pub fn column(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let trimmed = name.trim();
        if !trimmed.is_empty() {
            self.column = Some(trimmed.to_string());
        }
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// The database assigns this column on insert.
    pub fn generated(mut self) -> Self {
        self.generated = true;
        self
    }

    /// Exclude the member from mapping entirely.
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    pub fn enumerated(mut self, info: EnumInfo, encoding: EnumEncoding) -> Self {
        self.codec = ValueCodec::enumerated(info, encoding);
        self
    }

    pub fn converter(mut self, converter: Arc<dyn AttributeConverter>) -> Self {
        self.codec = ValueCodec::Converter(converter);
        self
    }

    pub fn serializer(mut self, serializer: Arc<dyn DbSerializer>) -> Self {
        self.codec = ValueCodec::Serializer(serializer);
        self
    }

    pub fn codec(mut self, codec: ValueCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn constraints(mut self, constraints: ColumnConstraints) -> Self {
        self.constraints = Some(constraints);
        self
    }

    pub(crate) fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(self.member)
    }

    pub(crate) fn into_property(self) -> Property<T> {
        // Ordinal enums are integers on disk; converted and serialized values are text.
        let data_type = match &self.codec {
            ValueCodec::EnumByOrdinal(_) => DataType::Integer,
            ValueCodec::Converter(_) | ValueCodec::Serializer(_) => DataType::Text,
            ValueCodec::Identity | ValueCodec::EnumByName(_) => self.data_type,
        };
        let name = self.column_name().to_string();
        Property {
            meta: ColumnMeta {
                name,
                member: self.member,
                data_type,
                primary_key: self.primary_key,
                generated: self.generated,
                constraints: self.constraints,
            },
            accessor: self.accessor,
            codec: self.codec,
        }
    }
}
