//! Per-property value codecs.
//!
//! A codec sits between a record field and the database column. Encoding runs
//! after the field is read (insert/update/upsert/delete arguments), decoding
//! runs before a column is written back into a record. `NULL` is never handed
//! to a codec.

use crate::error::{NormError, NormResult};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// How an enum property is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumEncoding {
    /// Store the variant name (default).
    #[default]
    Name,
    /// Store the zero-based declaration index.
    Ordinal,
}

/// Static description of a unit-only enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumInfo {
    pub type_name: &'static str,
    pub variants: &'static [&'static str],
}

impl EnumInfo {
    pub fn ordinal_of(&self, name: &str) -> Option<usize> {
        self.variants.iter().position(|v| *v == name)
    }
}

/// A unit-only enum that can be stored by name or ordinal.
///
/// Usually derived with `#[derive(DbEnum)]`, which also provides the
/// [`ToValue`](crate::ToValue) / [`FromValue`](crate::FromValue) impls that
/// move the variant name in and out of a [`Value::Text`].
pub trait DbEnum: Sized {
    const TYPE_NAME: &'static str;
    /// Variant names in declaration order.
    const VARIANTS: &'static [&'static str];

    fn variant_name(&self) -> &'static str;

    fn from_variant_name(name: &str) -> Option<Self>;

    fn enum_info() -> EnumInfo {
        EnumInfo {
            type_name: Self::TYPE_NAME,
            variants: Self::VARIANTS,
        }
    }
}

/// Bidirectional transform between an attribute value and a column value.
pub trait AttributeConverter: Send + Sync {
    fn to_database_column(&self, attribute: Value) -> NormResult<Value>;

    fn to_entity_attribute(&self, column: Value) -> NormResult<Value>;
}

/// Serializes an attribute value to and from a text column.
///
/// Implementations must be thread-safe; one instance is shared by every
/// record of the type.
pub trait DbSerializer: Send + Sync {
    fn serialize(&self, value: &Value) -> NormResult<String>;

    fn deserialize(&self, text: &str) -> NormResult<Value>;
}

/// The transform attached to one property.
#[derive(Clone, Default)]
pub enum ValueCodec {
    #[default]
    Identity,
    EnumByName(EnumInfo),
    EnumByOrdinal(EnumInfo),
    Converter(Arc<dyn AttributeConverter>),
    Serializer(Arc<dyn DbSerializer>),
}

impl fmt::Debug for ValueCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueCodec::Identity => f.write_str("Identity"),
            ValueCodec::EnumByName(info) => write!(f, "EnumByName({})", info.type_name),
            ValueCodec::EnumByOrdinal(info) => write!(f, "EnumByOrdinal({})", info.type_name),
            ValueCodec::Converter(_) => f.write_str("Converter"),
            ValueCodec::Serializer(_) => f.write_str("Serializer"),
        }
    }
}

impl ValueCodec {
    pub fn enumerated(info: EnumInfo, encoding: EnumEncoding) -> Self {
        match encoding {
            EnumEncoding::Name => ValueCodec::EnumByName(info),
            EnumEncoding::Ordinal => ValueCodec::EnumByOrdinal(info),
        }
    }

    pub fn converter(converter: impl AttributeConverter + 'static) -> Self {
        ValueCodec::Converter(Arc::new(converter))
    }

    pub fn serializer(serializer: impl DbSerializer + 'static) -> Self {
        ValueCodec::Serializer(Arc::new(serializer))
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, ValueCodec::Identity)
    }

    /// Attribute value -> column value.
    pub fn encode(&self, value: Value) -> NormResult<Value> {
        if value.is_null() {
            return Ok(value);
        }
        match self {
            ValueCodec::Identity | ValueCodec::EnumByName(_) => Ok(value),
            ValueCodec::EnumByOrdinal(info) => {
                let name = enum_name(info, &value)?;
                let ordinal = info.ordinal_of(name).ok_or_else(|| unknown_variant(name))?;
                i32::try_from(ordinal)
                    .map(Value::I32)
                    .map_err(|e| NormError::mapping_with("enum ordinal overflow", e))
            }
            ValueCodec::Converter(c) => c.to_database_column(value),
            ValueCodec::Serializer(s) => s.serialize(&value).map(Value::Text),
        }
    }

    /// Column value -> attribute value.
    pub fn decode(&self, value: Value) -> NormResult<Value> {
        if value.is_null() {
            return Ok(value);
        }
        match self {
            ValueCodec::Identity => Ok(value),
            ValueCodec::EnumByName(info) => {
                let name = value.to_string_lossless();
                if info.ordinal_of(&name).is_some() {
                    Ok(Value::Text(name))
                } else {
                    Err(unknown_variant(&name))
                }
            }
            ValueCodec::EnumByOrdinal(info) => {
                let ordinal = match &value {
                    Value::Text(s) => s.trim().parse::<i64>().ok(),
                    other => other.as_i64(),
                }
                .ok_or_else(|| {
                    NormError::mapping(format!(
                        "Invalid ordinal value {value} for enum class {}",
                        info.type_name
                    ))
                })?;
                usize::try_from(ordinal)
                    .ok()
                    .and_then(|i| info.variants.get(i))
                    .map(|name| Value::Text((*name).to_string()))
                    .ok_or_else(|| {
                        NormError::mapping(format!(
                            "Invalid ordinal number {ordinal} for enum class {}",
                            info.type_name
                        ))
                    })
            }
            ValueCodec::Converter(c) => c.to_entity_attribute(value),
            ValueCodec::Serializer(s) => match value {
                Value::Text(text) => s.deserialize(&text),
                other => Err(NormError::mapping(format!(
                    "serialized column must be text, got {}",
                    other.kind()
                ))),
            },
        }
    }
}

fn enum_name<'v>(info: &EnumInfo, value: &'v Value) -> NormResult<&'v str> {
    value.as_str().ok_or_else(|| {
        NormError::mapping(format!(
            "enum {} must encode to its variant name, got {}",
            info.type_name,
            value.kind()
        ))
    })
}

fn unknown_variant(name: &str) -> NormError {
    NormError::mapping(format!("Enum value does not exist. value:{name}"))
}

impl Value {
    /// Text form used for enum-by-name lookups: text is taken verbatim,
    /// anything else through `Display`.
    fn to_string_lossless(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLORS: EnumInfo = EnumInfo {
        type_name: "Color",
        variants: &["Red", "Green", "Blue"],
    };

    #[test]
    fn enum_by_name_is_passthrough_with_validation() {
        let codec = ValueCodec::enumerated(COLORS, EnumEncoding::Name);
        assert_eq!(
            codec.encode(Value::Text("Green".into())).unwrap(),
            Value::Text("Green".into())
        );
        assert_eq!(
            codec.decode(Value::Text("Blue".into())).unwrap(),
            Value::Text("Blue".into())
        );
        let err = codec.decode(Value::Text("Purple".into())).unwrap_err();
        assert!(err.to_string().contains("Enum value does not exist"));
    }

    #[test]
    fn enum_by_ordinal_round_trip() {
        let codec = ValueCodec::enumerated(COLORS, EnumEncoding::Ordinal);
        assert_eq!(codec.encode(Value::Text("Blue".into())).unwrap(), Value::I32(2));
        assert_eq!(codec.decode(Value::I64(1)).unwrap(), Value::Text("Green".into()));
        assert_eq!(
            codec.decode(Value::Text("0".into())).unwrap(),
            Value::Text("Red".into())
        );
    }

    #[test]
    fn enum_by_ordinal_rejects_out_of_range() {
        let codec = ValueCodec::enumerated(COLORS, EnumEncoding::Ordinal);
        let err = codec.decode(Value::I32(3)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Mapping error: Invalid ordinal number 3 for enum class Color"
        );
        assert!(codec.decode(Value::I32(-1)).is_err());
    }

    #[test]
    fn null_bypasses_every_codec() {
        let codec = ValueCodec::enumerated(COLORS, EnumEncoding::Ordinal);
        assert_eq!(codec.encode(Value::Null).unwrap(), Value::Null);
        assert_eq!(codec.decode(Value::Null).unwrap(), Value::Null);
    }
}
