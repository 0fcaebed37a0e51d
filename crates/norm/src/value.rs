//! Dialect-neutral parameter and column values.
//!
//! Every positional argument handed to a [`Connection`](crate::Connection) and
//! every column read back from it is a [`Value`]. Record fields move in and out
//! of this representation through [`ToValue`] and [`FromValue`].

use crate::error::{NormError, NormResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::fmt;
use uuid::Uuid;

/// A single SQL value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    /// Unsigned 64-bit integers (e.g. MySQL `BIGINT UNSIGNED` generated keys).
    U64(u64),
    F32(f32),
    F64(f64),
    /// Arbitrary-precision numbers.
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
    Array(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Timestamp(_) => "timestamp",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
            Value::Array(_) => "array",
        }
    }

    /// Borrow the text payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Read any integer-like value as `i64`, if it fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            Value::U64(v) => i64::try_from(*v).ok(),
            Value::Decimal(d) if d.fract().is_zero() => d.to_i64(),
            _ => None,
        }
    }

    /// Convert into a JSON value. Dates and times become RFC 3339 strings.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            Value::Null => J::Null,
            Value::Bool(b) => J::Bool(*b),
            Value::I32(v) => J::from(*v),
            Value::I64(v) => J::from(*v),
            Value::U64(v) => J::from(*v),
            Value::F32(v) => J::from(f64::from(*v)),
            Value::F64(v) => J::from(*v),
            Value::Decimal(d) => J::String(d.to_string()),
            Value::Text(s) => J::String(s.clone()),
            Value::Bytes(b) => J::Array(b.iter().map(|x| J::from(*x)).collect()),
            Value::Date(d) => J::String(d.to_string()),
            Value::DateTime(d) => J::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            Value::Timestamp(t) => J::String(t.to_rfc3339()),
            Value::Uuid(u) => J::String(u.to_string()),
            Value::Json(j) => j.clone(),
            Value::Array(items) => J::Array(items.iter().map(Value::to_json).collect()),
        }
    }

    /// Convert a JSON value back into a `Value`.
    ///
    /// Integral numbers become `I64` (or `U64` above `i64::MAX`), other
    /// numbers `F64`, arrays `Array`; objects stay `Json`.
    pub fn from_json(json: serde_json::Value) -> Value {
        use serde_json::Value as J;
        match json {
            J::Null => Value::Null,
            J::Bool(b) => Value::Bool(b),
            J::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::I64(i)
                } else if let Some(u) = n.as_u64() {
                    Value::U64(u)
                } else {
                    Value::F64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            J::String(s) => Value::Text(s),
            J::Array(items) => Value::Array(items.into_iter().map(Value::from_json).collect()),
            obj @ J::Object(_) => Value::Json(obj),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Date(d) => write!(f, "{d}"),
            Value::DateTime(d) => write!(f, "{d}"),
            Value::Timestamp(t) => write!(f, "{t}"),
            Value::Uuid(u) => write!(f, "{u}"),
            Value::Json(j) => write!(f, "{j}"),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Encode a Rust value as a [`Value`].
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Decode a [`Value`] into a Rust value, widening numeric representations
/// where the target can hold the result.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> NormResult<Self>;
}

fn mismatch<T>(expected: &'static str, value: &Value) -> NormResult<T> {
    Err(NormError::conversion(expected, format!("{} value {value}", value.kind())))
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> NormResult<Self> {
        Ok(value)
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> NormResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

macro_rules! impl_integer {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl ToValue for $ty {
            fn to_value(&self) -> Value {
                Value::$variant((*self).into())
            }
        }

        impl FromValue for $ty {
            fn from_value(value: Value) -> NormResult<Self> {
                let converted = match &value {
                    Value::I32(v) => <$ty>::try_from(*v).ok(),
                    Value::I64(v) => <$ty>::try_from(*v).ok(),
                    Value::U64(v) => <$ty>::try_from(*v).ok(),
                    Value::Decimal(d) if d.fract().is_zero() => {
                        d.to_i128().and_then(|v| <$ty>::try_from(v).ok())
                    }
                    Value::Bool(b) => <$ty>::try_from(u8::from(*b)).ok(),
                    _ => None,
                };
                match converted {
                    Some(v) => Ok(v),
                    None => mismatch(stringify!($ty), &value),
                }
            }
        }
    )*};
}

impl_integer!(
    i8 => I32,
    i16 => I32,
    i32 => I32,
    u8 => I32,
    u16 => I32,
    i64 => I64,
    u32 => I64,
    u64 => U64,
);

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::F32(*self)
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> NormResult<Self> {
        match value {
            Value::F32(v) => Ok(v),
            Value::F64(v) => Ok(v as f32),
            Value::I32(v) => Ok(v as f32),
            Value::I64(v) => Ok(v as f32),
            Value::U64(v) => Ok(v as f32),
            Value::Decimal(d) => d.to_f32().map_or_else(|| mismatch("f32", &Value::Decimal(d)), Ok),
            other => mismatch("f32", &other),
        }
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::F64(*self)
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> NormResult<Self> {
        match value {
            Value::F64(v) => Ok(v),
            Value::F32(v) => Ok(f64::from(v)),
            Value::I32(v) => Ok(f64::from(v)),
            Value::I64(v) => Ok(v as f64),
            Value::U64(v) => Ok(v as f64),
            Value::Decimal(d) => d.to_f64().map_or_else(|| mismatch("f64", &Value::Decimal(d)), Ok),
            other => mismatch("f64", &other),
        }
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> NormResult<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::I32(0) | Value::I64(0) | Value::U64(0) => Ok(false),
            Value::I32(1) | Value::I64(1) | Value::U64(1) => Ok(true),
            // Booleans stored in varchar columns.
            Value::Text(ref s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "t" => Ok(true),
                "0" | "false" | "f" => Ok(false),
                _ => mismatch("bool", &value),
            },
            other => mismatch("bool", &other),
        }
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> NormResult<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => mismatch("String", &other),
        }
    }
}

impl ToValue for Decimal {
    fn to_value(&self) -> Value {
        Value::Decimal(*self)
    }
}

impl FromValue for Decimal {
    fn from_value(value: Value) -> NormResult<Self> {
        match value {
            Value::Decimal(d) => Ok(d),
            Value::I32(v) => Ok(Decimal::from(v)),
            Value::I64(v) => Ok(Decimal::from(v)),
            Value::U64(v) => Ok(Decimal::from(v)),
            Value::F64(v) => Decimal::try_from(v)
                .map_err(|e| NormError::conversion("Decimal", e.to_string())),
            Value::Text(s) => s
                .parse::<Decimal>()
                .map_err(|e| NormError::conversion("Decimal", e.to_string())),
            other => mismatch("Decimal", &other),
        }
    }
}

impl ToValue for NaiveDate {
    fn to_value(&self) -> Value {
        Value::Date(*self)
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> NormResult<Self> {
        match value {
            Value::Date(d) => Ok(d),
            Value::DateTime(d) => Ok(d.date()),
            other => mismatch("NaiveDate", &other),
        }
    }
}

impl ToValue for NaiveDateTime {
    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> NormResult<Self> {
        match value {
            Value::DateTime(d) => Ok(d),
            Value::Timestamp(t) => Ok(t.naive_utc()),
            other => mismatch("NaiveDateTime", &other),
        }
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> NormResult<Self> {
        match value {
            Value::Timestamp(t) => Ok(t),
            Value::DateTime(d) => Ok(d.and_utc()),
            other => mismatch("DateTime<Utc>", &other),
        }
    }
}

impl ToValue for Uuid {
    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> NormResult<Self> {
        match value {
            Value::Uuid(u) => Ok(u),
            Value::Text(s) => {
                Uuid::parse_str(&s).map_err(|e| NormError::conversion("Uuid", e.to_string()))
            }
            other => mismatch("Uuid", &other),
        }
    }
}

impl ToValue for serde_json::Value {
    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> NormResult<Self> {
        match value {
            Value::Json(j) => Ok(j),
            Value::Text(s) => {
                serde_json::from_str(&s).map_err(|e| NormError::conversion("json", e.to_string()))
            }
            other => Ok(other.to_json()),
        }
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> NormResult<Self> {
        match value {
            Value::Bytes(b) => Ok(b),
            // `\x` hex, as written into text columns.
            Value::Text(ref s) => match s.strip_prefix("\\x").and_then(decode_hex) {
                Some(bytes) => Ok(bytes),
                None => mismatch("Vec<u8>", &value),
            },
            other => mismatch("Vec<u8>", &other),
        }
    }
}

/// Bytes as `\x`-prefixed lowercase hex.
pub fn encode_hex(bytes: &[u8]) -> String {
    use fmt::Write as _;
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}

// Lists other than byte strings travel as `Value::Array`, or as a JSON
// array when stored in a text column.
macro_rules! impl_list {
    ($($ty:ty),* $(,)?) => {$(
        impl ToValue for Vec<$ty> {
            fn to_value(&self) -> Value {
                Value::Array(self.iter().map(ToValue::to_value).collect())
            }
        }

        impl FromValue for Vec<$ty> {
            fn from_value(value: Value) -> NormResult<Self> {
                match value {
                    Value::Array(items) => items.into_iter().map(<$ty>::from_value).collect(),
                    Value::Text(s) => match serde_json::from_str(&s).map(Value::from_json) {
                        Ok(Value::Array(items)) => {
                            items.into_iter().map(<$ty>::from_value).collect()
                        }
                        _ => mismatch(
                            concat!("Vec<", stringify!($ty), ">"),
                            &Value::Text(s),
                        ),
                    },
                    other => mismatch(concat!("Vec<", stringify!($ty), ">"), &other),
                }
            }
        }
    )*};
}

impl_list!(i32, i64, f64, bool, String, Uuid);

macro_rules! impl_from_for_value {
    ($($ty:ty),* $(,)?) => {$(
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                v.to_value()
            }
        }
    )*};
}

impl_from_for_value!(
    bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, String, Decimal, NaiveDate,
    NaiveDateTime, DateTime<Utc>, Uuid, serde_json::Value, Vec<u8>,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
