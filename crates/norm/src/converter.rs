//! Ready-made converters and serializers.

use crate::codec::{AttributeConverter, DbSerializer};
use crate::error::{NormError, NormResult};
use crate::value::Value;

/// Stores a list of integers as comma separated text (`"123,456"`).
///
/// Field type is typically `Vec<i32>` or `Vec<i64>`. An empty or `NULL`-free
/// empty string decodes to an empty list.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntListConverter;

impl AttributeConverter for IntListConverter {
    fn to_database_column(&self, attribute: Value) -> NormResult<Value> {
        let Value::Array(items) = attribute else {
            return Err(NormError::mapping(format!(
                "IntListConverter expects a list, got {}",
                attribute.kind()
            )));
        };
        let mut out = String::new();
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let n = item.as_i64().ok_or_else(|| {
                NormError::mapping(format!("IntListConverter expects integers, got {}", item.kind()))
            })?;
            out.push_str(&n.to_string());
        }
        Ok(Value::Text(out))
    }

    fn to_entity_attribute(&self, column: Value) -> NormResult<Value> {
        let Value::Text(text) = column else {
            return Err(NormError::mapping(format!(
                "IntListConverter expects a text column, got {}",
                column.kind()
            )));
        };
        if text.is_empty() {
            return Ok(Value::Array(Vec::new()));
        }
        text.split(',')
            .map(|part| {
                part.trim()
                    .parse::<i64>()
                    .map(Value::I64)
                    .map_err(|e| NormError::mapping_with(format!("bad list element '{part}'"), e))
            })
            .collect::<NormResult<Vec<_>>>()
            .map(Value::Array)
    }
}

/// Serializes any value as JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl DbSerializer for JsonSerializer {
    fn serialize(&self, value: &Value) -> NormResult<String> {
        serde_json::to_string(&value.to_json())
            .map_err(|e| NormError::mapping_with("json serialization failed", e))
    }

    fn deserialize(&self, text: &str) -> NormResult<Value> {
        serde_json::from_str::<serde_json::Value>(text)
            .map(Value::from_json)
            .map_err(|e| NormError::mapping_with("json deserialization failed", e))
    }
}
