//! PostgreSQL executor on the synchronous `postgres` client.

use crate::connection::{Connection, ConnectionProvider, ExecOutcome, KeyRequest};
use crate::error::{NormError, NormResult};
use crate::row::Row;
use crate::value::{encode_hex, Value};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use postgres::types::{FromSql, IsNull, Kind, ToSql, Type};
use postgres::{Client, Config, NoTls};
use rust_decimal::Decimal;
use std::error::Error;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Opens a new client per [`connect`](ConnectionProvider::connect).
#[derive(Debug, Clone)]
pub struct PostgresProvider {
    config: Config,
}

impl PostgresProvider {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// From a `postgres://` URL or key/value connection string.
    pub fn from_url(url: &str) -> NormResult<Self> {
        Config::from_str(url)
            .map(Self::new)
            .map_err(|e| NormError::Config(format!("invalid connection string: {e}")))
    }
}

impl ConnectionProvider for PostgresProvider {
    fn connect(&self) -> NormResult<Box<dyn Connection>> {
        let client = self
            .config
            .connect(NoTls)
            .map_err(|e| NormError::Connection(e.to_string()))?;
        Ok(Box::new(PostgresConnection::new(client)))
    }
}

/// One `postgres::Client`.
pub struct PostgresConnection {
    client: Client,
}

impl PostgresConnection {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn run(&mut self, sql: &str, args: &[Value]) -> NormResult<Vec<postgres::Row>> {
        let exec_sql = rewrite_placeholders(sql);
        let params: Vec<&(dyn ToSql + Sync)> =
            args.iter().map(|v| v as &(dyn ToSql + Sync)).collect();
        self.client
            .query(exec_sql.as_str(), &params)
            .map_err(|e| NormError::execution(sql, e))
    }
}

impl Connection for PostgresConnection {
    fn query(&mut self, sql: &str, args: &[Value]) -> NormResult<Vec<Row>> {
        let rows = self.run(sql, args)?;
        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };
        let columns: Arc<[String]> = first
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        rows.iter()
            .map(|row| decode_row(row, &columns).map_err(|e| NormError::execution(sql, e)))
            .collect()
    }

    fn execute(&mut self, sql: &str, args: &[Value], keys: &KeyRequest) -> NormResult<ExecOutcome> {
        let is_insert = sql
            .trim_start()
            .get(..6)
            .is_some_and(|kw| kw.eq_ignore_ascii_case("insert"));

        if keys.is_empty() || !is_insert {
            let exec_sql = rewrite_placeholders(sql);
            let params: Vec<&(dyn ToSql + Sync)> =
                args.iter().map(|v| v as &(dyn ToSql + Sync)).collect();
            let affected = self
                .client
                .execute(exec_sql.as_str(), &params)
                .map_err(|e| NormError::execution(sql, e))?;
            return Ok(ExecOutcome::affected(affected));
        }

        let returning = format!("{sql} returning {}", keys.names().join(","));
        let rows = self.query(&returning, args)?;
        let affected = rows.len() as u64;
        let mut outcome = ExecOutcome::affected(affected);
        if let Some(first) = rows.into_iter().next() {
            outcome = outcome.with_keys(first);
        }
        Ok(outcome)
    }

    fn begin(&mut self) -> NormResult<()> {
        self.client
            .batch_execute("BEGIN")
            .map_err(|e| NormError::execution("BEGIN", e))
    }

    fn commit(&mut self) -> NormResult<()> {
        self.client
            .batch_execute("COMMIT")
            .map_err(|e| NormError::execution("COMMIT", e))
    }

    fn rollback(&mut self) -> NormResult<()> {
        self.client
            .batch_execute("ROLLBACK")
            .map_err(|e| NormError::execution("ROLLBACK", e))
    }

    fn close(self: Box<Self>) -> NormResult<()> {
        self.client
            .close()
            .map_err(|e| NormError::Connection(e.to_string()))
    }
}

/// Rewrite `?` placeholders to `$1, $2, ...`, leaving string literals,
/// quoted identifiers and comments alone.
pub fn rewrite_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut n = 0;
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                out.push(c);
                for inner in chars.by_ref() {
                    out.push(inner);
                    // A doubled quote reopens immediately, so no special case is needed.
                    if inner == c {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                out.push(c);
                for inner in chars.by_ref() {
                    out.push(inner);
                    if inner == '\n' {
                        break;
                    }
                }
            }
            '?' => {
                n += 1;
                out.push('$');
                out.push_str(&n.to_string());
            }
            _ => out.push(c),
        }
    }
    out
}

type BoxedSqlError = Box<dyn Error + Sync + Send>;

/// Whether the server expects character data for this parameter.
fn is_text(ty: &Type) -> bool {
    matches!(*ty, Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME)
}

/// Bind as the type's text form.
fn encode_str(text: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxedSqlError> {
    text.to_sql(ty, out)
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxedSqlError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => match *ty {
                _ if is_text(ty) => encode_str(if *v { "true" } else { "false" }, ty, out),
                Type::INT2 | Type::INT4 | Type::INT8 => encode_int(i64::from(*v), ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::I32(v) => encode_int(i64::from(*v), ty, out),
            Value::I64(v) => encode_int(*v, ty, out),
            Value::U64(v) => match *ty {
                Type::NUMERIC => Decimal::from(*v).to_sql(ty, out),
                _ if is_text(ty) => encode_str(&v.to_string(), ty, out),
                _ => encode_int(i64::try_from(*v)?, ty, out),
            },
            Value::F32(v) => match *ty {
                Type::FLOAT8 => f64::from(*v).to_sql(ty, out),
                Type::NUMERIC => Decimal::try_from(*v)?.to_sql(ty, out),
                _ if is_text(ty) => encode_str(&v.to_string(), ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::F64(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::NUMERIC => Decimal::try_from(*v)?.to_sql(ty, out),
                _ if is_text(ty) => encode_str(&v.to_string(), ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Decimal(v) => match *ty {
                Type::FLOAT8 => f64::try_from(*v)?.to_sql(ty, out),
                Type::FLOAT4 => f32::try_from(*v)?.to_sql(ty, out),
                Type::INT2 | Type::INT4 | Type::INT8 => encode_int(i64::try_from(*v)?, ty, out),
                _ if is_text(ty) => encode_str(&v.to_string(), ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Text(v) => match *ty {
                Type::JSON | Type::JSONB => {
                    serde_json::from_str::<serde_json::Value>(v)?.to_sql(ty, out)
                }
                Type::UUID => Uuid::parse_str(v)?.to_sql(ty, out),
                Type::NUMERIC => Decimal::from_str(v.trim())?.to_sql(ty, out),
                _ => v.as_str().to_sql(ty, out),
            },
            Value::Bytes(v) => match *ty {
                _ if is_text(ty) => encode_str(&encode_hex(v), ty, out),
                _ => v.as_slice().to_sql(ty, out),
            },
            Value::Date(v) => match *ty {
                Type::TIMESTAMP => v.and_time(NaiveTime::MIN).to_sql(ty, out),
                Type::TIMESTAMPTZ => v.and_time(NaiveTime::MIN).and_utc().to_sql(ty, out),
                _ if is_text(ty) => encode_str(&v.to_string(), ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::DateTime(v) => match *ty {
                Type::TIMESTAMPTZ => v.and_utc().to_sql(ty, out),
                Type::DATE => v.date().to_sql(ty, out),
                _ if is_text(ty) => encode_str(&v.to_string(), ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Timestamp(v) => match *ty {
                Type::TIMESTAMP => v.naive_utc().to_sql(ty, out),
                Type::DATE => v.date_naive().to_sql(ty, out),
                _ if is_text(ty) => encode_str(&v.to_rfc3339(), ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Uuid(v) => match *ty {
                _ if is_text(ty) => encode_str(&v.to_string(), ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Json(v) => match *ty {
                _ if is_text(ty) => encode_str(&v.to_string(), ty, out),
                _ => v.to_sql(ty, out),
            },
            // Lists in text columns are stored as a JSON array.
            Value::Array(items) => match *ty {
                _ if is_text(ty) => encode_str(&self.to_json().to_string(), ty, out),
                Type::JSON | Type::JSONB => self.to_json().to_sql(ty, out),
                _ => items.to_sql(ty, out),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    postgres::types::to_sql_checked!();
}

fn encode_int(v: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxedSqlError> {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::OID => u32::try_from(v)?.to_sql(ty, out),
        Type::FLOAT8 => (v as f64).to_sql(ty, out),
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::NUMERIC => Decimal::from(v).to_sql(ty, out),
        Type::BOOL => (v != 0).to_sql(ty, out),
        _ if is_text(ty) => encode_str(&v.to_string(), ty, out),
        _ => v.to_sql(ty, out),
    }
}

/// Wire bytes of a column type with no mapping of its own.
struct RawColumn(Vec<u8>);

impl<'a> FromSql<'a> for RawColumn {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxedSqlError> {
        Ok(RawColumn(raw.to_vec()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn decode_row(row: &postgres::Row, columns: &Arc<[String]>) -> Result<Row, postgres::Error> {
    let values = (0..row.len())
        .map(|idx| decode_column(row, idx))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Row::new(Arc::clone(columns), values))
}

fn array<T>(items: Vec<T>, wrap: impl Fn(T) -> Value) -> Value {
    Value::Array(items.into_iter().map(wrap).collect())
}

fn decode_column(row: &postgres::Row, idx: usize) -> Result<Value, postgres::Error> {
    let column = &row.columns()[idx];
    let ty = column.type_();
    let value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(Value::Bool),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)?
            .map(|v| Value::I32(i32::from(v))),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx)?.map(Value::I32),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(Value::I64),
        Type::OID => row
            .try_get::<_, Option<u32>>(idx)?
            .map(|v| Value::I64(i64::from(v))),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx)?.map(Value::F32),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(Value::F64),
        Type::NUMERIC => row.try_get::<_, Option<Decimal>>(idx)?.map(Value::Decimal),
        Type::DATE => row.try_get::<_, Option<NaiveDate>>(idx)?.map(Value::Date),
        Type::TIME => row
            .try_get::<_, Option<NaiveTime>>(idx)?
            .map(|t| Value::Text(t.to_string())),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(Value::DateTime),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(Value::Timestamp),
        Type::UUID => row.try_get::<_, Option<Uuid>>(idx)?.map(Value::Uuid),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)?
            .map(Value::Json),
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx)?.map(Value::Bytes),
        Type::BOOL_ARRAY => row
            .try_get::<_, Option<Vec<bool>>>(idx)?
            .map(|v| array(v, Value::Bool)),
        Type::INT2_ARRAY => row
            .try_get::<_, Option<Vec<i16>>>(idx)?
            .map(|v| array(v, |n| Value::I32(i32::from(n)))),
        Type::INT4_ARRAY => row
            .try_get::<_, Option<Vec<i32>>>(idx)?
            .map(|v| array(v, Value::I32)),
        Type::INT8_ARRAY => row
            .try_get::<_, Option<Vec<i64>>>(idx)?
            .map(|v| array(v, Value::I64)),
        Type::FLOAT4_ARRAY => row
            .try_get::<_, Option<Vec<f32>>>(idx)?
            .map(|v| array(v, Value::F32)),
        Type::FLOAT8_ARRAY => row
            .try_get::<_, Option<Vec<f64>>>(idx)?
            .map(|v| array(v, Value::F64)),
        Type::NUMERIC_ARRAY => row
            .try_get::<_, Option<Vec<Decimal>>>(idx)?
            .map(|v| array(v, Value::Decimal)),
        Type::UUID_ARRAY => row
            .try_get::<_, Option<Vec<Uuid>>>(idx)?
            .map(|v| array(v, Value::Uuid)),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY | Type::BPCHAR_ARRAY => row
            .try_get::<_, Option<Vec<String>>>(idx)?
            .map(|v| array(v, Value::Text)),
        _ if <String as FromSql<'_>>::accepts(ty) => {
            row.try_get::<_, Option<String>>(idx)?.map(Value::Text)
        }
        _ => row
            .try_get::<_, Option<RawColumn>>(idx)?
            .map(|RawColumn(bytes)| match ty.kind() {
                // Enum labels arrive as their UTF-8 text.
                Kind::Enum(_) => match String::from_utf8(bytes) {
                    Ok(label) => Value::Text(label),
                    Err(e) => Value::Bytes(e.into_bytes()),
                },
                _ => {
                    tracing::debug!(
                        target: "norm.sql",
                        column = column.name(),
                        pg_type = %ty,
                        "no mapping for column type; passing raw bytes"
                    );
                    Value::Bytes(bytes)
                }
            }),
    };
    Ok(value.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(value: Value, ty: &Type) -> Vec<u8> {
        let mut out = BytesMut::new();
        value.to_sql_checked(ty, &mut out).unwrap();
        out.to_vec()
    }

    fn bind_text(value: Value, ty: &Type) -> String {
        String::from_utf8(bind(value, ty)).unwrap()
    }

    #[test]
    fn dates_widen_to_timestamps() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let midnight = day.and_time(NaiveTime::MIN);

        let mut expected = BytesMut::new();
        midnight.to_sql(&Type::TIMESTAMP, &mut expected).unwrap();
        assert_eq!(bind(Value::Date(day), &Type::TIMESTAMP), expected.to_vec());
        assert_eq!(bind(Value::Date(day), &Type::TIMESTAMP).len(), 8);
        assert_eq!(bind(Value::Date(day), &Type::TIMESTAMPTZ).len(), 8);
        assert_eq!(bind(Value::Date(day), &Type::DATE).len(), 4);
        assert_eq!(bind(Value::DateTime(midnight), &Type::DATE).len(), 4);
    }

    #[test]
    fn text_columns_get_text() {
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(
            bind_text(Value::Uuid(id), &Type::VARCHAR),
            "67e55044-10b1-426f-9247-bb680e5fe0c8"
        );
        assert_eq!(bind(Value::Uuid(id), &Type::UUID).len(), 16);
        assert_eq!(bind_text(Value::Bool(true), &Type::VARCHAR), "true");
        assert_eq!(bind_text(Value::I64(42), &Type::TEXT), "42");
        assert_eq!(
            bind_text(Value::Array(vec![Value::I32(1), Value::I32(2)]), &Type::VARCHAR),
            "[1,2]"
        );
        assert_eq!(bind_text(Value::Bytes(vec![0xab, 0x01]), &Type::TEXT), "\\xab01");
        assert_eq!(
            bind_text(Value::Decimal(Decimal::new(1250, 2)), &Type::VARCHAR),
            "12.50"
        );
    }

    #[test]
    fn numbers_follow_the_parameter_width() {
        assert_eq!(bind(Value::I64(7), &Type::INT4).len(), 4);
        assert_eq!(bind(Value::I32(7), &Type::INT8).len(), 8);
        assert_eq!(bind(Value::Bool(true), &Type::INT2).len(), 2);
        assert_eq!(bind(Value::Decimal(Decimal::new(15, 1)), &Type::FLOAT8).len(), 8);
        assert!(
            Value::I64(i64::MAX)
                .to_sql_checked(&Type::INT4, &mut BytesMut::new())
                .is_err()
        );
    }

    #[test]
    fn placeholders_are_numbered() {
        assert_eq!(
            rewrite_placeholders("update t set a=?,b=? where id=?"),
            "update t set a=$1,b=$2 where id=$3"
        );
    }

    #[test]
    fn quoted_question_marks_are_kept() {
        assert_eq!(
            rewrite_placeholders("select '?', \"a?b\" from t where x=? -- why?\nand y=?"),
            "select '?', \"a?b\" from t where x=$1 -- why?\nand y=$2"
        );
    }
}
