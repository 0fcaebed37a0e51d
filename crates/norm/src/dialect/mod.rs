//! SQL dialects.
//!
//! [`SqlDialect`]'s provided methods generate the standard SQL forms; concrete
//! dialects override only what differs (upsert syntax, column types).

mod mysql;
mod postgres;
mod standard;

#[cfg(test)]
mod tests;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use standard::StandardDialect;

use crate::descriptor::{ColumnConstraints, ColumnMeta, ColumnValues, DataType, TableMeta};
use crate::error::{NormError, NormResult};
use crate::value::Value;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Per-call statement inputs: the parts of a query that are not derived from
/// the record type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    /// Literal SQL. Overrides every other part.
    pub sql: Option<String>,
    /// Table override.
    pub table: Option<String>,
    pub where_clause: Option<String>,
    pub order_by: Option<String>,
    /// Positional arguments for `sql` or `where_clause`.
    pub args: Vec<Value>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    fn table_or<'a>(&'a self, meta: &'a TableMeta) -> &'a str {
        self.table.as_deref().unwrap_or(meta.table())
    }
}

const TABLE_REQUIRED: &str = "You must specify a table name with the table() method.";

fn missing_key(meta: &TableMeta, operation: &'static str) -> NormError {
    NormError::MissingPrimaryKey {
        type_name: meta.type_name(),
        operation,
    }
}

fn collect_args(values: &dyn ColumnValues, columns: &[String]) -> NormResult<Vec<Value>> {
    columns.iter().map(|c| values.column_value(c)).collect()
}

/// Statement generation rules for one SQL engine.
pub trait SqlDialect: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn insert_sql(&self, meta: &TableMeta, spec: &QuerySpec) -> NormResult<String> {
        meta.insert_template()
            .map(|t| t.render(spec.table_or(meta)))
            .ok_or_else(|| {
                NormError::mapping(format!("{} has no insertable columns", meta.type_name()))
            })
    }

    fn insert_args(&self, meta: &TableMeta, values: &dyn ColumnValues) -> NormResult<Vec<Value>> {
        collect_args(values, meta.insert_columns())
    }

    fn update_sql(&self, meta: &TableMeta, spec: &QuerySpec) -> NormResult<String> {
        if !meta.has_primary_key() {
            return Err(missing_key(meta, "update"));
        }
        meta.update_template()
            .map(|t| t.render(spec.table_or(meta)))
            .ok_or_else(|| {
                NormError::mapping(format!("{} has no updatable columns", meta.type_name()))
            })
    }

    /// Non-key values in column order, then key values in where-clause order.
    fn update_args(&self, meta: &TableMeta, values: &dyn ColumnValues) -> NormResult<Vec<Value>> {
        if !meta.has_primary_key() {
            return Err(missing_key(meta, "update"));
        }
        let mut args = collect_args(values, meta.update_columns())?;
        args.extend(collect_args(values, meta.primary_key_names())?);
        Ok(args)
    }

    fn upsert_sql(&self, _meta: &TableMeta, _spec: &QuerySpec) -> NormResult<String> {
        Err(NormError::unsupported(self.name(), "upsert"))
    }

    fn upsert_args(&self, _meta: &TableMeta, _values: &dyn ColumnValues) -> NormResult<Vec<Value>> {
        Err(NormError::unsupported(self.name(), "upsert"))
    }

    fn delete_sql(&self, meta: &TableMeta, spec: &QuerySpec) -> NormResult<String> {
        meta.delete_template()
            .map(|t| t.render(spec.table_or(meta)))
            .ok_or_else(|| missing_key(meta, "delete"))
    }

    fn delete_args(&self, meta: &TableMeta, values: &dyn ColumnValues) -> NormResult<Vec<Value>> {
        if !meta.has_primary_key() {
            return Err(missing_key(meta, "delete"));
        }
        collect_args(values, meta.primary_key_names())
    }

    /// Table-wide delete: `delete from t[ where ...]`. Only the query's table
    /// and where clause are used.
    fn delete_where_sql(&self, spec: &QuerySpec) -> NormResult<String> {
        let table = spec
            .table
            .as_deref()
            .ok_or_else(|| NormError::mapping(TABLE_REQUIRED))?;
        let mut sql = format!("delete from {table}");
        if let Some(clause) = &spec.where_clause {
            sql.push_str(" where ");
            sql.push_str(clause);
        }
        Ok(sql)
    }

    /// `select <cols> from <table>[ where ...][ order by ...]`, or the literal SQL.
    fn select_sql(&self, meta: Option<&TableMeta>, spec: &QuerySpec) -> NormResult<String> {
        if let Some(sql) = &spec.sql {
            return Ok(sql.clone());
        }
        let columns = meta.map_or("*", TableMeta::select_columns);
        let table = spec
            .table
            .as_deref()
            .or_else(|| meta.map(TableMeta::table))
            .ok_or_else(|| NormError::mapping(TABLE_REQUIRED))?;

        let mut sql = format!("select {columns} from {table}");
        if let Some(clause) = &spec.where_clause {
            sql.push_str(" where ");
            sql.push_str(clause);
        }
        if let Some(order) = &spec.order_by {
            sql.push_str(" order by ");
            sql.push_str(order);
        }
        Ok(sql)
    }

    fn create_table_sql(&self, meta: &TableMeta, spec: &QuerySpec) -> NormResult<String> {
        if meta.columns().is_empty() {
            return Err(NormError::mapping(format!(
                "{} has no mapped columns",
                meta.type_name()
            )));
        }
        let columns = meta
            .columns()
            .iter()
            .map(|c| self.column_definition(c))
            .collect::<Vec<_>>()
            .join(",");

        let mut sql = format!("create table {} ({columns}", spec.table_or(meta));
        if meta.has_primary_key() {
            sql.push_str(", primary key (");
            sql.push_str(&meta.primary_key_names().join(","));
            sql.push(')');
        }
        sql.push(')');
        Ok(sql)
    }

    /// One column of a `create table` statement.
    fn column_definition(&self, column: &ColumnMeta) -> String {
        let defaults = ColumnConstraints::default();
        let constraints = column.constraints.as_ref().unwrap_or(&defaults);
        if let Some(definition) = &constraints.definition {
            return format!("{} {definition}", column.name);
        }

        let mut def = format!(
            "{} {}",
            column.name,
            self.column_type(column.data_type, constraints)
        );
        if column.generated {
            def.push_str(" auto_increment");
        }
        if constraints.unique {
            def.push_str(" unique");
        }
        if !constraints.nullable {
            def.push_str(" not null");
        }
        def
    }

    fn column_type(&self, data_type: DataType, constraints: &ColumnConstraints) -> String {
        match data_type {
            DataType::Integer => "integer".to_string(),
            DataType::BigInt => "bigint".to_string(),
            DataType::Double => "double".to_string(),
            DataType::Float => "float".to_string(),
            DataType::Decimal => {
                format!("decimal({},{})", constraints.precision, constraints.scale)
            }
            DataType::DateTime => "datetime".to_string(),
            DataType::Boolean | DataType::Text => format!("varchar({})", constraints.length),
        }
    }
}

/// Named dialect selection, for configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[default]
    Standard,
    #[serde(alias = "mariadb")]
    MySql,
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
}

impl DialectKind {
    pub fn into_dialect(self) -> Arc<dyn SqlDialect> {
        match self {
            DialectKind::Standard => Arc::new(StandardDialect),
            DialectKind::MySql => Arc::new(MySqlDialect),
            DialectKind::Postgres => Arc::new(PostgresDialect),
        }
    }
}

impl FromStr for DialectKind {
    type Err = NormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "" => Ok(DialectKind::Standard),
            "mysql" | "mariadb" => Ok(DialectKind::MySql),
            "postgres" | "postgresql" | "pg" => Ok(DialectKind::Postgres),
            other => Err(NormError::Config(format!("unknown dialect '{other}'"))),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DialectKind::Standard => "standard",
            DialectKind::MySql => "mysql",
            DialectKind::Postgres => "postgres",
        })
    }
}
