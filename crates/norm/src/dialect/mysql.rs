use super::{QuerySpec, SqlDialect};
use crate::descriptor::{ColumnValues, TableMeta};
use crate::error::NormResult;
use crate::value::Value;

/// MySQL / MariaDB: upsert through `on duplicate key update`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn upsert_sql(&self, meta: &TableMeta, spec: &QuerySpec) -> NormResult<String> {
        let insert = self.insert_sql(meta, spec)?;
        Ok(format!(
            "{insert} on duplicate key update {}",
            meta.upsert_assignments()
        ))
    }

    /// The insert arguments twice: once for the values list, once for the
    /// update assignments.
    fn upsert_args(&self, meta: &TableMeta, values: &dyn ColumnValues) -> NormResult<Vec<Value>> {
        let args = self.insert_args(meta, values)?;
        let mut doubled = Vec::with_capacity(args.len() * 2);
        doubled.extend_from_slice(&args);
        doubled.extend(args);
        Ok(doubled)
    }
}
