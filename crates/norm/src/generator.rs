//! Statement generation for entities through a dialect.

use crate::descriptor::Entity;
use crate::dialect::{QuerySpec, SqlDialect};
use crate::error::NormResult;
use crate::row::FromRow;
use crate::value::Value;
use std::sync::Arc;

/// SQL text and its positional arguments, ready for the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

/// Pairs a dialect with the descriptor registry.
#[derive(Debug, Clone)]
pub struct StatementGenerator {
    dialect: Arc<dyn SqlDialect>,
}

impl StatementGenerator {
    pub fn new(dialect: Arc<dyn SqlDialect>) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> &dyn SqlDialect {
        self.dialect.as_ref()
    }

    pub fn insert<T: Entity>(&self, record: &T, spec: &QuerySpec) -> NormResult<Statement> {
        let descriptor = T::descriptor()?;
        let meta = descriptor.meta();
        Ok(Statement {
            sql: self.dialect.insert_sql(meta, spec)?,
            args: self.dialect.insert_args(meta, &descriptor.values(record))?,
        })
    }

    pub fn update<T: Entity>(&self, record: &T, spec: &QuerySpec) -> NormResult<Statement> {
        let descriptor = T::descriptor()?;
        let meta = descriptor.meta();
        Ok(Statement {
            sql: self.dialect.update_sql(meta, spec)?,
            args: self.dialect.update_args(meta, &descriptor.values(record))?,
        })
    }

    pub fn upsert<T: Entity>(&self, record: &T, spec: &QuerySpec) -> NormResult<Statement> {
        let descriptor = T::descriptor()?;
        let meta = descriptor.meta();
        Ok(Statement {
            sql: self.dialect.upsert_sql(meta, spec)?,
            args: self.dialect.upsert_args(meta, &descriptor.values(record))?,
        })
    }

    pub fn delete<T: Entity>(&self, record: &T, spec: &QuerySpec) -> NormResult<Statement> {
        let descriptor = T::descriptor()?;
        let meta = descriptor.meta();
        Ok(Statement {
            sql: self.dialect.delete_sql(meta, spec)?,
            args: self.dialect.delete_args(meta, &descriptor.values(record))?,
        })
    }

    /// Table-wide delete from the query's table and where clause.
    pub fn delete_where(&self, spec: &QuerySpec) -> NormResult<Statement> {
        Ok(Statement {
            sql: self.dialect.delete_where_sql(spec)?,
            args: spec.args.clone(),
        })
    }

    /// Select for `T`. Literal SQL on the query is used verbatim.
    pub fn select<T: FromRow>(&self, spec: &QuerySpec) -> NormResult<Statement> {
        let meta = if spec.sql.is_some() {
            None
        } else {
            T::table_meta()?
        };
        Ok(Statement {
            sql: self.dialect.select_sql(meta.as_deref(), spec)?,
            args: spec.args.clone(),
        })
    }

    pub fn create_table<T: Entity>(&self, spec: &QuerySpec) -> NormResult<Statement> {
        let descriptor = T::descriptor()?;
        Ok(Statement {
            sql: self.dialect.create_table_sql(descriptor.meta(), spec)?,
            args: Vec::new(),
        })
    }
}
