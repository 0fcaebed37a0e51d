//! The fluent query builder.

use crate::connection::{Connection, ConnectionGuard, KeyRequest};
use crate::database::Database;
use crate::descriptor::Entity;
use crate::dialect::QuerySpec;
use crate::error::{NormError, NormResult};
use crate::generator::Statement;
use crate::monitor::QueryResult;
use crate::row::{FromRow, Row};
use crate::transaction::Transaction;
use crate::value::Value;
use std::time::Duration;

/// Result of a mutating statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Keys the database generated, as reported by the driver.
    pub generated_keys: Option<Row>,
}

/// One database operation under construction.
///
/// Built from [`Database`] (or [`Transaction::query`]) and consumed by
/// exactly one terminal call.
#[must_use = "a query does nothing until a terminal method runs it"]
pub struct Query<'a> {
    db: &'a Database,
    spec: QuerySpec,
    conn: Option<&'a mut Box<dyn Connection>>,
    key_columns: Vec<String>,
    max_latency: Option<Duration>,
}

impl<'a> Query<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self {
            db,
            spec: QuerySpec::default(),
            conn: None,
            key_columns: Vec::new(),
            max_latency: None,
        }
    }

    /// Literal SQL with `?` placeholders. Overrides table, where and order by.
    pub fn sql(mut self, sql: impl Into<String>) -> Self {
        self.spec.sql = Some(sql.into());
        self
    }

    /// Append one positional argument.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.spec.args.push(value.into());
        self
    }

    pub fn binds<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.spec.args.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.spec.table = Some(table.into());
        self
    }

    /// Where clause without the `where` keyword, e.g. `"name=? and age>?"`.
    pub fn where_clause(mut self, clause: impl Into<String>) -> Self {
        self.spec.where_clause = Some(clause.into());
        self
    }

    /// Order-by clause without the keywords, e.g. `"name desc"`.
    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.spec.order_by = Some(order_by.into());
        self
    }

    /// Run on the transaction's connection instead of a fresh one.
    pub fn transaction(mut self, tx: &'a mut Transaction<'_>) -> Self {
        self.conn = tx.connection_mut();
        self
    }

    /// Columns whose generated values should be read back after an insert.
    /// Defaults to the entity's generated columns.
    pub fn generated_keys<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Latency threshold for this query, overriding the database's.
    pub fn max_latency(mut self, latency: Duration) -> Self {
        self.max_latency = Some(latency);
        self
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    /// Run a select and decode every row.
    pub fn results<T: FromRow>(self) -> NormResult<Vec<T>> {
        let stmt = self.db.generator().select::<T>(&self.spec)?;
        let rows = self.run_rows(&stmt, None)?;
        rows.into_iter().map(T::from_row).collect()
    }

    /// Run a select and decode the first row, if any.
    pub fn first<T: FromRow>(self) -> NormResult<Option<T>> {
        let stmt = self.db.generator().select::<T>(&self.spec)?;
        let rows = self.run_rows(&stmt, None)?;
        rows.into_iter().next().map(T::from_row).transpose()
    }

    /// Run the literal SQL as a non-query statement.
    pub fn execute(self) -> NormResult<ExecResult> {
        let Some(sql) = self.spec.sql.clone() else {
            return Err(NormError::mapping("execute() needs literal SQL; call sql() first"));
        };
        let stmt = Statement::new(sql, self.spec.args.clone());
        let keys = KeyRequest::columns(self.key_columns.clone());
        self.run_exec(&stmt, &keys, None)
    }

    /// Insert `record`, then write any generated keys back into it.
    pub fn insert<T: Entity>(self, record: &mut T) -> NormResult<ExecResult> {
        let stmt = self.db.generator().insert(record, &self.spec)?;
        self.exec_with_keys(stmt, record)
    }

    /// Insert or update `record` (dialects with upsert support only).
    pub fn upsert<T: Entity>(self, record: &mut T) -> NormResult<ExecResult> {
        let stmt = self.db.generator().upsert(record, &self.spec)?;
        self.exec_with_keys(stmt, record)
    }

    /// Update the row identified by `record`'s primary key.
    pub fn update<T: Entity>(self, record: &T) -> NormResult<ExecResult> {
        let stmt = self.db.generator().update(record, &self.spec)?;
        let tag = T::descriptor()?.meta().type_name();
        self.run_exec(&stmt, &KeyRequest::none(), Some(tag))
    }

    /// Delete the row identified by `record`'s primary key.
    pub fn delete<T: Entity>(self, record: &T) -> NormResult<ExecResult> {
        let stmt = self.db.generator().delete(record, &self.spec)?;
        let tag = T::descriptor()?.meta().type_name();
        self.run_exec(&stmt, &KeyRequest::none(), Some(tag))
    }

    /// Delete every row of the query's table matching its where clause.
    pub fn delete_where(self) -> NormResult<ExecResult> {
        let stmt = self.db.generator().delete_where(&self.spec)?;
        self.run_exec(&stmt, &KeyRequest::none(), None)
    }

    /// Create `T`'s table.
    pub fn create_table<T: Entity>(self) -> NormResult<ExecResult> {
        let stmt = self.db.generator().create_table::<T>(&self.spec)?;
        let tag = T::descriptor()?.meta().type_name();
        self.run_exec(&stmt, &KeyRequest::none(), Some(tag))
    }

    fn exec_with_keys<T: Entity>(self, stmt: Statement, record: &mut T) -> NormResult<ExecResult> {
        let descriptor = T::descriptor()?;
        let requested = self.key_columns.clone();
        let keys = if requested.is_empty() {
            KeyRequest::columns(descriptor.meta().generated_column_names().iter().cloned())
        } else {
            KeyRequest::columns(requested.iter().cloned())
        };
        let result = self.run_exec(&stmt, &keys, Some(descriptor.meta().type_name()))?;
        if let Some(row) = &result.generated_keys {
            descriptor.populate_generated_keys(record, row, &requested)?;
        }
        Ok(result)
    }

    fn run_rows(self, stmt: &Statement, tag: Option<&str>) -> NormResult<Vec<Row>> {
        let Query {
            db,
            conn,
            max_latency,
            ..
        } = self;
        with_connection(db, conn, |conn| {
            db.observe(
                stmt,
                max_latency,
                tag,
                || conn.query(&stmt.sql, &stmt.args),
                |rows| QueryResult::Rows(rows.len()),
            )
        })
    }

    fn run_exec(
        self,
        stmt: &Statement,
        keys: &KeyRequest,
        tag: Option<&str>,
    ) -> NormResult<ExecResult> {
        let Query {
            db,
            conn,
            max_latency,
            ..
        } = self;
        let outcome = with_connection(db, conn, |conn| {
            db.observe(
                stmt,
                max_latency,
                tag,
                || conn.execute(&stmt.sql, &stmt.args, keys),
                |outcome| QueryResult::Affected(outcome.rows_affected),
            )
        })?;
        Ok(ExecResult {
            rows_affected: outcome.rows_affected,
            generated_keys: outcome.generated_keys,
        })
    }
}

fn with_connection<R>(
    db: &Database,
    conn: Option<&mut Box<dyn Connection>>,
    f: impl FnOnce(&mut dyn Connection) -> NormResult<R>,
) -> NormResult<R> {
    match conn {
        Some(conn) => f(&mut **conn),
        None => {
            let mut guard = ConnectionGuard::new(db.connect()?);
            f(&mut *guard)
        }
    }
}
