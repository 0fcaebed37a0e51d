//! Contracts for the database side: where connections come from and how
//! statements run on them.

use crate::error::NormResult;
use crate::row::Row;
use crate::value::Value;
use std::ops::{Deref, DerefMut};

/// Generated columns an execution should report back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRequest {
    columns: Vec<String>,
}

impl KeyRequest {
    /// No keys wanted.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.columns
    }
}

/// What a non-query statement reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    pub generated_keys: Option<Row>,
}

impl ExecOutcome {
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            generated_keys: None,
        }
    }

    pub fn with_keys(mut self, keys: Row) -> Self {
        self.generated_keys = Some(keys);
        self
    }
}

/// A live database handle, owned by one operation or transaction at a time.
///
/// Statements use `?` placeholders; implementations rewrite them if their
/// driver wants something else.
pub trait Connection: Send {
    fn query(&mut self, sql: &str, args: &[Value]) -> NormResult<Vec<Row>>;

    fn execute(&mut self, sql: &str, args: &[Value], keys: &KeyRequest) -> NormResult<ExecOutcome>;

    fn begin(&mut self) -> NormResult<()>;

    fn commit(&mut self) -> NormResult<()>;

    fn rollback(&mut self) -> NormResult<()>;

    /// Release the handle. Called exactly once.
    fn close(self: Box<Self>) -> NormResult<()>;
}

/// Hands out ready-to-use connections. Pooling, retries and transport are the
/// provider's business.
pub trait ConnectionProvider: Send + Sync {
    fn connect(&self) -> NormResult<Box<dyn Connection>>;
}

impl<F> ConnectionProvider for F
where
    F: Fn() -> NormResult<Box<dyn Connection>> + Send + Sync,
{
    fn connect(&self) -> NormResult<Box<dyn Connection>> {
        self()
    }
}

/// Closes its connection exactly once, on whatever path the guard is left.
pub struct ConnectionGuard {
    conn: Option<Box<dyn Connection>>,
}

impl ConnectionGuard {
    pub fn new(conn: Box<dyn Connection>) -> Self {
        Self { conn: Some(conn) }
    }

    /// Close now and report the result.
    pub fn close(mut self) -> NormResult<()> {
        match self.conn.take() {
            Some(conn) => conn.close(),
            None => Ok(()),
        }
    }

    /// Give up ownership without closing.
    pub fn into_inner(mut self) -> Option<Box<dyn Connection>> {
        self.conn.take()
    }
}

impl Deref for ConnectionGuard {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        // `conn` is only taken by methods that consume the guard.
        match &self.conn {
            Some(conn) => conn.as_ref(),
            None => unreachable!("connection guard used after release"),
        }
    }
}

impl DerefMut for ConnectionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.conn {
            Some(conn) => conn.as_mut(),
            None => unreachable!("connection guard used after release"),
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.close() {
                tracing::warn!(error = %e, "failed to close connection");
            }
        }
    }
}
