//! The database handle.

use crate::config::DatabaseConfig;
use crate::connection::{Connection, ConnectionProvider};
use crate::descriptor::Entity;
use crate::dialect::SqlDialect;
use crate::error::{NormError, NormResult};
use crate::generator::{Statement, StatementGenerator};
use crate::monitor::{
    truncate_sql_bytes, MonitorConfig, QueryContext, QueryMonitor, QueryResult, TracingMonitor,
};
use crate::query::{ExecResult, Query};
use crate::row::FromRow;
use crate::transaction::Transaction;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Entry point: a connection provider, the active dialect and monitoring.
///
/// ```rust,ignore
/// let db = Database::new(provider, DatabaseConfig::new().dialect(DialectKind::MySql));
/// db.create_table::<Person>()?;
/// let mut bob = Person { name: "bob".into(), ..Default::default() };
/// db.insert(&mut bob)?;
/// let people: Vec<Person> = db.where_clause("name=?").bind("bob").results()?;
/// ```
pub struct Database {
    provider: Arc<dyn ConnectionProvider>,
    dialect: RwLock<Arc<dyn SqlDialect>>,
    config: DatabaseConfig,
    monitor: Arc<dyn QueryMonitor>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("dialect", &self.dialect().name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Database {
    pub fn new<P: ConnectionProvider + 'static>(provider: P, config: DatabaseConfig) -> Self {
        Self::from_arc(Arc::new(provider), config)
    }

    pub fn from_arc(provider: Arc<dyn ConnectionProvider>, config: DatabaseConfig) -> Self {
        let monitor = TracingMonitor::new().max_sql_length(config.max_sql_log_length);
        Self {
            provider,
            dialect: RwLock::new(config.dialect.into_dialect()),
            config,
            monitor: Arc::new(monitor),
        }
    }

    /// Replace the default [`TracingMonitor`].
    pub fn with_monitor<M: QueryMonitor + 'static>(self, monitor: M) -> Self {
        self.with_monitor_arc(Arc::new(monitor))
    }

    pub fn with_monitor_arc(mut self, monitor: Arc<dyn QueryMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        self.config.monitor_config()
    }

    /// The active dialect.
    pub fn dialect(&self) -> Arc<dyn SqlDialect> {
        Arc::clone(&self.dialect.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Switch dialects. Statements already generated keep the old one.
    pub fn set_dialect(&self, dialect: Arc<dyn SqlDialect>) {
        tracing::debug!(target: "norm.sql", dialect = dialect.name(), "switching dialect");
        *self.dialect.write().unwrap_or_else(PoisonError::into_inner) = dialect;
    }

    /// A generator bound to the active dialect.
    pub fn generator(&self) -> StatementGenerator {
        StatementGenerator::new(self.dialect())
    }

    pub(crate) fn connect(&self) -> NormResult<Box<dyn Connection>> {
        self.provider.connect()
    }

    pub fn query(&self) -> Query<'_> {
        Query::new(self)
    }

    pub fn sql(&self, sql: impl Into<String>) -> Query<'_> {
        self.query().sql(sql)
    }

    pub fn table(&self, table: impl Into<String>) -> Query<'_> {
        self.query().table(table)
    }

    pub fn where_clause(&self, clause: impl Into<String>) -> Query<'_> {
        self.query().where_clause(clause)
    }

    pub fn order_by(&self, order_by: impl Into<String>) -> Query<'_> {
        self.query().order_by(order_by)
    }

    pub fn insert<T: Entity>(&self, record: &mut T) -> NormResult<ExecResult> {
        self.query().insert(record)
    }

    pub fn update<T: Entity>(&self, record: &T) -> NormResult<ExecResult> {
        self.query().update(record)
    }

    pub fn upsert<T: Entity>(&self, record: &mut T) -> NormResult<ExecResult> {
        self.query().upsert(record)
    }

    pub fn delete<T: Entity>(&self, record: &T) -> NormResult<ExecResult> {
        self.query().delete(record)
    }

    /// Every row of `T`'s table.
    pub fn results<T: FromRow>(&self) -> NormResult<Vec<T>> {
        self.query().results()
    }

    pub fn first<T: FromRow>(&self) -> NormResult<Option<T>> {
        self.query().first()
    }

    pub fn create_table<T: Entity>(&self) -> NormResult<ExecResult> {
        self.query().create_table::<T>()
    }

    /// Start a transaction on a dedicated connection.
    pub fn begin(&self) -> NormResult<Transaction<'_>> {
        Transaction::begin(self)
    }

    /// Log, time and monitor one statement.
    pub(crate) fn observe<R>(
        &self,
        stmt: &Statement,
        max_latency: Option<Duration>,
        tag: Option<&str>,
        run: impl FnOnce() -> NormResult<R>,
        summarize: impl FnOnce(&R) -> QueryResult,
    ) -> NormResult<R> {
        if self.config.log_sql {
            let sql = match self.config.max_sql_log_length {
                Some(max) if stmt.sql.len() > max => {
                    format!("{}...", truncate_sql_bytes(&stmt.sql, max))
                }
                _ => stmt.sql.clone(),
            };
            tracing::debug!(target: "norm.sql", sql = %sql, params = stmt.args.len(), "executing");
        }

        let mut ctx = QueryContext::new(&stmt.sql, stmt.args.len());
        if let Some(tag) = tag {
            ctx = ctx.with_tag(tag);
        }
        self.monitor.on_query_start(&ctx);

        let started = Instant::now();
        let outcome = run().map_err(|e| match e {
            NormError::Execution { .. } => e,
            other => NormError::execution(stmt.sql.clone(), other),
        });
        let elapsed = started.elapsed();

        let summary = match &outcome {
            Ok(value) => summarize(value),
            Err(e) => QueryResult::error(e.to_string()),
        };
        self.monitor.on_query_complete(&ctx, elapsed, &summary);

        let threshold = max_latency.or(self.config.max_latency);
        if let Some(threshold) = threshold {
            if MonitorConfig::is_slow(threshold, elapsed) {
                self.monitor.on_slow_query(&ctx, elapsed, threshold);
                if self.config.fail_on_slow_query && outcome.is_ok() {
                    return Err(NormError::SlowQuery {
                        sql: stmt.sql.clone(),
                        elapsed,
                        threshold,
                    });
                }
            }
        }

        outcome
    }
}
