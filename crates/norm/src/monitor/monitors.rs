use super::truncate_sql_bytes;
use super::types::{QueryContext, QueryMonitor, QueryResult, QueryType};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitor;

impl QueryMonitor for NoopMonitor {
    fn on_query_complete(&self, _ctx: &QueryContext, _duration: Duration, _result: &QueryResult) {}
}

/// Reports statements through `tracing` on the `norm.monitor` target:
/// completions at `DEBUG`, slow statements at `WARN`.
#[derive(Debug, Clone)]
pub struct TracingMonitor {
    /// Skip completions faster than this.
    pub min_duration: Option<Duration>,
    /// Truncate logged SQL to this many bytes.
    pub max_sql_length: Option<usize>,
}

impl Default for TracingMonitor {
    fn default() -> Self {
        Self {
            min_duration: None,
            max_sql_length: Some(200),
        }
    }
}

impl TracingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_duration(mut self, duration: Duration) -> Self {
        self.min_duration = Some(duration);
        self
    }

    pub fn max_sql_length(mut self, len: Option<usize>) -> Self {
        self.max_sql_length = len;
        self
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }
}

impl QueryMonitor for TracingMonitor {
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        if self.min_duration.is_some_and(|min| duration < min) {
            return;
        }
        tracing::debug!(
            target: "norm.monitor",
            query_type = ?ctx.query_type,
            tag = ctx.tag.as_deref().unwrap_or("-"),
            elapsed_ms = duration.as_millis() as u64,
            result = %result,
            sql = %self.truncate_sql(&ctx.sql),
            "statement complete"
        );
    }

    fn on_slow_query(&self, ctx: &QueryContext, duration: Duration, threshold: Duration) {
        tracing::warn!(
            target: "norm.monitor",
            query_type = ?ctx.query_type,
            elapsed_ms = duration.as_millis() as u64,
            threshold_ms = threshold.as_millis() as u64,
            params = ctx.param_count,
            sql = %self.truncate_sql(&ctx.sql),
            "database latency over threshold"
        );
    }
}

/// Counts statements by type, failures and time spent.
#[derive(Debug, Default)]
pub struct StatsMonitor {
    total_queries: AtomicU64,
    failed_queries: AtomicU64,
    slow_queries: AtomicU64,
    total_duration_nanos: AtomicU64,
    select_count: AtomicU64,
    insert_count: AtomicU64,
    update_count: AtomicU64,
    delete_count: AtomicU64,
    max_duration_nanos: AtomicU64,
    slowest_query: Mutex<Option<String>>,
}

/// Snapshot of a [`StatsMonitor`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryStats {
    pub total_queries: u64,
    pub failed_queries: u64,
    pub slow_queries: u64,
    pub total_duration: Duration,
    pub select_count: u64,
    pub insert_count: u64,
    pub update_count: u64,
    pub delete_count: u64,
    pub max_duration: Duration,
    pub slowest_query: Option<String>,
}

fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

impl StatsMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> QueryStats {
        QueryStats {
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            slow_queries: self.slow_queries.load(Ordering::Relaxed),
            total_duration: Duration::from_nanos(self.total_duration_nanos.load(Ordering::Relaxed)),
            select_count: self.select_count.load(Ordering::Relaxed),
            insert_count: self.insert_count.load(Ordering::Relaxed),
            update_count: self.update_count.load(Ordering::Relaxed),
            delete_count: self.delete_count.load(Ordering::Relaxed),
            max_duration: Duration::from_nanos(self.max_duration_nanos.load(Ordering::Relaxed)),
            slowest_query: self
                .slowest_query
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.total_queries,
            &self.failed_queries,
            &self.slow_queries,
            &self.total_duration_nanos,
            &self.select_count,
            &self.insert_count,
            &self.update_count,
            &self.delete_count,
            &self.max_duration_nanos,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        *self
            .slowest_query
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl QueryMonitor for StatsMonitor {
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        let duration_nanos = nanos(duration);

        self.total_queries.fetch_add(1, Ordering::Relaxed);
        let prev_total = self
            .total_duration_nanos
            .fetch_add(duration_nanos, Ordering::Relaxed);
        if prev_total.checked_add(duration_nanos).is_none() {
            self.total_duration_nanos.store(u64::MAX, Ordering::Relaxed);
        }

        let counter = match ctx.query_type {
            QueryType::Select => Some(&self.select_count),
            QueryType::Insert => Some(&self.insert_count),
            QueryType::Update => Some(&self.update_count),
            QueryType::Delete => Some(&self.delete_count),
            QueryType::Ddl | QueryType::Other => None,
        };
        if let Some(counter) = counter {
            counter.fetch_add(1, Ordering::Relaxed);
        }

        if result.is_error() {
            self.failed_queries.fetch_add(1, Ordering::Relaxed);
        }

        let mut current_max = self.max_duration_nanos.load(Ordering::Relaxed);
        while duration_nanos > current_max {
            match self.max_duration_nanos.compare_exchange_weak(
                current_max,
                duration_nanos,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    *self
                        .slowest_query
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner) = Some(ctx.sql.clone());
                    break;
                }
                Err(updated) => current_max = updated,
            }
        }
    }

    fn on_slow_query(&self, _ctx: &QueryContext, _duration: Duration, _threshold: Duration) {
        self.slow_queries.fetch_add(1, Ordering::Relaxed);
    }
}

/// Fans events out to several monitors in order.
#[derive(Default)]
pub struct CompositeMonitor {
    monitors: Vec<Arc<dyn QueryMonitor>>,
}

impl CompositeMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add<M: QueryMonitor + 'static>(mut self, monitor: M) -> Self {
        self.monitors.push(Arc::new(monitor));
        self
    }

    pub fn add_arc(mut self, monitor: Arc<dyn QueryMonitor>) -> Self {
        self.monitors.push(monitor);
        self
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

impl QueryMonitor for CompositeMonitor {
    fn on_query_start(&self, ctx: &QueryContext) {
        for monitor in &self.monitors {
            monitor.on_query_start(ctx);
        }
    }

    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        for monitor in &self.monitors {
            monitor.on_query_complete(ctx, duration, result);
        }
    }

    fn on_slow_query(&self, ctx: &QueryContext, duration: Duration, threshold: Duration) {
        for monitor in &self.monitors {
            monitor.on_slow_query(ctx, duration, threshold);
        }
    }
}

/// Longest wait between reports, so the next deadline stays representable.
const MAX_BACKOFF: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug)]
struct BackoffState {
    next_report: Instant,
    backoffs: f64,
    swallowed: u64,
    swallowed_total: u64,
}

/// Rate-limits slow-statement alerts to the wrapped monitor.
///
/// After an alert is forwarded, the next one is held back for
/// `min_interval * 2^n`, where `n` grows by one for every window in which
/// alerts had to be swallowed and shrinks by a quarter otherwise. The wait
/// never exceeds `max_interval`. Completions always pass through.
pub struct BackoffMonitor {
    inner: Arc<dyn QueryMonitor>,
    min_interval: Duration,
    max_interval: Duration,
    state: Mutex<BackoffState>,
}

impl BackoffMonitor {
    pub fn new<M: QueryMonitor + 'static>(
        inner: M,
        min_interval: Duration,
        max_interval: Duration,
    ) -> Self {
        Self::from_arc(Arc::new(inner), min_interval, max_interval)
    }

    pub fn from_arc(
        inner: Arc<dyn QueryMonitor>,
        min_interval: Duration,
        max_interval: Duration,
    ) -> Self {
        let max_interval = max_interval.max(min_interval).min(MAX_BACKOFF);
        Self {
            inner,
            min_interval: min_interval.min(max_interval),
            max_interval,
            state: Mutex::new(BackoffState {
                next_report: Instant::now(),
                backoffs: 1.0,
                swallowed: 0,
                swallowed_total: 0,
            }),
        }
    }

    /// Alerts held back since the monitor was created.
    pub fn swallowed_total(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .swallowed_total
    }

    fn wait_time(&self, state: &mut BackoffState) -> Duration {
        state.backoffs += if state.swallowed > 0 { 1.0 } else { -0.25 };
        state.backoffs = state.backoffs.max(1.0);
        let scaled = self.min_interval.as_secs_f64() * 2f64.powf(state.backoffs.floor());
        match Duration::try_from_secs_f64(scaled) {
            Ok(wait) if wait <= self.max_interval => wait,
            _ => {
                state.backoffs -= 1.0;
                self.max_interval
            }
        }
    }
}

impl QueryMonitor for BackoffMonitor {
    fn on_query_start(&self, ctx: &QueryContext) {
        self.inner.on_query_start(ctx);
    }

    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        self.inner.on_query_complete(ctx, duration, result);
    }

    fn on_slow_query(&self, ctx: &QueryContext, duration: Duration, threshold: Duration) {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.next_report <= now {
            if state.swallowed > 0 {
                tracing::info!(
                    target: "norm.monitor",
                    swallowed = state.swallowed,
                    "latency alerts held back since the previous report"
                );
            }
            self.inner.on_slow_query(ctx, duration, threshold);
            let wait = self.wait_time(&mut state);
            state.next_report = now + wait;
            state.swallowed = 0;
        } else {
            state.swallowed += 1;
            state.swallowed_total += 1;
            tracing::trace!(
                target: "norm.monitor",
                elapsed_ms = duration.as_millis() as u64,
                "swallowed latency alert"
            );
        }
    }
}
