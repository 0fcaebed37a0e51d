use std::time::Duration;

/// Monitoring settings of a [`Database`](crate::Database).
#[derive(Debug, Clone, Default)]
pub struct MonitorConfig {
    /// Statements slower than this are reported through `on_slow_query`.
    /// `Some(Duration::ZERO)` reports every statement.
    pub slow_query_threshold: Option<Duration>,
}

impl MonitorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    /// Whether `elapsed` goes over `threshold`. A zero threshold always does.
    pub fn is_slow(threshold: Duration, elapsed: Duration) -> bool {
        threshold.is_zero() || elapsed > threshold
    }
}
