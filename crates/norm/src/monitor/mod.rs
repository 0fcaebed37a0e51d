//! Statement monitoring.
//!
//! Every statement a [`Database`](crate::Database) runs is reported to its
//! [`QueryMonitor`]; statements over the latency threshold are additionally
//! reported as slow.
//!
//! ```rust,ignore
//! use norm::monitor::{BackoffMonitor, CompositeMonitor, StatsMonitor, TracingMonitor};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let stats = Arc::new(StatsMonitor::new());
//! let monitor = CompositeMonitor::new()
//!     .add_arc(stats.clone())
//!     .add(BackoffMonitor::new(
//!         TracingMonitor::new(),
//!         Duration::from_millis(500),
//!         Duration::from_secs(600),
//!     ));
//! let db = Database::new(provider, config).with_monitor(monitor);
//! ```

mod config;
mod monitors;
mod types;


pub use config::MonitorConfig;
pub use monitors::{
    BackoffMonitor, CompositeMonitor, NoopMonitor, QueryStats, StatsMonitor, TracingMonitor,
};
pub use types::{QueryContext, QueryMonitor, QueryResult, QueryType};

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
