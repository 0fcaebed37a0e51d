//! Database handle configuration.

use crate::dialect::DialectKind;
use crate::error::{NormError, NormResult};
use crate::monitor::MonitorConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Settings for a [`Database`](crate::Database).
///
/// Built in code, from `NORM_*` environment variables, or from TOML:
///
/// ```toml
/// dialect = "mysql"
/// max_latency_ms = 250
/// log_sql = true
/// max_sql_log_length = 200
/// fail_on_slow_query = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub dialect: DialectKind,
    /// Statements slower than this are reported as slow. `Some(ZERO)`
    /// reports every statement; `None` disables latency checks.
    pub max_latency: Option<Duration>,
    /// Log every statement on `norm.sql` at `DEBUG`.
    pub log_sql: bool,
    /// Truncate logged SQL to this many bytes.
    pub max_sql_log_length: Option<usize>,
    /// Turn a latency breach into a [`NormError::SlowQuery`] after the
    /// monitor has seen it. Meant for test environments.
    pub fail_on_slow_query: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dialect: DialectKind::Standard,
            max_latency: None,
            log_sql: true,
            max_sql_log_length: Some(200),
            fail_on_slow_query: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    dialect: Option<DialectKind>,
    #[serde(default)]
    max_latency_ms: Option<u64>,
    #[serde(default)]
    log_sql: Option<bool>,
    #[serde(default)]
    max_sql_log_length: Option<usize>,
    #[serde(default)]
    fail_on_slow_query: Option<bool>,
}

impl DatabaseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dialect(mut self, dialect: DialectKind) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn max_latency(mut self, latency: Duration) -> Self {
        self.max_latency = Some(latency);
        self
    }

    pub fn log_sql(mut self, enabled: bool) -> Self {
        self.log_sql = enabled;
        self
    }

    pub fn max_sql_log_length(mut self, len: Option<usize>) -> Self {
        self.max_sql_log_length = len;
        self
    }

    pub fn fail_on_slow_query(mut self, enabled: bool) -> Self {
        self.fail_on_slow_query = enabled;
        self
    }

    /// Defaults overridden by `NORM_DIALECT`, `NORM_MAX_LATENCY_MS`,
    /// `NORM_LOG_SQL` and `NORM_FAIL_ON_SLOW_QUERY` when set.
    pub fn from_env() -> NormResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> NormResult<Self> {
        let mut config = Self::default();
        if let Some(dialect) = lookup("NORM_DIALECT") {
            config.dialect = dialect.parse()?;
        }
        if let Some(ms) = lookup("NORM_MAX_LATENCY_MS") {
            let ms = ms.trim().parse::<u64>().map_err(|e| {
                NormError::Config(format!("NORM_MAX_LATENCY_MS must be milliseconds: {e}"))
            })?;
            config.max_latency = Some(Duration::from_millis(ms));
        }
        if let Some(flag) = lookup("NORM_LOG_SQL") {
            config.log_sql = parse_flag("NORM_LOG_SQL", &flag)?;
        }
        if let Some(flag) = lookup("NORM_FAIL_ON_SLOW_QUERY") {
            config.fail_on_slow_query = parse_flag("NORM_FAIL_ON_SLOW_QUERY", &flag)?;
        }
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> NormResult<Self> {
        let file: ConfigFile = toml::from_str(raw)
            .map_err(|e| NormError::Config(format!("failed to parse config: {e}")))?;
        let defaults = Self::default();
        Ok(Self {
            dialect: file.dialect.unwrap_or(defaults.dialect),
            max_latency: file.max_latency_ms.map(Duration::from_millis),
            log_sql: file.log_sql.unwrap_or(defaults.log_sql),
            max_sql_log_length: file.max_sql_log_length.or(defaults.max_sql_log_length),
            fail_on_slow_query: file
                .fail_on_slow_query
                .unwrap_or(defaults.fail_on_slow_query),
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> NormResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            NormError::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            slow_query_threshold: self.max_latency,
        }
    }
}

fn parse_flag(key: &str, raw: &str) -> NormResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(NormError::Config(format!(
            "{key} must be a boolean, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.dialect, DialectKind::Standard);
        assert!(config.log_sql);
        assert_eq!(config.max_sql_log_length, Some(200));
        assert!(!config.fail_on_slow_query);
        assert_eq!(config.monitor_config().slow_query_threshold, None);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = DatabaseConfig::from_toml_str(
            r#"
            dialect = "postgresql"
            max_latency_ms = 250
            log_sql = false
            fail_on_slow_query = true
            "#,
        )
        .unwrap();
        assert_eq!(config.dialect, DialectKind::Postgres);
        assert_eq!(config.max_latency, Some(Duration::from_millis(250)));
        assert!(!config.log_sql);
        assert!(config.fail_on_slow_query);
        assert_eq!(config.max_sql_log_length, Some(200));
    }

    #[test]
    fn toml_rejects_unknown_keys() {
        let err = DatabaseConfig::from_toml_str("dialekt = \"mysql\"").unwrap_err();
        assert!(matches!(err, NormError::Config(_)));
    }

    #[test]
    fn env_lookup() {
        let vars: HashMap<&str, &str> =
            HashMap::from([("NORM_DIALECT", "MySQL"), ("NORM_MAX_LATENCY_MS", "0")]);
        let config =
            DatabaseConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.dialect, DialectKind::MySql);
        assert_eq!(config.max_latency, Some(Duration::ZERO));

        let strict = DatabaseConfig::from_lookup(|k| {
            (k == "NORM_FAIL_ON_SLOW_QUERY").then(|| "on".into())
        })
        .unwrap();
        assert!(strict.fail_on_slow_query);

        let bad = DatabaseConfig::from_lookup(|k| (k == "NORM_MAX_LATENCY_MS").then(|| "soon".into()));
        assert!(matches!(bad, Err(NormError::Config(_))));
    }
}
