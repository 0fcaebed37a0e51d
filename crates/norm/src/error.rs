//! Error types for norm

use std::time::Duration;
use thiserror::Error;

/// Result type alias for norm operations
pub type NormResult<T> = Result<T, NormError>;

/// Boxed cause carried by mapping and execution errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for mapping, statement generation and execution.
#[derive(Debug, Error)]
pub enum NormError {
    /// Descriptor construction or property access failed
    #[error("Mapping error: {message}")]
    Mapping {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Two properties resolved to the same column or logical name
    #[error(
        "Duplicate pojo property found: '{column}' in {type_name}. There may be both a field and a getter/setter"
    )]
    DuplicateProperty {
        column: String,
        type_name: &'static str,
    },

    /// An operation that identifies rows by key was used on a keyless descriptor
    #[error("No primary key specified for {type_name}; {operation} needs at least one #[orm(id)] column")]
    MissingPrimaryKey {
        type_name: &'static str,
        operation: &'static str,
    },

    /// Strict property lookup by column name failed
    #[error("No such field: {name}")]
    NoSuchProperty { name: String },

    /// A value could not be converted into the requested Rust type
    #[error("Cannot convert {found} into {expected}")]
    Conversion {
        expected: &'static str,
        found: String,
    },

    /// Writing a decoded column into a record failed
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// The statement executor reported a failure
    #[error("Execution error: {source} [sql: {sql}]")]
    Execution {
        sql: String,
        #[source]
        source: BoxError,
    },

    /// The active dialect does not implement the operation
    #[error("Operation '{operation}' is not supported by the {dialect} dialect")]
    Unsupported {
        dialect: &'static str,
        operation: &'static str,
    },

    /// The connection provider could not yield a connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// Transaction lifecycle error, with the failed `begin`/`commit`/`rollback`
    /// call as its source when there was one
    #[error("Transaction error: {message}")]
    Transaction {
        message: String,
        #[source]
        source: Option<Box<NormError>>,
    },

    /// A statement finished over its latency threshold while
    /// `fail_on_slow_query` is set
    #[error("Query exceeded max latency of {threshold:?} (took {elapsed:?}) [sql: {sql}]")]
    SlowQuery {
        sql: String,
        elapsed: Duration,
        threshold: Duration,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl NormError {
    /// Create a mapping error without an underlying cause
    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Mapping {
            message: message.into(),
            source: None,
        }
    }

    /// Create a mapping error that keeps the originating cause
    pub fn mapping_with(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Mapping {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Wrap an executor failure together with the SQL that triggered it
    pub fn execution(sql: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Execution {
            sql: sql.into(),
            source: source.into(),
        }
    }

    /// Create a transaction error without an underlying cause
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
            source: None,
        }
    }

    /// Create a transaction error caused by a failed connection call
    pub fn transaction_with(message: impl Into<String>, source: NormError) -> Self {
        Self::Transaction {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a conversion error
    pub fn conversion(expected: &'static str, found: impl Into<String>) -> Self {
        Self::Conversion {
            expected,
            found: found.into(),
        }
    }

    /// Create an unsupported-operation error
    pub fn unsupported(dialect: &'static str, operation: &'static str) -> Self {
        Self::Unsupported { dialect, operation }
    }

    /// Check if this error came from descriptor building or property mapping
    pub fn is_mapping(&self) -> bool {
        matches!(
            self,
            Self::Mapping { .. }
                | Self::DuplicateProperty { .. }
                | Self::MissingPrimaryKey { .. }
                | Self::NoSuchProperty { .. }
        )
    }

    /// Check if this error was reported by the statement executor
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }

    /// Check if this is an unsupported-operation error
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// Check if this error reports a latency breach
    pub fn is_slow_query(&self) -> bool {
        matches!(self, Self::SlowQuery { .. })
    }

    /// The SQL text attached to an execution or latency error, looking
    /// through transaction errors to their cause
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Execution { sql, .. } | Self::SlowQuery { sql, .. } => Some(sql),
            Self::Transaction {
                source: Some(source),
                ..
            } => source.sql(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn execution_error_keeps_sql_and_cause() {
        let err = NormError::execution("select 1", "connection reset");
        assert!(err.is_execution());
        assert_eq!(err.sql(), Some("select 1"));
        assert_eq!(err.source().map(|e| e.to_string()).as_deref(), Some("connection reset"));
        assert!(err.to_string().contains("[sql: select 1]"));
    }

    #[test]
    fn duplicate_property_message() {
        let err = NormError::DuplicateProperty {
            column: "name".to_string(),
            type_name: "Person",
        };
        assert!(err.is_mapping());
        assert_eq!(
            err.to_string(),
            "Duplicate pojo property found: 'name' in Person. There may be both a field and a getter/setter"
        );
    }

    #[test]
    fn transaction_error_keeps_its_cause() {
        let cause = NormError::execution("commit", "serialization failure");
        let err = NormError::transaction_with("commit failed", cause);
        assert_eq!(err.to_string(), "Transaction error: commit failed");
        assert_eq!(err.sql(), Some("commit"));
        let source = err.source().map(|e| e.to_string()).unwrap_or_default();
        assert!(source.contains("serialization failure"));

        let bare = NormError::transaction("already finished");
        assert!(bare.source().is_none());
        assert_eq!(bare.sql(), None);
    }

    #[test]
    fn slow_query_error_carries_timings() {
        let err = NormError::SlowQuery {
            sql: "select 1".to_string(),
            elapsed: Duration::from_millis(30),
            threshold: Duration::from_millis(10),
        };
        assert!(err.is_slow_query());
        assert_eq!(err.sql(), Some("select 1"));
        assert!(err.to_string().starts_with("Query exceeded max latency of 10ms"));
    }

    #[test]
    fn mapping_with_exposes_source() {
        let err = NormError::mapping_with("converter failed", "bad input");
        assert!(err.source().is_some());
        assert!(!err.is_unsupported());
    }
}
