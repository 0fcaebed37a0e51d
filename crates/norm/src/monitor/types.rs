use std::fmt;
use std::time::Duration;

/// Kind of statement, detected from its leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    /// `create`, `drop`, `alter`, `truncate`
    Ddl,
    Other,
}

impl QueryType {
    pub fn from_sql(sql: &str) -> Self {
        let trimmed = sql.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
        let keyword: String = trimmed
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_ascii_lowercase();
        match keyword.as_str() {
            "select" | "with" | "values" | "show" => QueryType::Select,
            "insert" | "replace" => QueryType::Insert,
            "update" => QueryType::Update,
            "delete" => QueryType::Delete,
            "create" | "drop" | "alter" | "truncate" => QueryType::Ddl,
            _ => QueryType::Other,
        }
    }
}

/// What is known about a statement when it runs.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub sql: String,
    pub param_count: usize,
    pub query_type: QueryType,
    /// Entity or operation the statement was generated for, if any.
    pub tag: Option<String>,
}

impl QueryContext {
    pub fn new(sql: &str, param_count: usize) -> Self {
        Self {
            sql: sql.to_string(),
            param_count,
            query_type: QueryType::from_sql(sql),
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

const MAX_ERROR_LEN: usize = 512;

/// Outcome of a statement, for monitors.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Rows(usize),
    Affected(u64),
    /// Error message, truncated.
    Error(String),
}

impl QueryResult {
    pub fn error(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        if msg.len() > MAX_ERROR_LEN {
            Self::Error(format!("{}...", super::truncate_sql_bytes(&msg, MAX_ERROR_LEN)))
        } else {
            Self::Error(msg)
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, QueryResult::Error(_))
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryResult::Rows(n) => write!(f, "{n} rows"),
            QueryResult::Affected(n) => write!(f, "{n} affected"),
            QueryResult::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// Observes statement execution.
///
/// Monitors run on the executing thread, so implementations should return
/// quickly and never fail.
pub trait QueryMonitor: Send + Sync {
    fn on_query_start(&self, _ctx: &QueryContext) {}

    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult);

    /// Called after `on_query_complete` when the statement went over its
    /// latency threshold.
    fn on_slow_query(&self, _ctx: &QueryContext, _duration: Duration, _threshold: Duration) {}
}
