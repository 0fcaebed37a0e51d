//! Scripted in-memory executor: records every call and replays canned results.

#![allow(dead_code)]

use norm::{Connection, ConnectionProvider, ExecOutcome, KeyRequest, NormError, NormResult, Row, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Query { sql: String, args: Vec<Value> },
    Execute { sql: String, args: Vec<Value>, keys: Vec<String> },
    Begin,
    Commit,
    Rollback,
    Close,
}

#[derive(Default)]
struct State {
    events: Vec<Event>,
    rows: VecDeque<NormResult<Vec<Row>>>,
    outcomes: VecDeque<NormResult<ExecOutcome>>,
    connects: usize,
    fail_commit: bool,
}

/// Shared script; clone it into the provider and keep a handle for assertions.
#[derive(Clone, Default)]
pub struct Script {
    state: Arc<Mutex<State>>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Rows for the next `query` call. Later calls get no rows.
    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        self.state().rows.push_back(Ok(rows));
        self
    }

    pub fn push_query_error(&self, message: &str) -> &Self {
        self.state()
            .rows
            .push_back(Err(NormError::Other(message.to_string())));
        self
    }

    /// Outcome of the next `execute` call. Later calls report one affected row.
    pub fn push_outcome(&self, outcome: ExecOutcome) -> &Self {
        self.state().outcomes.push_back(Ok(outcome));
        self
    }

    pub fn push_exec_error(&self, message: &str) -> &Self {
        self.state()
            .outcomes
            .push_back(Err(NormError::Other(message.to_string())));
        self
    }

    pub fn fail_commit(&self) {
        self.state().fail_commit = true;
    }

    pub fn events(&self) -> Vec<Event> {
        self.state().events.clone()
    }

    /// SQL of every query and execute call, in order.
    pub fn statements(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Query { sql, .. } | Event::Execute { sql, .. } => Some(sql),
                _ => None,
            })
            .collect()
    }

    pub fn last_args(&self) -> Vec<Value> {
        self.events()
            .into_iter()
            .rev()
            .find_map(|e| match e {
                Event::Query { args, .. } | Event::Execute { args, .. } => Some(args),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn connects(&self) -> usize {
        self.state().connects
    }

    pub fn closes(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Close))
            .count()
    }

    pub fn provider(&self) -> ScriptedProvider {
        ScriptedProvider {
            script: self.clone(),
        }
    }
}

pub struct ScriptedProvider {
    script: Script,
}

impl ConnectionProvider for ScriptedProvider {
    fn connect(&self) -> NormResult<Box<dyn Connection>> {
        self.script.state().connects += 1;
        Ok(Box::new(ScriptedConnection {
            script: self.script.clone(),
        }))
    }
}

struct ScriptedConnection {
    script: Script,
}

impl Connection for ScriptedConnection {
    fn query(&mut self, sql: &str, args: &[Value]) -> NormResult<Vec<Row>> {
        let mut state = self.script.state();
        state.events.push(Event::Query {
            sql: sql.to_string(),
            args: args.to_vec(),
        });
        state.rows.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn execute(&mut self, sql: &str, args: &[Value], keys: &KeyRequest) -> NormResult<ExecOutcome> {
        let mut state = self.script.state();
        state.events.push(Event::Execute {
            sql: sql.to_string(),
            args: args.to_vec(),
            keys: keys.names().to_vec(),
        });
        state
            .outcomes
            .pop_front()
            .unwrap_or_else(|| Ok(ExecOutcome::affected(1)))
    }

    fn begin(&mut self) -> NormResult<()> {
        self.script.state().events.push(Event::Begin);
        Ok(())
    }

    fn commit(&mut self) -> NormResult<()> {
        let mut state = self.script.state();
        state.events.push(Event::Commit);
        if state.fail_commit {
            return Err(NormError::Other("serialization failure".to_string()));
        }
        Ok(())
    }

    fn rollback(&mut self) -> NormResult<()> {
        self.script.state().events.push(Event::Rollback);
        Ok(())
    }

    fn close(self: Box<Self>) -> NormResult<()> {
        self.script.state().events.push(Event::Close);
        Ok(())
    }
}

/// A row built from `(label, value)` pairs.
pub fn row<const N: usize>(pairs: [(&str, Value); N]) -> Row {
    Row::from_pairs(pairs)
}
