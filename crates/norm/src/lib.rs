//! # norm
//!
//! A small object/relational mapper: describe a record type once, get
//! dialect-aware SQL for it, and decode rows back into it.
//!
//! ## Features
//!
//! - **Descriptors, not reflection**: `#[derive(Entity)]` produces a validated
//!   descriptor (table, columns, keys, codecs) that is built once and cached
//! - **Plain SQL out**: insert/update/upsert/delete/select/create-table with
//!   `?` placeholders and ordered arguments
//! - **Dialects**: standard SQL, MySQL (`on duplicate key update` upserts),
//!   PostgreSQL (`serial` columns)
//! - **Value codecs**: enums by name or ordinal, attribute converters, text serializers
//! - **Pluggable executor**: bring a [`ConnectionProvider`], or enable the
//!   `postgres` feature
//! - **Query monitoring**: statement timing, slow-query alerts with backoff
//!
//! ```ignore
//! use norm::prelude::*;
//!
//! #[derive(Debug, Default, Entity)]
//! #[orm(table = "people")]
//! struct Person {
//!     #[orm(id, generated)]
//!     id: i64,
//!     name: String,
//!     #[orm(transient)]
//!     scratch: String,
//! }
//!
//! let db = Database::new(provider, DatabaseConfig::from_env()?);
//! db.create_table::<Person>()?;
//!
//! let mut bob = Person { name: "bob".into(), ..Default::default() };
//! db.insert(&mut bob)?;          // bob.id is now set
//!
//! let people: Vec<Person> = db.where_clause("name=?").bind("bob").order_by("id").results()?;
//! let count: Option<i64> = db.sql("select count(*) from people").first()?;
//! ```

// Lets `::norm::` paths emitted by the derive macros resolve inside this crate.
extern crate self as norm;

pub mod codec;
pub mod config;
pub mod connection;
pub mod converter;
pub mod database;
pub mod descriptor;
pub mod dialect;
pub mod error;
pub mod generator;
pub mod monitor;
pub mod prelude;
pub mod query;
pub mod registry;
pub mod row;
pub mod transaction;
pub mod value;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use codec::{AttributeConverter, DbEnum, DbSerializer, EnumEncoding, EnumInfo, ValueCodec};
pub use config::DatabaseConfig;
pub use connection::{Connection, ConnectionGuard, ConnectionProvider, ExecOutcome, KeyRequest};
pub use converter::{IntListConverter, JsonSerializer};
pub use database::Database;
pub use descriptor::{
    Accessor, ColumnConstraints, ColumnMeta, ColumnType, ColumnValues, DataType,
    DescriptorBuilder, Entity, EntityDescriptor, Property, PropertyDef, TableMeta,
};
pub use dialect::{DialectKind, MySqlDialect, PostgresDialect, QuerySpec, SqlDialect, StandardDialect};
pub use error::{BoxError, NormError, NormResult};
pub use generator::{Statement, StatementGenerator};
pub use monitor::{
    BackoffMonitor, CompositeMonitor, MonitorConfig, NoopMonitor, QueryContext, QueryMonitor,
    QueryResult, QueryStats, QueryType, StatsMonitor, TracingMonitor,
};
pub use query::{ExecResult, Query};
pub use registry::EntityRegistration;
pub use row::{FromRow, Record, Row};
pub use transaction::Transaction;
pub use value::{FromValue, ToValue, Value};

#[cfg(feature = "derive")]
pub use norm_derive::{DbEnum, Entity};

// Re-export inventory for use by derive macros
pub use inventory;
