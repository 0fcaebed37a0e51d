//! Common imports.
//!
//! ```ignore
//! use norm::prelude::*;
//! ```

pub use crate::{
    Database, DatabaseConfig, DbEnum, DialectKind, Entity, FromRow, FromValue, NormError,
    NormResult, Query, Record, Row, ToValue, Transaction, Value,
};
