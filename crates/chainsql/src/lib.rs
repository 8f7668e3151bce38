//! # chainsql
//!
//! Chain-style SQL construction and execution over a minimal database client.
//!
//! ## Features
//!
//! - **Chained clauses**: `field`, `where_`, `group`, `order`, `limit`, `data`, ... record
//!   intent on a handle; one terminal call turns them into one statement
//! - **Build or run**: every statement has a `*_sql` twin that returns the exact text
//!   that would have been executed
//! - **Shape checks**: row payloads are validated before any SQL is produced
//! - **Typed results**: rows as ordered column → value maps, mutations as a row count or
//!   a generated key
//! - **Registry**: several handles built from one configuration, rebuilt only when the
//!   configuration fingerprint changes
//! - **Statement monitoring**: `tracing` events plus pluggable monitors and a file log
//!
//! ## Example
//!
//! ```
//! # #[cfg(feature = "sqlite")]
//! # fn main() -> chainsql::ChainResult<()> {
//! use chainsql::{DbConfig, MutateResult, Registry};
//! use serde_json::json;
//!
//! let mut registry = Registry::with_default_connector();
//! registry.build(DbConfig::sqlite(":memory:"))?;
//! let db = registry.get_db_mut(0)?;
//!
//! db.sql("CREATE TABLE user (id INTEGER PRIMARY KEY, user_name TEXT)")?;
//! let inserted = db
//!     .data_rows(json!(["id", "user_name"]), json!([[1, "zhangsan"], [2, "lisi"]]))
//!     .insert("user")?;
//! assert_eq!(inserted, MutateResult::Affected(2));
//!
//! assert_eq!(
//!     db.where_(json!({"user_name": "lisi"})).select_sql("user")?,
//!     r#"SELECT * FROM `user` WHERE `user_name`="lisi""#
//! );
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "sqlite"))]
//! # fn main() {}
//! ```
//!
//! Values are written into the statement as quoted literals, not bound as
//! parameters. Do not pass untrusted input through `where_` text or table names.
//!
//! On SQLite a double-quoted literal that matches a column name is read as the
//! column, so such values silently address the column instead of the text. See
//! [`backend::sqlite`](crate::backend::sqlite#column-named-values).

pub mod backend;
pub mod builder;
pub mod clause;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod ident;
pub mod literal;
pub mod monitor;
pub mod options;
pub mod registry;
pub mod sql;
pub mod transaction;
pub mod validate;

pub use client::{Connection, Connector, DefaultConnector, Row};
pub use config::{DbConfig, DbKey, Engine, RegistryConfig};
pub use db::{ChainDb, MutateResult, SqlOutcome};
pub use error::{ChainError, ChainResult, DriverError};
pub use monitor::{
    CompositeMonitor, FileLogMonitor, LoggingMonitor, MonitorConfig, NoopMonitor,
    StatementContext, StatementMonitor, StatementOutcome, StatementStats, StatsMonitor,
};
pub use options::{ClauseKey, DataPayload, Filter, Limit, OptionStore, Tokens};
pub use registry::{Registry, SharedRegistry};
pub use sql::StatementKind;

#[cfg(feature = "sqlite")]
pub use backend::sqlite::SqliteConnection;
