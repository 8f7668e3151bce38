//! Database client capability consumed by the execution gateway.
//!
//! The gateway needs very little from a database: run a statement and get an
//! affected-row count, run a query and get rows back as column → value maps,
//! ask for the last generated key, and drive a transaction. Backends implement
//! [`Connection`]; a [`Connector`] opens one from a merged [`DbConfig`].

use crate::builder::quote_table;
use crate::config::{DbConfig, Engine};
use crate::error::{ChainError, ChainResult, DriverError};
use serde_json::{Map, Value};

/// One result row: column name → value, in column order.
pub type Row = Map<String, Value>;

/// A live binding to one database.
///
/// Implementations are driven from one thread at a time; the handle that owns
/// a connection is not shareable between concurrent chains.
pub trait Connection: Send {
    /// Run a statement and return the number of affected rows.
    fn execute(&mut self, sql: &str) -> Result<u64, DriverError>;

    /// Run a statement and return every row it produced.
    fn query(&mut self, sql: &str) -> Result<Vec<Row>, DriverError>;

    /// Key generated by the most recent INSERT, if the backend can supply one.
    fn last_insert_id(&mut self) -> Option<String>;

    fn begin(&mut self) -> Result<(), DriverError>;

    fn commit(&mut self) -> Result<(), DriverError>;

    fn rollback(&mut self) -> Result<(), DriverError>;

    /// Whether a transaction is open on this connection.
    fn in_transaction(&self) -> bool;

    /// Quote a string as a SQL literal.
    ///
    /// The default wraps in single quotes and doubles embedded single quotes.
    fn quote(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Server version string, if known.
    fn server_version(&self) -> Option<String> {
        None
    }

    /// Names of the tables in the connected database.
    ///
    /// The default runs `SHOW TABLES` and takes the first column of each row.
    fn tables(&mut self) -> Result<Vec<String>, DriverError> {
        let rows = self.query("SHOW TABLES")?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .map(|(_, value)| match value {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect())
    }

    /// Column descriptions of `table`, one row per column.
    ///
    /// The default runs `SHOW COLUMNS FROM <table>`.
    fn table_info(&mut self, table: &str) -> Result<Vec<Row>, DriverError> {
        self.query(&format!("SHOW COLUMNS FROM {}", quote_table(table)))
    }
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn execute(&mut self, sql: &str) -> Result<u64, DriverError> {
        (**self).execute(sql)
    }

    fn query(&mut self, sql: &str) -> Result<Vec<Row>, DriverError> {
        (**self).query(sql)
    }

    fn last_insert_id(&mut self) -> Option<String> {
        (**self).last_insert_id()
    }

    fn begin(&mut self) -> Result<(), DriverError> {
        (**self).begin()
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        (**self).commit()
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        (**self).rollback()
    }

    fn in_transaction(&self) -> bool {
        (**self).in_transaction()
    }

    fn quote(&self, value: &str) -> String {
        (**self).quote(value)
    }

    fn server_version(&self) -> Option<String> {
        (**self).server_version()
    }

    fn tables(&mut self) -> Result<Vec<String>, DriverError> {
        (**self).tables()
    }

    fn table_info(&mut self, table: &str) -> Result<Vec<Row>, DriverError> {
        (**self).table_info(table)
    }
}

/// Opens connections from merged configuration records.
pub trait Connector: Send + Sync {
    fn open(&self, config: &DbConfig) -> ChainResult<Box<dyn Connection>>;
}

impl<F> Connector for F
where
    F: Fn(&DbConfig) -> ChainResult<Box<dyn Connection>> + Send + Sync,
{
    fn open(&self, config: &DbConfig) -> ChainResult<Box<dyn Connection>> {
        self(config)
    }
}

/// Connector for the engines with a built-in backend.
///
/// - `sqlite`: [`crate::backend::sqlite::SqliteConnection`] (feature `sqlite`)
/// - `mysql`: no built-in driver; supply your own [`Connector`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConnector;

impl Connector for DefaultConnector {
    fn open(&self, config: &DbConfig) -> ChainResult<Box<dyn Connection>> {
        match config.engine {
            #[cfg(feature = "sqlite")]
            Engine::Sqlite => Ok(Box::new(crate::backend::sqlite::SqliteConnection::open(
                config,
            )?)),
            engine => Err(ChainError::connection(format!(
                "no built-in driver for engine '{engine}' ({}); supply a Connector",
                config.dsn()
            ))),
        }
    }
}
