//! SQLite backend on top of `rusqlite`.
//!
//! The database name is a file path, or `:memory:` for a private in-memory
//! database. Host, port, credentials and charset do not apply. Each entry in
//! `options` is applied as `PRAGMA <key> = <value>` right after opening.
//!
//! Generated statements use double-quoted value literals, so the connection
//! turns on SQLite's double-quoted string literal support for DML.
//!
//! # Column-named values
//!
//! SQLite only treats a double-quoted token as a string when it does not name
//! a column in scope. A value equal to a column name of the statement's
//! table (`data({"user_name": "age"})`, `where_({"name": "name"})`) is read as
//! that column: SET copies the other column's value and WHERE compares
//! columns. The executed text is the text `*_sql` returns, so this cannot be
//! rewritten per backend. For such values, run the statement through
//! [`ChainDb::sql`](crate::ChainDb::sql) with single-quoted literals from
//! [`ChainDb::quote`](crate::ChainDb::quote).

use crate::client::{Connection, Row};
use crate::config::DbConfig;
use crate::error::{ChainError, ChainResult, DriverError};
use rusqlite::config::DbConfig as SqliteDbConfig;
use rusqlite::types::ValueRef;
use serde_json::Value;

pub const MEMORY: &str = ":memory:";

/// A [`Connection`] backed by one `rusqlite::Connection`.
///
/// Values that equal a column name are read as that column; see the
/// [module docs](crate::backend::sqlite#column-named-values).
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    /// Open the database named by `config` and apply its options.
    pub fn open(config: &DbConfig) -> ChainResult<Self> {
        config.validate()?;
        let conn = if config.name == MEMORY {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&config.name)
        }
        .map_err(|e| ChainError::connection(format!("{}: {e}", config.dsn())))?;

        conn.set_db_config(SqliteDbConfig::SQLITE_DBCONFIG_DQS_DML, true)
            .map_err(|e| ChainError::connection(e.to_string()))?;

        for (key, value) in &config.options {
            apply_pragma(&conn, key, value)
                .map_err(|e| ChainError::connection(format!("PRAGMA {key}: {e}")))?;
        }

        Ok(Self { conn })
    }

    /// Wrap an already opened connection.
    pub fn from_rusqlite(conn: rusqlite::Connection) -> Self {
        Self { conn }
    }

    pub fn inner(&self) -> &rusqlite::Connection {
        &self.conn
    }
}

fn apply_pragma(conn: &rusqlite::Connection, key: &str, value: &Value) -> rusqlite::Result<()> {
    match value {
        Value::Bool(b) => conn.pragma_update(None, key, *b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => conn.pragma_update(None, key, i),
            None => conn.pragma_update(None, key, n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => conn.pragma_update(None, key, s.as_str()),
        other => conn.pragma_update(None, key, other.to_string()),
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(hex::encode(bytes)),
    }
}

impl Connection for SqliteConnection {
    fn execute(&mut self, sql: &str) -> Result<u64, DriverError> {
        let affected = self.conn.execute(sql, [])?;
        Ok(affected as u64)
    }

    fn query(&mut self, sql: &str) -> Result<Vec<Row>, DriverError> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (i, name) in columns.iter().enumerate() {
                record.insert(name.clone(), to_json(row.get_ref(i)?));
            }
            out.push(record);
        }
        Ok(out)
    }

    fn last_insert_id(&mut self) -> Option<String> {
        match self.conn.last_insert_rowid() {
            0 => None,
            id => Some(id.to_string()),
        }
    }

    fn begin(&mut self) -> Result<(), DriverError> {
        Ok(self.conn.execute_batch("BEGIN")?)
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        Ok(self.conn.execute_batch("COMMIT")?)
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        Ok(self.conn.execute_batch("ROLLBACK")?)
    }

    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn server_version(&self) -> Option<String> {
        Some(rusqlite::version().to_string())
    }

    fn tables(&mut self) -> Result<Vec<String>, DriverError> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' \
             AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn table_info(&mut self, table: &str) -> Result<Vec<Row>, DriverError> {
        let sql = format!("PRAGMA table_info({})", self.quote(table));
        self.query(&sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_mem() -> SqliteConnection {
        SqliteConnection::open(&DbConfig::sqlite(MEMORY)).expect("open in-memory sqlite")
    }

    #[test]
    fn executes_and_queries() {
        let mut conn = open_mem();
        conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT, score REAL)")
            .unwrap();
        assert_eq!(
            conn.execute(r#"INSERT INTO t (name, score) VALUES ("a", 1.5)"#).unwrap(),
            1
        );
        assert_eq!(conn.last_insert_id().as_deref(), Some("1"));

        let rows = conn.query("SELECT id, name, score FROM t").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], Value::from(1));
        assert_eq!(rows[0]["name"], Value::from("a"));
        assert_eq!(rows[0]["score"], Value::from(1.5));
        assert_eq!(
            rows[0].keys().collect::<Vec<_>>(),
            vec!["id", "name", "score"]
        );
    }

    #[test]
    fn reports_errors_with_code() {
        let mut conn = open_mem();
        let err = conn.query("SELECT * FROM missing").unwrap_err();
        assert!(err.message.contains("no such table"));
        assert!(!err.code.is_empty());
    }

    #[test]
    fn applies_pragmas() {
        let config = DbConfig::sqlite(MEMORY).option("user_version", 7);
        let mut conn = SqliteConnection::open(&config).unwrap();
        let rows = conn.query("PRAGMA user_version").unwrap();
        assert_eq!(rows[0]["user_version"], Value::from(7));
    }

    #[test]
    fn lists_tables() {
        let mut conn = open_mem();
        conn.execute("CREATE TABLE b (id INTEGER)").unwrap();
        conn.execute("CREATE TABLE a (id INTEGER)").unwrap();
        assert_eq!(conn.tables().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn describes_table_columns() {
        let mut conn = open_mem();
        conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
            .unwrap();
        let info = conn.table_info("t").unwrap();
        let names: Vec<Option<&str>> = info.iter().map(|row| row["name"].as_str()).collect();
        assert_eq!(names, vec![Some("id"), Some("name")]);
        assert_eq!(info[1]["type"], Value::from("TEXT"));
        assert_eq!(info[1]["notnull"], Value::from(1));
        assert!(conn.table_info("missing").unwrap().is_empty());
    }

    #[test]
    fn rollback_discards_changes() {
        let mut conn = open_mem();
        conn.execute("CREATE TABLE t (id INTEGER)").unwrap();
        assert!(!conn.in_transaction());
        conn.begin().unwrap();
        assert!(conn.in_transaction());
        conn.execute("INSERT INTO t (id) VALUES (1)").unwrap();
        conn.rollback().unwrap();
        assert!(!conn.in_transaction());
        assert!(conn.query("SELECT * FROM t").unwrap().is_empty());
    }
}
