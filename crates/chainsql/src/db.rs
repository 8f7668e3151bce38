//! Database handle: chain setters, terminal statement calls and the execution
//! gateway.
//!
//! A [`ChainDb`] owns one [`Connection`] and one [`OptionStore`]. Chain calls
//! record clauses; a terminal call (`insert`, `update`, `delete`, `select`,
//! `count`, or their `*_sql` build-only twins) takes the recorded clauses,
//! builds one statement from them and either returns the text or runs it.
//!
//! The store is emptied by every terminal call before anything else happens,
//! so a failed build or a rejected statement never leaks clauses into the
//! next chain.
//!
//! # Ownership
//!
//! A handle is driven by one caller at a time. Chain methods take `&mut self`,
//! so sharing a handle across threads requires an outer lock
//! (see [`SharedRegistry`](crate::SharedRegistry)). An open transaction belongs
//! to whoever holds the handle; nothing here tracks or nests transactions.
//!
//! # Example
//!
//! ```
//! # #[cfg(feature = "sqlite")]
//! # fn main() -> chainsql::ChainResult<()> {
//! use chainsql::{ChainDb, DbConfig, DefaultConnector, MutateResult};
//! use serde_json::json;
//!
//! let mut db = ChainDb::open(DbConfig::sqlite(":memory:"), &DefaultConnector)?;
//! db.sql("CREATE TABLE user (id INTEGER PRIMARY KEY, user_name TEXT)")?;
//!
//! let id = db.data(json!({"user_name": "zhangsan"})).insert("user")?;
//! assert_eq!(id, MutateResult::InsertId("1".into()));
//!
//! let rows = db.field("user_name").select("user")?;
//! assert_eq!(rows[0]["user_name"], "zhangsan");
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "sqlite"))]
//! # fn main() {}
//! ```

use crate::builder::{self, DEFAULT_COUNT_KEY};
use crate::client::{Connection, Connector, Row};
use crate::config::DbConfig;
use crate::error::{ChainError, ChainResult, DriverError};
use crate::monitor::{
    FileLogMonitor, MonitorConfig, NoopMonitor, StatementContext, StatementMonitor,
    StatementOutcome,
};
use crate::options::{Filter, Limit, OptionStore, Tokens};
use crate::sql::StatementKind;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of a mutating statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutateResult {
    /// Number of rows the statement changed.
    Affected(u64),
    /// Key generated by a single-row INSERT.
    InsertId(String),
}

impl MutateResult {
    pub fn affected(&self) -> Option<u64> {
        match self {
            MutateResult::Affected(n) => Some(*n),
            MutateResult::InsertId(_) => None,
        }
    }

    pub fn insert_id(&self) -> Option<&str> {
        match self {
            MutateResult::InsertId(id) => Some(id),
            MutateResult::Affected(_) => None,
        }
    }
}

impl fmt::Display for MutateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutateResult::Affected(n) => write!(f, "{n}"),
            MutateResult::InsertId(id) => f.write_str(id),
        }
    }
}

impl From<&MutateResult> for StatementOutcome {
    fn from(result: &MutateResult) -> Self {
        match result {
            MutateResult::Affected(n) => StatementOutcome::Affected(*n),
            MutateResult::InsertId(id) => StatementOutcome::InsertId(id.clone()),
        }
    }
}

/// Result of [`ChainDb::sql`]: rows for reads, a [`MutateResult`] for writes.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlOutcome {
    Rows(Vec<Row>),
    Mutated(MutateResult),
}

impl SqlOutcome {
    pub fn into_rows(self) -> Option<Vec<Row>> {
        match self {
            SqlOutcome::Rows(rows) => Some(rows),
            SqlOutcome::Mutated(_) => None,
        }
    }

    pub fn into_mutated(self) -> Option<MutateResult> {
        match self {
            SqlOutcome::Mutated(result) => Some(result),
            SqlOutcome::Rows(_) => None,
        }
    }
}

/// One database handle.
pub struct ChainDb {
    key: String,
    config: DbConfig,
    conn: Box<dyn Connection>,
    options: OptionStore,
    last_sql: Option<String>,
    monitor: Arc<dyn StatementMonitor>,
    monitor_config: MonitorConfig,
}

impl fmt::Debug for ChainDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainDb")
            .field("key", &self.key)
            .field("dsn", &self.config.dsn())
            .field("options", &self.options)
            .field("last_sql", &self.last_sql)
            .field("monitor_config", &self.monitor_config)
            .finish_non_exhaustive()
    }
}

impl ChainDb {
    /// Wrap an open connection. `key` names the handle in logs.
    pub fn new(key: impl Into<String>, config: DbConfig, conn: Box<dyn Connection>) -> Self {
        Self {
            key: key.into(),
            config,
            conn,
            options: OptionStore::new(),
            last_sql: None,
            monitor: Arc::new(NoopMonitor),
            monitor_config: MonitorConfig::default(),
        }
    }

    /// Validate `config`, open a connection through `connector` and attach a
    /// statement log if `log_file` is set.
    pub fn open(config: DbConfig, connector: &dyn Connector) -> ChainResult<Self> {
        Self::open_keyed("0", config, connector)
    }

    pub(crate) fn open_keyed(
        key: impl Into<String>,
        config: DbConfig,
        connector: &dyn Connector,
    ) -> ChainResult<Self> {
        config.validate()?;
        let log = config
            .log_file
            .as_ref()
            .map(FileLogMonitor::open)
            .transpose()?;
        let conn = connector.open(&config)?;
        let mut db = Self::new(key, config, conn);
        if let Some(log) = log {
            db.set_monitor(log);
            db.set_monitor_config(MonitorConfig::new().enable());
        }
        Ok(db)
    }

    /// Replace the statement monitor. Events flow only while monitoring is enabled.
    pub fn set_monitor<M: StatementMonitor + 'static>(&mut self, monitor: M) -> &mut Self {
        self.monitor = Arc::new(monitor);
        self
    }

    pub fn set_monitor_arc(&mut self, monitor: Arc<dyn StatementMonitor>) -> &mut Self {
        self.monitor = monitor;
        self
    }

    pub fn set_monitor_config(&mut self, config: MonitorConfig) -> &mut Self {
        self.monitor_config = config;
        self
    }

    pub fn monitor_config(&self) -> &MonitorConfig {
        &self.monitor_config
    }

    // ── chain setters ────────────────────────────────────────────────────

    pub fn distinct(&mut self) -> &mut Self {
        self.options.distinct();
        self
    }

    pub fn field(&mut self, field: impl Into<Tokens>) -> &mut Self {
        self.options.field(field);
        self
    }

    pub fn join(&mut self, join: impl Into<String>) -> &mut Self {
        self.options.join(join);
        self
    }

    pub fn where_(&mut self, filter: impl Into<Filter>) -> &mut Self {
        self.options.where_(filter);
        self
    }

    pub fn group(&mut self, group: impl Into<Tokens>) -> &mut Self {
        self.options.group(group);
        self
    }

    pub fn having(&mut self, having: impl Into<Filter>) -> &mut Self {
        self.options.having(having);
        self
    }

    pub fn order(&mut self, order: impl Into<String>) -> &mut Self {
        self.options.order(order);
        self
    }

    pub fn limit(&mut self, limit: impl Into<Limit>) -> &mut Self {
        self.options.limit(limit);
        self
    }

    pub fn data(&mut self, data: impl Into<Value>) -> &mut Self {
        self.options.data(data);
        self
    }

    pub fn data_rows(&mut self, columns: impl Into<Value>, rows: impl Into<Value>) -> &mut Self {
        self.options.data_rows(columns, rows);
        self
    }

    /// Clauses recorded since the last terminal call.
    pub fn options(&self) -> &OptionStore {
        &self.options
    }

    // ── terminal calls ───────────────────────────────────────────────────

    /// Run an INSERT built from the recorded data.
    ///
    /// A multi-row insert returns the row count. A single-row insert returns
    /// the generated key when the backend reports one, else the row count.
    pub fn insert(&mut self, table: &str) -> ChainResult<MutateResult> {
        let sql = self.build(StatementKind::Insert, table, DEFAULT_COUNT_KEY)?;
        self.mutate(StatementKind::Insert, sql)
    }

    pub fn insert_sql(&mut self, table: &str) -> ChainResult<String> {
        self.build_only(StatementKind::Insert, table, DEFAULT_COUNT_KEY)
    }

    /// Run an UPDATE and return the affected row count.
    pub fn update(&mut self, table: &str) -> ChainResult<MutateResult> {
        let sql = self.build(StatementKind::Update, table, DEFAULT_COUNT_KEY)?;
        self.mutate(StatementKind::Update, sql)
    }

    pub fn update_sql(&mut self, table: &str) -> ChainResult<String> {
        self.build_only(StatementKind::Update, table, DEFAULT_COUNT_KEY)
    }

    /// Run a DELETE and return the affected row count.
    pub fn delete(&mut self, table: &str) -> ChainResult<MutateResult> {
        let sql = self.build(StatementKind::Delete, table, DEFAULT_COUNT_KEY)?;
        self.mutate(StatementKind::Delete, sql)
    }

    pub fn delete_sql(&mut self, table: &str) -> ChainResult<String> {
        self.build_only(StatementKind::Delete, table, DEFAULT_COUNT_KEY)
    }

    /// Run a SELECT and return every row.
    pub fn select(&mut self, table: &str) -> ChainResult<Vec<Row>> {
        let sql = self.build(StatementKind::Select, table, DEFAULT_COUNT_KEY)?;
        self.query(StatementKind::Select, sql)
    }

    pub fn select_sql(&mut self, table: &str) -> ChainResult<String> {
        self.build_only(StatementKind::Select, table, DEFAULT_COUNT_KEY)
    }

    /// Count `key` over the rows matching the recorded join and filter.
    pub fn count(&mut self, table: &str, key: &str) -> ChainResult<u64> {
        let sql = self.build(StatementKind::Count, table, key)?;
        let rows = self.query(StatementKind::Count, sql)?;
        aggregate(rows)
    }

    /// [`ChainDb::count`] over the `id` column.
    pub fn count_rows(&mut self, table: &str) -> ChainResult<u64> {
        self.count(table, DEFAULT_COUNT_KEY)
    }

    pub fn count_sql(&mut self, table: &str, key: &str) -> ChainResult<String> {
        self.build_only(StatementKind::Count, table, key)
    }

    /// Run caller-supplied SQL.
    ///
    /// Text starting with a read keyword (`SELECT`, `SHOW`, `WITH`, ...) goes
    /// through the query path, anything else through the mutate path. The
    /// recorded clauses are discarded either way.
    pub fn sql(&mut self, raw: &str) -> ChainResult<SqlOutcome> {
        self.options.clear();
        let sql = raw.trim().to_string();
        self.last_sql = Some(sql.clone());
        let kind = StatementKind::from_sql(&sql);
        if kind.returns_rows() {
            Ok(SqlOutcome::Rows(self.query(StatementKind::RawRead, sql)?))
        } else {
            Ok(SqlOutcome::Mutated(self.mutate(kind, sql)?))
        }
    }

    // ── transactions ─────────────────────────────────────────────────────

    pub fn begin_transaction(&mut self) -> ChainResult<()> {
        self.conn
            .begin()
            .map_err(|e| ChainError::execution(e, "BEGIN"))
    }

    pub fn commit(&mut self) -> ChainResult<()> {
        self.conn
            .commit()
            .map_err(|e| ChainError::execution(e, "COMMIT"))
    }

    pub fn rollback(&mut self) -> ChainResult<()> {
        self.conn
            .rollback()
            .map_err(|e| ChainError::execution(e, "ROLLBACK"))
    }

    /// Whether a transaction is open on the connection.
    pub fn in_transaction(&self) -> bool {
        self.conn.in_transaction()
    }

    // ── introspection ────────────────────────────────────────────────────

    /// The most recently built or executed statement.
    pub fn last_sql(&self) -> Option<&str> {
        self.last_sql.as_deref()
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Quote a string as a literal using the backend's rules.
    pub fn quote(&self, value: &str) -> String {
        self.conn.quote(value)
    }

    pub fn server_version(&self) -> Option<String> {
        self.conn.server_version()
    }

    pub fn show_tables(&mut self) -> ChainResult<Vec<String>> {
        self.conn
            .tables()
            .map_err(|e| ChainError::execution(e, "SHOW TABLES"))
    }

    /// One row per column of `table`, as the backend describes it
    /// (`SHOW COLUMNS`, or `PRAGMA table_info` on SQLite).
    pub fn show_table_info(&mut self, table: &str) -> ChainResult<Vec<Row>> {
        self.conn.table_info(table).map_err(|e| {
            ChainError::execution(e, format!("SHOW COLUMNS FROM {}", builder::quote_table(table)))
        })
    }

    /// Cheap liveness probe: runs `SELECT 1`.
    pub fn is_connected(&mut self) -> bool {
        self.conn.query("SELECT 1").is_ok()
    }

    /// Escape hatch to the underlying connection.
    pub fn connection(&mut self) -> &mut dyn Connection {
        self.conn.as_mut()
    }

    // ── gateway ──────────────────────────────────────────────────────────

    fn build(&mut self, kind: StatementKind, table: &str, count_key: &str) -> ChainResult<String> {
        let opts = self.options.take();
        self.last_sql = None;
        let sql = builder::build(kind, table, count_key, &opts)?;
        self.last_sql = Some(sql.clone());
        Ok(sql)
    }

    fn build_only(
        &mut self,
        kind: StatementKind,
        table: &str,
        count_key: &str,
    ) -> ChainResult<String> {
        let sql = self.build(kind, table, count_key)?;
        self.report(kind, &sql, Duration::ZERO, &StatementOutcome::Built);
        Ok(sql)
    }

    fn mutate(&mut self, kind: StatementKind, sql: String) -> ChainResult<MutateResult> {
        let started = Instant::now();
        let result = self.conn.execute(&sql);
        let elapsed = started.elapsed();
        match result {
            Ok(affected) => {
                let result = if kind == StatementKind::Insert && affected == 1 {
                    self.conn
                        .last_insert_id()
                        .map(MutateResult::InsertId)
                        .unwrap_or(MutateResult::Affected(affected))
                } else {
                    MutateResult::Affected(affected)
                };
                self.report(kind, &sql, elapsed, &(&result).into());
                Ok(result)
            }
            Err(err) => Err(self.fail(kind, sql, elapsed, err)),
        }
    }

    fn query(&mut self, kind: StatementKind, sql: String) -> ChainResult<Vec<Row>> {
        let started = Instant::now();
        let result = self.conn.query(&sql);
        let elapsed = started.elapsed();
        match result {
            Ok(rows) => {
                self.report(kind, &sql, elapsed, &StatementOutcome::Rows(rows.len()));
                Ok(rows)
            }
            Err(err) => Err(self.fail(kind, sql, elapsed, err)),
        }
    }

    fn fail(
        &self,
        kind: StatementKind,
        sql: String,
        elapsed: Duration,
        err: DriverError,
    ) -> ChainError {
        self.report(kind, &sql, elapsed, &StatementOutcome::error(err.to_string()));
        ChainError::execution(err, sql)
    }

    fn report(&self, kind: StatementKind, sql: &str, elapsed: Duration, outcome: &StatementOutcome) {
        #[cfg(feature = "tracing")]
        self.trace(kind, sql, elapsed, outcome);

        if !self.monitor_config.enabled {
            return;
        }
        let ctx = StatementContext::new(sql, kind).with_db(self.key.as_str());
        if *outcome != StatementOutcome::Built && self.monitor_config.is_slow(elapsed) {
            self.monitor.on_slow_statement(&ctx, elapsed);
        }
        self.monitor.on_statement_complete(&ctx, elapsed, outcome);
    }

    #[cfg(feature = "tracing")]
    fn trace(&self, kind: StatementKind, sql: &str, elapsed: Duration, outcome: &StatementOutcome) {
        let elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        if outcome.is_error() {
            tracing::warn!(
                target: "chainsql.sql",
                db = %self.key,
                kind = %kind,
                elapsed_us,
                outcome = %outcome,
                sql = %sql,
            );
        } else {
            tracing::debug!(
                target: "chainsql.sql",
                db = %self.key,
                kind = %kind,
                elapsed_us,
                outcome = %outcome,
                sql = %sql,
            );
        }
    }
}

/// Pull the single aggregate value out of a COUNT result.
fn aggregate(rows: Vec<Row>) -> ChainResult<u64> {
    let Some((column, value)) = rows.into_iter().next().and_then(|row| row.into_iter().next())
    else {
        return Err(ChainError::decode("COUNT", "no rows returned"));
    };
    let parsed = match &value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ChainError::decode(column, format!("not a row count: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(column: &str, value: Value) -> Row {
        let mut row = Row::new();
        row.insert(column.to_string(), value);
        row
    }

    #[test]
    fn aggregate_reads_first_column_of_first_row() {
        assert_eq!(aggregate(vec![row("COUNT(`id`)", json!(3))]).unwrap(), 3);
        assert_eq!(aggregate(vec![row("c", json!("12"))]).unwrap(), 12);
    }

    #[test]
    fn aggregate_rejects_missing_or_odd_values() {
        assert!(matches!(aggregate(vec![]), Err(ChainError::Decode { .. })));
        let err = aggregate(vec![row("c", json!(-1))]).unwrap_err();
        assert_eq!(err.to_string(), "Decode error on column 'c': not a row count: -1");
    }

    #[test]
    fn mutate_result_accessors() {
        let id = MutateResult::InsertId("7".into());
        assert_eq!(id.insert_id(), Some("7"));
        assert_eq!(id.affected(), None);
        assert_eq!(id.to_string(), "7");
        assert_eq!(MutateResult::Affected(2).affected(), Some(2));
        assert_eq!(MutateResult::Affected(2).to_string(), "2");
    }

    #[test]
    fn sql_outcome_accessors() {
        let rows = SqlOutcome::Rows(vec![row("a", json!(1))]);
        assert_eq!(rows.clone().into_rows().map(|r| r.len()), Some(1));
        assert_eq!(rows.into_mutated(), None);
        let mutated = SqlOutcome::Mutated(MutateResult::Affected(1));
        assert_eq!(mutated.into_mutated(), Some(MutateResult::Affected(1)));
    }
}
