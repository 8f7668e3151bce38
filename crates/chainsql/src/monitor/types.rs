use crate::sql::StatementKind;
use std::fmt;
use std::time::Duration;

/// What a monitor knows about one statement.
#[derive(Debug, Clone)]
pub struct StatementContext {
    /// The statement text, exactly as built or passed in.
    pub sql: String,
    /// Statement kind (builder kind, or raw read/write for `sql()`).
    pub kind: StatementKind,
    /// Key of the handle that produced the statement, if it has one.
    pub db: Option<String>,
}

impl StatementContext {
    pub fn new(sql: impl Into<String>, kind: StatementKind) -> Self {
        Self {
            sql: sql.into(),
            kind,
            db: None,
        }
    }

    /// Infer the kind from the SQL text.
    pub fn raw(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let kind = StatementKind::from_sql(&sql);
        Self::new(sql, kind)
    }

    pub fn with_db(mut self, db: impl Into<String>) -> Self {
        self.db = Some(db.into());
        self
    }
}

const MAX_ERROR_LEN: usize = 512;

/// How a statement ended, for monitoring purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementOutcome {
    /// Built but not sent (build-only mode).
    Built,
    /// A read returned this many rows.
    Rows(usize),
    /// A write affected this many rows.
    Affected(u64),
    /// A single-row insert produced this key.
    InsertId(String),
    /// The statement failed (message truncated to 512 bytes).
    Error(String),
}

impl StatementOutcome {
    pub fn error(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        if msg.len() > MAX_ERROR_LEN {
            Self::Error(format!(
                "{}...",
                super::truncate_sql_bytes(&msg, MAX_ERROR_LEN)
            ))
        } else {
            Self::Error(msg)
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl fmt::Display for StatementOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementOutcome::Built => f.write_str("built"),
            StatementOutcome::Rows(n) => write!(f, "{n} rows"),
            StatementOutcome::Affected(n) => write!(f, "{n} affected"),
            StatementOutcome::InsertId(id) => write!(f, "insert id {id}"),
            StatementOutcome::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// Observer for statements passing through a handle.
///
/// Monitors cannot change or abort a statement; they only see it after the
/// fact.
pub trait StatementMonitor: Send + Sync {
    /// Called once per statement, whether it was executed, built only, or failed.
    fn on_statement_complete(
        &self,
        ctx: &StatementContext,
        duration: Duration,
        outcome: &StatementOutcome,
    );

    /// Called when an executed statement exceeded the slow threshold.
    fn on_slow_statement(&self, _ctx: &StatementContext, _duration: Duration) {}
}
