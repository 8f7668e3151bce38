use super::types::{StatementContext, StatementMonitor, StatementOutcome};
use crate::error::{ChainError, ChainResult};
use chrono::{SecondsFormat, Utc};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Appends one line per statement to a text file.
///
/// Line layout:
///
/// ```text
/// <RFC 3339 UTC, millis> [<KIND>] [<db>] <duration> | <outcome> | <sql>
/// ```
///
/// Line breaks inside the SQL are folded to spaces so each statement stays on
/// one line. Write failures are reported through `tracing` and otherwise
/// ignored; the log never fails a statement.
#[derive(Debug)]
pub struct FileLogMonitor {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileLogMonitor {
    /// Open (or create) `path` for appending.
    pub fn open(path: impl AsRef<Path>) -> ChainResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| ChainError::config(format!("log_file {}: {e}", path.display())))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&self, line: &str) {
        let result = match self.file.lock() {
            Ok(mut file) => writeln!(file, "{line}"),
            Err(poisoned) => writeln!(poisoned.into_inner(), "{line}"),
        };
        if let Err(_err) = result {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                target: "chainsql.sql",
                path = %self.path.display(),
                error = %_err,
                "statement log write failed"
            );
        }
    }
}

/// `2026-01-02T03:04:05.678Z`
pub(crate) fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn one_line(sql: &str) -> String {
    sql.split(['\r', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl StatementMonitor for FileLogMonitor {
    fn on_statement_complete(
        &self,
        ctx: &StatementContext,
        duration: Duration,
        outcome: &StatementOutcome,
    ) {
        self.write_line(&format!(
            "{} [{}] [{}] {:?} | {} | {}",
            timestamp(),
            ctx.kind,
            ctx.db.as_deref().unwrap_or("-"),
            duration,
            outcome,
            one_line(&ctx.sql)
        ));
    }

    fn on_slow_statement(&self, ctx: &StatementContext, duration: Duration) {
        self.write_line(&format!(
            "{} SLOW [{}] [{}] {:?} | {}",
            timestamp(),
            ctx.kind,
            ctx.db.as_deref().unwrap_or("-"),
            duration,
            one_line(&ctx.sql)
        ));
    }
}
