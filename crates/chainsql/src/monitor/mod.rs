//! Statement monitoring.
//!
//! Every statement a handle produces, executed or build-only, can be reported
//! to a [`StatementMonitor`]. Monitors are attached per handle and only see
//! events while [`MonitorConfig::enabled`] is set.
//!
//! # Example
//!
//! ```
//! use chainsql::monitor::{StatementContext, StatementMonitor, StatementOutcome, StatsMonitor};
//! use std::time::Duration;
//!
//! let stats = StatsMonitor::new();
//! stats.on_statement_complete(
//!     &StatementContext::raw("SELECT 1"),
//!     Duration::from_millis(1),
//!     &StatementOutcome::Rows(1),
//! );
//! assert_eq!(stats.stats().total, 1);
//! ```

mod config;
mod file_log;
mod monitors;
mod types;


pub use config::MonitorConfig;
pub use file_log::FileLogMonitor;
pub use monitors::{CompositeMonitor, LoggingMonitor, NoopMonitor, StatementStats, StatsMonitor};
pub use types::{StatementContext, StatementMonitor, StatementOutcome};

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
