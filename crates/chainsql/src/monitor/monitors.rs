use super::truncate_sql_bytes;
use super::types::{StatementContext, StatementMonitor, StatementOutcome};
use crate::sql::StatementKind;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A monitor that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitor;

impl StatementMonitor for NoopMonitor {
    fn on_statement_complete(&self, _: &StatementContext, _: Duration, _: &StatementOutcome) {}
}

/// Prints statements to stderr.
#[derive(Debug, Clone)]
pub struct LoggingMonitor {
    /// Skip statements faster than this.
    pub min_duration: Option<Duration>,
    /// Truncate SQL longer than this many bytes.
    pub max_sql_length: Option<usize>,
    pub prefix: String,
}

impl Default for LoggingMonitor {
    fn default() -> Self {
        Self {
            min_duration: None,
            max_sql_length: Some(200),
            prefix: "[chainsql]".to_string(),
        }
    }
}

impl LoggingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_duration(mut self, duration: Duration) -> Self {
        self.min_duration = Some(duration);
        self
    }

    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    pub(crate) fn format_line(
        &self,
        ctx: &StatementContext,
        duration: Duration,
        outcome: &StatementOutcome,
    ) -> String {
        format!(
            "{} [{}] [{}] {:?} | {} | {}",
            self.prefix,
            ctx.kind,
            ctx.db.as_deref().unwrap_or("-"),
            duration,
            outcome,
            self.truncate_sql(&ctx.sql)
        )
    }
}

impl StatementMonitor for LoggingMonitor {
    fn on_statement_complete(
        &self,
        ctx: &StatementContext,
        duration: Duration,
        outcome: &StatementOutcome,
    ) {
        if self.min_duration.is_some_and(|min| duration < min) {
            return;
        }
        eprintln!("{}", self.format_line(ctx, duration, outcome));
    }

    fn on_slow_statement(&self, ctx: &StatementContext, duration: Duration) {
        eprintln!(
            "{} SLOW [{}]: {:?} | {}",
            self.prefix,
            ctx.kind,
            duration,
            self.truncate_sql(&ctx.sql)
        );
    }
}

/// Counts statements by kind and outcome.
#[derive(Debug, Default)]
pub struct StatsMonitor {
    total: AtomicU64,
    failed: AtomicU64,
    built_only: AtomicU64,
    total_duration_nanos: AtomicU64,
    max_duration_nanos: AtomicU64,
    select_count: AtomicU64,
    count_count: AtomicU64,
    insert_count: AtomicU64,
    update_count: AtomicU64,
    delete_count: AtomicU64,
    raw_count: AtomicU64,
    slowest: Mutex<Option<String>>,
}

/// Snapshot of [`StatsMonitor`] counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementStats {
    /// Every statement seen, including build-only ones.
    pub total: u64,
    pub failed: u64,
    pub built_only: u64,
    pub total_duration: Duration,
    pub max_duration: Duration,
    pub select_count: u64,
    pub count_count: u64,
    pub insert_count: u64,
    pub update_count: u64,
    pub delete_count: u64,
    /// Statements passed through `sql()`.
    pub raw_count: u64,
    pub slowest: Option<String>,
}

impl StatsMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> StatementStats {
        StatementStats {
            total: self.total.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            built_only: self.built_only.load(Ordering::Relaxed),
            total_duration: Duration::from_nanos(self.total_duration_nanos.load(Ordering::Relaxed)),
            max_duration: Duration::from_nanos(self.max_duration_nanos.load(Ordering::Relaxed)),
            select_count: self.select_count.load(Ordering::Relaxed),
            count_count: self.count_count.load(Ordering::Relaxed),
            insert_count: self.insert_count.load(Ordering::Relaxed),
            update_count: self.update_count.load(Ordering::Relaxed),
            delete_count: self.delete_count.load(Ordering::Relaxed),
            raw_count: self.raw_count.load(Ordering::Relaxed),
            slowest: self.slowest.lock().ok().and_then(|s| s.clone()),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.total,
            &self.failed,
            &self.built_only,
            &self.total_duration_nanos,
            &self.max_duration_nanos,
            &self.select_count,
            &self.count_count,
            &self.insert_count,
            &self.update_count,
            &self.delete_count,
            &self.raw_count,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        if let Ok(mut slowest) = self.slowest.lock() {
            *slowest = None;
        }
    }

    fn kind_counter(&self, kind: StatementKind) -> &AtomicU64 {
        match kind {
            StatementKind::Select => &self.select_count,
            StatementKind::Count => &self.count_count,
            StatementKind::Insert => &self.insert_count,
            StatementKind::Update => &self.update_count,
            StatementKind::Delete => &self.delete_count,
            StatementKind::RawRead | StatementKind::RawWrite => &self.raw_count,
        }
    }
}

impl StatementMonitor for StatsMonitor {
    fn on_statement_complete(
        &self,
        ctx: &StatementContext,
        duration: Duration,
        outcome: &StatementOutcome,
    ) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.kind_counter(ctx.kind).fetch_add(1, Ordering::Relaxed);

        match outcome {
            StatementOutcome::Built => {
                self.built_only.fetch_add(1, Ordering::Relaxed);
                return;
            }
            StatementOutcome::Error(_) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }

        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        let prev = self.total_duration_nanos.fetch_add(nanos, Ordering::Relaxed);
        if prev.checked_add(nanos).is_none() {
            self.total_duration_nanos.store(u64::MAX, Ordering::Relaxed);
        }

        let mut current = self.max_duration_nanos.load(Ordering::Relaxed);
        while nanos > current {
            match self.max_duration_nanos.compare_exchange_weak(
                current,
                nanos,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    if let Ok(mut slowest) = self.slowest.lock() {
                        *slowest = Some(ctx.sql.clone());
                    }
                    break;
                }
                Err(updated) => current = updated,
            }
        }
    }
}

/// Fans every event out to a list of monitors, in insertion order.
#[derive(Default)]
pub struct CompositeMonitor {
    monitors: Vec<Arc<dyn StatementMonitor>>,
}

impl CompositeMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add<M: StatementMonitor + 'static>(mut self, monitor: M) -> Self {
        self.monitors.push(Arc::new(monitor));
        self
    }

    pub fn add_arc(mut self, monitor: Arc<dyn StatementMonitor>) -> Self {
        self.monitors.push(monitor);
        self
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

impl StatementMonitor for CompositeMonitor {
    fn on_statement_complete(
        &self,
        ctx: &StatementContext,
        duration: Duration,
        outcome: &StatementOutcome,
    ) {
        for monitor in &self.monitors {
            monitor.on_statement_complete(ctx, duration, outcome);
        }
    }

    fn on_slow_statement(&self, ctx: &StatementContext, duration: Duration) {
        for monitor in &self.monitors {
            monitor.on_slow_statement(ctx, duration);
        }
    }
}
