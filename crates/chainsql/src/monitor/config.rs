use std::time::Duration;

/// Monitoring switches for one handle.
///
/// Monitoring is off by default; attaching a log file through configuration
/// turns it on.
#[derive(Debug, Clone, Default)]
pub struct MonitorConfig {
    /// Statements slower than this trigger `on_slow_statement`.
    pub slow_threshold: Option<Duration>,
    /// Whether monitors receive events at all.
    pub enabled: bool,
}

impl MonitorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = Some(threshold);
        self
    }

    pub fn enable(mut self) -> Self {
        self.enabled = true;
        self
    }

    pub fn disable(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub(crate) fn is_slow(&self, duration: Duration) -> bool {
        self.slow_threshold.is_some_and(|t| duration > t)
    }
}
