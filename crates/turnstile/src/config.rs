//! Acquisition timing configuration.

use std::time::Duration;

/// Construction-time defaults for the lock service.
#[derive(Debug, Clone, Copy)]
pub struct LockConfig {
    /// Sleep between acquisition attempts when the lock is contended.
    pub poll_interval: Duration,
    /// Upper bound on how long an acquisition may wait. `None` waits
    /// forever; this is an explicit configuration, not a large sentinel.
    pub timeout: Option<Duration>,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            timeout: None,
        }
    }
}

/// Per-call timeout override.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Timeout {
    /// Use the service's configured timeout.
    #[default]
    Default,
    /// Wait forever, whatever the service is configured with.
    Unbounded,
    /// Give up after this long.
    After(Duration),
}

/// Per-call overrides of the configured acquisition timing.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcquireOptions {
    /// Override the configured poll interval.
    pub poll_interval: Option<Duration>,
    /// Override the configured timeout.
    pub timeout: Timeout,
}

impl AcquireOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Timeout::After(timeout);
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.timeout = Timeout::Unbounded;
        self
    }

    /// Resolve these options against the service configuration.
    pub(crate) fn resolve(&self, config: &LockConfig) -> (Duration, Option<Duration>) {
        let poll = self.poll_interval.unwrap_or(config.poll_interval);
        let timeout = match self.timeout {
            Timeout::Default => config.timeout,
            Timeout::Unbounded => None,
            Timeout::After(d) => Some(d),
        };
        (poll, timeout)
    }
}
