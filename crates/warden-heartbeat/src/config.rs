use std::time::Duration;

use tracing::warn;

/// Timing configuration for the heartbeat scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Time between periodic heartbeats. Default: 30 seconds.
    pub period: Duration,
    /// First retry delay after a failure. Default: 30 seconds.
    pub retry_base: Duration,
    /// Upper bound on the retry delay. Default: 300 seconds.
    pub retry_max: Duration,
    /// How long `stop` waits for an in-flight heartbeat before aborting
    /// the task. Default: 5 seconds.
    pub stop_grace: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(30),
            retry_base: Duration::from_secs(30),
            retry_max: Duration::from_secs(300),
            stop_grace: Duration::from_secs(5),
        }
    }
}

impl HeartbeatConfig {
    /// Shortest accepted period or retry delay.
    pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`HeartbeatScheduler::new`](crate::HeartbeatScheduler::new).
    /// Rules:
    /// - `period` and `retry_base` raised to at least [`Self::MIN_INTERVAL`].
    /// - `retry_max` raised to at least `retry_base`.
    pub fn validated(mut self) -> Self {
        if self.period < Self::MIN_INTERVAL {
            warn!(period = ?self.period, "heartbeat period too short, clamping");
            self.period = Self::MIN_INTERVAL;
        }
        if self.retry_base < Self::MIN_INTERVAL {
            warn!(retry_base = ?self.retry_base, "retry base too short, clamping");
            self.retry_base = Self::MIN_INTERVAL;
        }
        if self.retry_max < self.retry_base {
            warn!(
                retry_max = ?self.retry_max,
                retry_base = ?self.retry_base,
                "retry max below retry base, raising"
            );
            self.retry_max = self.retry_base;
        }
        self
    }
}
