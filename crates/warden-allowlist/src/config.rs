use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Configuration for the allow-list cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowlistConfig {
    /// Where the snapshot is persisted. Default: `allowlist-cache.json`
    /// in the working directory; the agent resolves it next to its config
    /// file.
    pub snapshot_path: PathBuf,
    /// Time between remote refreshes. Default: 15 minutes.
    pub refresh_interval: Duration,
    /// Whether an `OK` reply with no identities replaces the set
    /// ("allow nobody"). Default: `false`, the reply is refused.
    pub accept_empty: bool,
    /// How long `stop` waits for an in-flight refresh. Default: 5 seconds.
    pub stop_grace: Duration,
}

impl Default for AllowlistConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("allowlist-cache.json"),
            refresh_interval: Duration::from_secs(15 * 60),
            accept_empty: false,
            stop_grace: Duration::from_secs(5),
        }
    }
}

impl AllowlistConfig {
    /// Shortest accepted refresh interval.
    pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

    /// Default settings persisting to `snapshot_path`.
    pub fn with_snapshot_path(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    pub fn validated(mut self) -> Self {
        if self.refresh_interval < Self::MIN_REFRESH_INTERVAL {
            warn!(
                interval = ?self.refresh_interval,
                "allow-list refresh interval too short, clamping"
            );
            self.refresh_interval = Self::MIN_REFRESH_INTERVAL;
        }
        self
    }
}
