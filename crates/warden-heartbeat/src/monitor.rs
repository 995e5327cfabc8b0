//! Connection state tracking for the heartbeat scheduler.
//!
//! The scheduler task feeds every heartbeat outcome into a
//! [`HeartbeatMonitor`]. The monitor owns the state machine, the
//! once-per-episode notice guard and the counters. It is lock-free so the
//! host can read state and metrics from any thread while the task runs.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

use tracing::debug;

use crate::notice;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle of a heartbeat scheduler.
///
/// ```text
/// Idle ──start()──→ Probing ──ok──→ Steady ⇄ Degraded
///                      │                  │      │
///                      └──fail──┐      stop()  stop()
///                               ▼         ▼      ▼
///                               Stopped ←─┴──────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HeartbeatState {
    /// Created, not started.
    Idle = 0,
    /// The initial heartbeat is in flight.
    Probing = 1,
    /// The last heartbeat succeeded.
    Steady = 2,
    /// The connection is considered lost; retries are running.
    Degraded = 3,
    /// Terminal.
    Stopped = 4,
}

impl HeartbeatState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Probing,
            2 => Self::Steady,
            3 => Self::Degraded,
            _ => Self::Stopped,
        }
    }

    /// Whether the periodic task is (or should be) running.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Steady | Self::Degraded)
    }
}

impl fmt::Display for HeartbeatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Probing => write!(f, "Probing"),
            Self::Steady => write!(f, "Steady"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Point-in-time counters for a scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeartbeatMetrics {
    /// Heartbeats the authority accepted, including the first one.
    pub sent: u64,
    /// Heartbeats that failed for any reason.
    pub failed: u64,
    /// "Connection lost" notices emitted.
    pub lost_notices: u64,
    /// "Connection restored" notices emitted.
    pub restored_notices: u64,
    /// Delay the next failure's retry will wait.
    pub retry_delay: Duration,
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// Shared state and counters for one scheduler.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    state: AtomicU8,
    /// Set while a connection-lost episode is open.
    lost: AtomicBool,
    sent: AtomicU64,
    failed: AtomicU64,
    lost_notices: AtomicU64,
    restored_notices: AtomicU64,
    retry_delay_ms: AtomicU64,
}

impl HeartbeatMonitor {
    pub fn new(retry_base: Duration) -> Self {
        Self {
            state: AtomicU8::new(HeartbeatState::Idle as u8),
            lost: AtomicBool::new(false),
            sent: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            lost_notices: AtomicU64::new(0),
            restored_notices: AtomicU64::new(0),
            retry_delay_ms: AtomicU64::new(duration_ms(retry_base)),
        }
    }

    pub fn state(&self) -> HeartbeatState {
        HeartbeatState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Moves `from → to` only if the current state is `from`.
    ///
    /// On failure returns the state actually observed.
    pub fn transition(
        &self,
        from: HeartbeatState,
        to: HeartbeatState,
    ) -> Result<(), HeartbeatState> {
        match self.state.compare_exchange(
            from as u8,
            to as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                debug!(%from, %to, "heartbeat state changed");
                Ok(())
            }
            Err(actual) => Err(HeartbeatState::from_u8(actual)),
        }
    }

    /// Unconditionally enters [`HeartbeatState::Stopped`].
    pub fn stop(&self) -> HeartbeatState {
        HeartbeatState::from_u8(
            self.state
                .swap(HeartbeatState::Stopped as u8, Ordering::AcqRel),
        )
    }

    /// Records an accepted heartbeat. Returns `true` if this success
    /// closed a connection-lost episode.
    pub fn record_success(&self) -> bool {
        self.sent.fetch_add(1, Ordering::Relaxed);

        let restored = self
            .lost
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if restored {
            self.restored_notices.fetch_add(1, Ordering::Relaxed);
            let _ = self
                .transition(HeartbeatState::Degraded, HeartbeatState::Steady);
            notice::connection_restored();
        }
        restored
    }

    /// Records a failed heartbeat. Returns `true` if this failure opened a
    /// new connection-lost episode.
    pub fn record_failure(&self, cause: &str) -> bool {
        self.failed.fetch_add(1, Ordering::Relaxed);

        let lost = self
            .lost
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if lost {
            self.lost_notices.fetch_add(1, Ordering::Relaxed);
            let _ = self
                .transition(HeartbeatState::Steady, HeartbeatState::Degraded);
            notice::connection_lost(cause);
        }
        lost
    }

    pub(crate) fn set_retry_delay(&self, delay: Duration) {
        self.retry_delay_ms
            .store(duration_ms(delay), Ordering::Relaxed);
    }

    /// Snapshot of the counters.
    pub fn metrics(&self) -> HeartbeatMetrics {
        HeartbeatMetrics {
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            lost_notices: self.lost_notices.load(Ordering::Relaxed),
            restored_notices: self.restored_notices.load(Ordering::Relaxed),
            retry_delay: Duration::from_millis(
                self.retry_delay_ms.load(Ordering::Relaxed),
            ),
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
