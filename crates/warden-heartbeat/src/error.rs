//! Error types for the heartbeat scheduler.

use warden_transport::TransportError;

/// Errors returned by [`HeartbeatScheduler`](crate::HeartbeatScheduler)
/// lifecycle calls.
///
/// Failures of periodic heartbeats are never surfaced here. They drive
/// the backoff and the connection notices instead.
#[derive(Debug, thiserror::Error)]
pub enum HeartbeatError {
    /// The immediate heartbeat sent by `start` failed. Fatal to startup.
    #[error("initial heartbeat failed: {0}")]
    InitialFailed(#[source] TransportError),

    /// `start` was called on a scheduler that is already running.
    #[error("heartbeat scheduler already started")]
    AlreadyStarted,

    /// `start` was called after `stop`. Schedulers are single-use.
    #[error("heartbeat scheduler has been stopped")]
    Stopped,
}
