//! Heartbeat scheduler for Warden.
//!
//! Proves to the authority that this server is alive and reports its
//! player count, on a fixed period (30 s by default).
//!
//! # Lifecycle
//!
//! [`HeartbeatScheduler::start`] sends one heartbeat immediately. If that
//! first heartbeat fails the server is unreachable from the start, which is the one
//! heartbeat failure treated as fatal. After a successful first one the
//! periodic task takes over and failures are transient:
//!
//! - the first failure of an episode logs a framed "connection lost"
//!   notice and moves the scheduler to [`HeartbeatState::Degraded`]
//! - a retry is scheduled with exponential backoff
//!   (30, 60, 120, 240, 300, 300, ... seconds)
//! - the first success afterwards logs "connection restored", resets the
//!   backoff and moves back to [`HeartbeatState::Steady`]
//!
//! # Modules
//!
//! - [`HeartbeatConfig`]: periods, backoff bounds, stop grace
//! - [`PlayerCountSource`]: where the player count comes from
//! - [`HeartbeatMonitor`]: lock-free state and counters
//! - [`notice`]: framed console notices, reused by the agent's banners

mod backoff;
mod config;
mod error;
mod monitor;
pub mod notice;
mod players;
mod scheduler;

pub use backoff::Backoff;
pub use config::HeartbeatConfig;
pub use error::HeartbeatError;
pub use monitor::{HeartbeatMetrics, HeartbeatMonitor, HeartbeatState};
pub use players::{AtomicPlayerCount, PlayerCountProvider, PlayerCountSource};
pub use scheduler::{HeartbeatScheduler, SharedProfile};
