//! Authority client abstraction for Warden.
//!
//! Provides the [`Authority`] trait (the three calls the agent makes to
//! the remote authority) and [`HttpAuthority`], the real implementation
//! on top of `reqwest`.
//!
//! Every service above this crate is generic over `A: Authority`, so tests
//! can swap in a scripted authority without touching the network.
//!
//! # Feature Flags
//!
//! - `http` (default): [`HttpAuthority`] via `reqwest` (rustls)
//! - `mock`: [`mock::MockAuthority`], a scripted in-memory authority

mod error;
#[cfg(feature = "http")]
mod http;
#[cfg(feature = "mock")]
pub mod mock;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::{AuthorityConfig, HttpAuthority};

use std::future::Future;

use warden_protocol::{AllowlistReply, AuthReply, Session};

/// The remote authority: issues sessions, accepts heartbeats, serves the
/// allow-list.
///
/// Each method resolves to `Ok` only when the transport status was 200
/// AND the reply's application status was `"OK"`. Everything else is a
/// [`TransportError`].
///
/// The returned futures are `Send` so the schedulers can drive them from
/// spawned Tokio tasks. Implementors can still write plain `async fn`.
pub trait Authority: Send + Sync + 'static {
    /// Exchanges the long-lived server key for a session.
    fn authenticate(
        &self,
        server_key: &str,
    ) -> impl Future<Output = Result<AuthReply, TransportError>> + Send;

    /// Reports liveness and the current player count.
    fn heartbeat(
        &self,
        session: &Session,
        player_count: u32,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Fetches the full allow-list for this server.
    fn fetch_allowlist(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<AllowlistReply, TransportError>> + Send;
}
