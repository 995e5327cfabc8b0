//! Session bootstrap for Warden.
//!
//! The agent talks to the authority with a short-lived session, not with
//! the operator's long-lived server key. This crate performs the one-shot
//! exchange:
//!
//! ```text
//! server key ──→ SessionAuthenticator::authenticate ──→ Authenticated
//!                                                      ├── Session      (heartbeat, allow-list)
//!                                                      └── ServerProfile (banner, access gate)
//! ```
//!
//! Authentication runs exactly once per process. There is no retry and no
//! refresh: any failure is fatal to startup and the host is expected to
//! shut down with the error's message.

mod authenticator;
mod error;

pub use authenticator::{Authenticated, SessionAuthenticator};
pub use error::AuthError;
