//! Wire protocol for Warden.
//!
//! This crate defines what the agent and the remote authority exchange:
//!
//! - **Types** ([`Session`], [`ServerProfile`], [`AuthReply`],
//!   [`AllowlistReply`]): the records carried in authority replies and
//!   the domain records built from them.
//! - **Codec** ([`decode_reply`]): turns a JSON reply body into a typed
//!   value, enforcing the application-level `"status": "OK"` contract.
//! - **Endpoints** ([`Endpoints`]): where each call goes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (HTTP status + body) and the
//! services that consume replies. It knows nothing about scheduling or
//! caching.
//!
//! ```text
//! Transport (status, body) → Protocol (typed reply) → Session / Heartbeat / Allowlist
//! ```

mod codec;
mod endpoints;
mod error;
mod types;

pub use codec::{decode_reply, STATUS_OK};
pub use endpoints::{Endpoints, DEFAULT_BASE_URL};
pub use error::ProtocolError;
pub use types::{
    AllowlistReply, AuthReply, HeartbeatReply, ServerInfo, ServerProfile,
    Session,
};

/// Request header names, lower-cased as the authority expects them.
pub mod headers {
    /// Long-lived server key, sent only to `authenticate`.
    pub const SERVER_KEY: &str = "serverkey";
    /// Session key issued by `authenticate`.
    pub const SESSION_KEY: &str = "sessionkey";
    /// Session id issued by `authenticate`.
    pub const SESSION_ID: &str = "sessionid";
    /// Current player count, sent with every heartbeat.
    pub const PLAYER_COUNT: &str = "playercount";
}
