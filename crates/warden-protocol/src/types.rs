//! Records carried in authority replies, and the domain records built
//! from them.
//!
//! Reply types mirror the authority's JSON field names via `#[serde(rename)]`
//! so the Rust side can keep snake_case names. Unknown fields are ignored,
//! which lets the authority grow its replies without breaking old agents.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The short-lived credential pair issued by `authenticate`.
///
/// Opaque to us: we only echo both halves back as headers on heartbeat
/// and allow-list calls. Lives for the whole process and is never written
/// to disk.
///
/// `Debug` is implemented by hand so the session key never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    session_key: String,
    session_id: String,
}

impl Session {
    /// Creates a session from the two values the authority issued.
    pub fn new(
        session_key: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            session_key: session_key.into(),
            session_id: session_id.into(),
        }
    }

    /// The secret half, sent as the `sessionkey` header.
    pub fn key(&self) -> &str {
        &self.session_key
    }

    /// The public half, sent as the `sessionid` header.
    pub fn id(&self) -> &str {
        &self.session_id
    }

    /// Both halves present and non-empty.
    pub fn is_valid(&self) -> bool {
        !self.session_key.is_empty() && !self.session_id.is_empty()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_key", &"<redacted>")
            .field("session_id", &self.session_id)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// Server metadata nested under `server` in the authenticate reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "private")]
    pub is_private: bool,
    #[serde(rename = "owner_uuid")]
    pub owner_id: String,
    pub owner_name: String,
    #[serde(rename = "lang")]
    pub language: String,
}

/// Successful reply to `authenticate`.
///
/// The session fields are optional at the wire level so that a reply
/// missing them decodes cleanly and the session layer can report the
/// precise problem instead of a generic decode error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthReply {
    #[serde(rename = "sessionKey", default)]
    pub session_key: Option<String>,
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
    pub server: ServerInfo,
}

/// Successful reply to `heartbeat`. Carries nothing we need.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatReply {}

/// Successful reply to `fetch-allowlist`: raw, un-normalized identities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowlistReply {
    #[serde(rename = "allowedUsers", default)]
    pub allowed_users: Vec<String>,
}

// ---------------------------------------------------------------------------
// ServerProfile
// ---------------------------------------------------------------------------

/// What the agent knows about the server it runs in.
///
/// Created once after authentication. `player_count` and
/// `last_heartbeat_at` are updated in place by the heartbeat scheduler
/// after every successful heartbeat; everything else is fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerProfile {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner_id: String,
    pub owner_name: String,
    pub language: String,
    pub is_private: bool,
    pub player_count: u32,
    pub last_heartbeat_at: DateTime<Utc>,
}

impl ServerProfile {
    /// Builds a profile from the authenticate reply, stamped at `now`.
    pub fn from_info(info: ServerInfo, now: DateTime<Utc>) -> Self {
        Self {
            id: info.id,
            name: info.name,
            description: info.description,
            owner_id: info.owner_id,
            owner_name: info.owner_name,
            language: info.language,
            is_private: info.is_private,
            player_count: 0,
            last_heartbeat_at: now,
        }
    }

    /// Records a successful heartbeat.
    pub fn record_heartbeat(&mut self, player_count: u32, at: DateTime<Utc>) {
        self.player_count = player_count;
        self.last_heartbeat_at = at;
    }

    /// `"Private"` or `"Public"`, for banners and status output.
    pub fn visibility(&self) -> &'static str {
        if self.is_private { "Private" } else { "Public" }
    }
}

impl From<ServerInfo> for ServerProfile {
    fn from(info: ServerInfo) -> Self {
        Self::from_info(info, Utc::now())
    }
}
