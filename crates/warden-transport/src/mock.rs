//! Scripted in-memory authority for tests.
//!
//! Each call pops the next scripted outcome for that endpoint; once the
//! script runs dry the endpoint's fallback outcome is used. Every call is
//! recorded so tests can assert on what the agent actually sent.
//!
//! ```rust
//! use warden_transport::mock::{Failure, MockAuthority};
//!
//! let authority = MockAuthority::new();
//! authority.push_heartbeat(Err(Failure::Status(503)));
//! authority.push_allowlist(Ok(vec!["0f8fad5bd9cb469fa16570867728950e".into()]));
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use warden_protocol::{
    AllowlistReply, AuthReply, ProtocolError, ServerInfo, Session,
};

use crate::{Authority, TransportError};

/// A failure the mock can produce. `TransportError` itself isn't `Clone`,
/// so scripts hold this and convert on the way out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Non-200 HTTP status with an empty body.
    Status(u16),
    /// 200 with a non-`OK` application status and this message.
    Rejected(String),
}

impl Failure {
    fn into_error(self) -> TransportError {
        match self {
            Self::Status(code) => TransportError::Status {
                code,
                body: String::new(),
            },
            Self::Rejected(message) => {
                TransportError::Protocol(ProtocolError::Rejected(message))
            }
        }
    }
}

/// Builds a successful authenticate reply for a test server.
pub fn auth_reply(is_private: bool) -> AuthReply {
    AuthReply {
        session_key: Some("mock-session-key".into()),
        session_id: Some("mock-session-id".into()),
        server: ServerInfo {
            id: "srv-mock".into(),
            name: "Mock Server".into(),
            description: "A server that only exists in tests".into(),
            is_private,
            owner_id: "0f8fad5b-d9cb-469f-a165-70867728950e".into(),
            owner_name: "tester".into(),
            language: "en".into(),
        },
    }
}

struct Script {
    auth: VecDeque<Result<AuthReply, Failure>>,
    auth_fallback: Result<AuthReply, Failure>,
    heartbeats: VecDeque<Result<(), Failure>>,
    heartbeat_fallback: Result<(), Failure>,
    heartbeat_latency: Option<Duration>,
    allowlists: VecDeque<Result<Vec<String>, Failure>>,
    allowlist_fallback: Result<Vec<String>, Failure>,
    // Call log
    server_keys: Vec<String>,
    heartbeat_counts: Vec<u32>,
    heartbeat_sessions: Vec<String>,
    allowlist_calls: usize,
}

/// A scripted [`Authority`].
///
/// Defaults: authenticate succeeds for a public server, heartbeats
/// succeed, allow-list fetches fail with 503.
pub struct MockAuthority {
    script: Mutex<Script>,
}

impl Default for MockAuthority {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAuthority {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                auth: VecDeque::new(),
                auth_fallback: Ok(auth_reply(false)),
                heartbeats: VecDeque::new(),
                heartbeat_fallback: Ok(()),
                heartbeat_latency: None,
                allowlists: VecDeque::new(),
                allowlist_fallback: Err(Failure::Status(503)),
                server_keys: Vec::new(),
                heartbeat_counts: Vec::new(),
                heartbeat_sessions: Vec::new(),
                allowlist_calls: 0,
            }),
        }
    }

    /// A mock whose authenticate call reports a private server.
    pub fn private_server() -> Self {
        let mock = Self::new();
        mock.script.lock().auth_fallback = Ok(auth_reply(true));
        mock
    }

    // -- Scripting --------------------------------------------------------

    pub fn push_auth(&self, outcome: Result<AuthReply, Failure>) {
        self.script.lock().auth.push_back(outcome);
    }

    pub fn push_heartbeat(&self, outcome: Result<(), Failure>) {
        self.script.lock().heartbeats.push_back(outcome);
    }

    pub fn set_heartbeat_fallback(&self, outcome: Result<(), Failure>) {
        self.script.lock().heartbeat_fallback = outcome;
    }

    /// Makes every heartbeat take `latency` (Tokio time) before answering.
    pub fn set_heartbeat_latency(&self, latency: Duration) {
        self.script.lock().heartbeat_latency = Some(latency);
    }

    pub fn push_allowlist(&self, outcome: Result<Vec<String>, Failure>) {
        self.script.lock().allowlists.push_back(outcome);
    }

    pub fn set_allowlist_fallback(
        &self,
        outcome: Result<Vec<String>, Failure>,
    ) {
        self.script.lock().allowlist_fallback = outcome;
    }

    // -- Call log ---------------------------------------------------------

    /// Server keys presented to `authenticate`, in call order.
    pub fn server_keys(&self) -> Vec<String> {
        self.script.lock().server_keys.clone()
    }

    /// Player counts carried by each heartbeat, in call order.
    pub fn heartbeat_counts(&self) -> Vec<u32> {
        self.script.lock().heartbeat_counts.clone()
    }

    pub fn heartbeat_calls(&self) -> usize {
        self.script.lock().heartbeat_counts.len()
    }

    /// Session ids presented with each heartbeat.
    pub fn heartbeat_sessions(&self) -> Vec<String> {
        self.script.lock().heartbeat_sessions.clone()
    }

    pub fn allowlist_calls(&self) -> usize {
        self.script.lock().allowlist_calls
    }
}

impl Authority for MockAuthority {
    async fn authenticate(
        &self,
        server_key: &str,
    ) -> Result<AuthReply, TransportError> {
        let outcome = {
            let mut script = self.script.lock();
            script.server_keys.push(server_key.to_string());
            script
                .auth
                .pop_front()
                .unwrap_or_else(|| script.auth_fallback.clone())
        };
        outcome.map_err(Failure::into_error)
    }

    async fn heartbeat(
        &self,
        session: &Session,
        player_count: u32,
    ) -> Result<(), TransportError> {
        let (outcome, latency) = {
            let mut script = self.script.lock();
            script.heartbeat_counts.push(player_count);
            script.heartbeat_sessions.push(session.id().to_string());
            let outcome = script
                .heartbeats
                .pop_front()
                .unwrap_or_else(|| script.heartbeat_fallback.clone());
            (outcome, script.heartbeat_latency)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        outcome.map_err(Failure::into_error)
    }

    async fn fetch_allowlist(
        &self,
        _session: &Session,
    ) -> Result<AllowlistReply, TransportError> {
        let outcome = {
            let mut script = self.script.lock();
            script.allowlist_calls += 1;
            script
                .allowlists
                .pop_front()
                .unwrap_or_else(|| script.allowlist_fallback.clone())
        };
        outcome
            .map(|allowed_users| AllowlistReply { allowed_users })
            .map_err(Failure::into_error)
    }
}
