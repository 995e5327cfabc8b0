//! `Agent` builder and lifecycle.
//!
//! This is the entry point for hosting Warden in a game server. It ties
//! together all the layers: transport → session → heartbeat + allow-list
//! → access gate.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;
use warden_allowlist::{AllowlistCache, AllowlistStatus};
use warden_heartbeat::{
    HeartbeatMetrics, HeartbeatScheduler, HeartbeatState, PlayerCountSource,
};
use warden_protocol::{ServerProfile, Session};
use warden_session::SessionAuthenticator;
use warden_transport::{Authority, HttpAuthority};

use crate::gate::{AccessDecision, AccessGate};
use crate::{banner, AgentConfig, WardenError};

/// Builder for connecting an [`Agent`].
///
/// # Example
///
/// ```rust,no_run
/// use warden::prelude::*;
///
/// # async fn run(config: AgentConfig) -> Result<(), WardenError> {
/// let players = AtomicPlayerCount::new(0);
/// let agent = Agent::builder(config)
///     .players(PlayerCountSource::counter(players.clone()))
///     .connect()
///     .await?;
/// agent.start().await?;
/// // ... server runs, consulting agent.check(identity) on each join ...
/// agent.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct AgentBuilder {
    config: AgentConfig,
    players: PlayerCountSource,
}

impl AgentBuilder {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            players: PlayerCountSource::default(),
        }
    }

    /// Sets where heartbeats read the player count from.
    pub fn players(mut self, players: PlayerCountSource) -> Self {
        self.players = players;
        self
    }

    /// Authenticates against the configured authority over HTTPS.
    pub async fn connect(self) -> Result<Agent<HttpAuthority>, WardenError> {
        self.config.validate()?;
        let authority = HttpAuthority::new(&self.config.authority_config())?;
        self.connect_with(Arc::new(authority)).await
    }

    /// Authenticates against `authority` and wires up the components.
    ///
    /// Nothing runs in the background until [`Agent::start`].
    ///
    /// # Errors
    /// Every error here is fatal: a missing server key, or an
    /// authentication the authority refused or never answered.
    pub async fn connect_with<A: Authority>(
        self,
        authority: Arc<A>,
    ) -> Result<Agent<A>, WardenError> {
        self.config.validate()?;

        let authenticated = SessionAuthenticator::new(Arc::clone(&authority))
            .authenticate(&self.config.server.key)
            .await?;
        banner::server_info(&authenticated.profile);

        let restricted = authenticated.profile.is_private;
        let session = authenticated.session;
        let profile = Arc::new(RwLock::new(authenticated.profile));

        let heartbeat = HeartbeatScheduler::new(
            Arc::clone(&authority),
            session.clone(),
            profile,
            self.players,
            self.config.heartbeat_config(),
        );
        let allowlist = Arc::new(AllowlistCache::new(
            authority,
            session.clone(),
            restricted,
            self.config.allowlist_config(),
        ));
        let gate = AccessGate::new(
            Arc::clone(&allowlist),
            self.config.server.kick_message.clone(),
        );

        Ok(Agent {
            config: self.config,
            session,
            heartbeat,
            allowlist,
            gate,
        })
    }
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// An authenticated Warden agent.
///
/// Call [`start`](Self::start) to begin heartbeating and (on a private
/// server) keeping the allow-list fresh, and [`shutdown`](Self::shutdown)
/// when the host stops.
pub struct Agent<A = HttpAuthority> {
    config: AgentConfig,
    session: Session,
    heartbeat: HeartbeatScheduler<A>,
    allowlist: Arc<AllowlistCache<A>>,
    gate: AccessGate<A>,
}

impl Agent<HttpAuthority> {
    pub fn builder(config: AgentConfig) -> AgentBuilder {
        AgentBuilder::new(config)
    }
}

impl<A: Authority> Agent<A> {
    /// Sends the first heartbeat, then starts the periodic heartbeat and
    /// allow-list refresh.
    ///
    /// # Errors
    /// [`WardenError::Heartbeat`] if the first heartbeat fails. The host
    /// is expected to shut down.
    pub async fn start(&self) -> Result<(), WardenError> {
        let players = self.heartbeat.players().current();
        self.heartbeat.start(players).await?;
        self.allowlist.start();

        info!(
            private = self.gate.is_restricted(),
            "warden agent running"
        );
        Ok(())
    }

    /// Stops both periodic tasks. Idempotent.
    pub async fn shutdown(&self) {
        tokio::join!(self.heartbeat.stop(), self.allowlist.stop());
        info!("warden agent stopped");
    }

    /// Whether `identity` may join.
    pub fn is_allowed(&self, identity: &str) -> bool {
        self.gate.is_allowed(identity)
    }

    /// Admission check with logging and the kick message on denial.
    pub fn check(&self, identity: &str) -> AccessDecision {
        self.gate.check(identity)
    }

    /// A cloneable handle to the gate, for join handlers.
    pub fn gate(&self) -> AccessGate<A> {
        self.gate.clone()
    }

    pub fn kick_message(&self) -> &str {
        self.gate.kick_message()
    }

    /// Fetches the allow-list now. Repeated calls may be rate limited by
    /// the authority.
    pub async fn refresh_allowlist(&self) -> Result<usize, WardenError> {
        Ok(self.allowlist.refresh().await?)
    }

    /// Replaces the allow-list with the local snapshot. The next refresh
    /// overwrites it again.
    pub fn reload_allowlist(&self) -> Result<usize, WardenError> {
        Ok(self.allowlist.reload_from_persisted()?)
    }

    pub fn allowlist_status(&self) -> AllowlistStatus {
        self.allowlist.status()
    }

    /// The shared player-count source. Replacing its provider affects the
    /// next heartbeat.
    pub fn players(&self) -> &PlayerCountSource {
        self.heartbeat.players()
    }

    /// A copy of the current server profile.
    pub fn profile(&self) -> ServerProfile {
        self.heartbeat.profile().read().clone()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn heartbeat_state(&self) -> HeartbeatState {
        self.heartbeat.state()
    }

    pub fn heartbeat_metrics(&self) -> HeartbeatMetrics {
        self.heartbeat.metrics()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}
