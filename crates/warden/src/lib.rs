//! # Warden
//!
//! Sidecar agent that keeps a game server in good standing with its
//! remote authority.
//!
//! At startup the agent exchanges the server key for a session, then
//! keeps that session alive with periodic heartbeats carrying the player
//! count. On a private server it also keeps an allow-list of player
//! identities fresh and answers the host's admission checks from it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use warden::prelude::*;
//!
//! # async fn run() -> Result<(), WardenError> {
//! let config = AgentConfig::load_or_create(Path::new(DEFAULT_CONFIG_PATH))?;
//! warden::logging::init(config.server.debug);
//!
//! let agent = Agent::builder(config).connect().await?;
//! agent.start().await?;
//!
//! if let AccessDecision::Denied { kick_message } = agent.check("0f8fad5b-d9cb-469f-a165-70867728950e") {
//!     // disconnect the player with `kick_message`
//! #   let _ = kick_message;
//! }
//!
//! agent.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod agent;
pub mod banner;
pub mod config;
mod error;
mod gate;
pub mod logging;

pub use agent::{Agent, AgentBuilder};
pub use config::{AgentConfig, DEFAULT_CONFIG_PATH, ENV_SERVER_KEY};
pub use error::{ConfigError, WardenError};
pub use gate::{AccessDecision, AccessGate};

/// Re-exports for hosts.
pub mod prelude {
    pub use crate::{
        AccessDecision, AccessGate, Agent, AgentBuilder, AgentConfig,
        ConfigError, WardenError, DEFAULT_CONFIG_PATH,
    };
    pub use warden_allowlist::{AllowlistStatus, RefreshError};
    pub use warden_heartbeat::{
        AtomicPlayerCount, HeartbeatState, PlayerCountSource,
    };
    pub use warden_protocol::ServerProfile;
}
