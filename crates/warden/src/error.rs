//! Unified error type for Warden.

use std::path::PathBuf;

use warden_allowlist::{LoadError, RefreshError};
use warden_heartbeat::HeartbeatError;
use warden_protocol::ProtocolError;
use warden_session::AuthError;
use warden_transport::TransportError;

use crate::config::ENV_SERVER_KEY;

/// Problems with the agent's configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write default config {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no server key configured")]
    MissingServerKey,
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` conversions let the agent use `?` on every layer's
/// result. Startup errors (`Config`, `Transport`, `Auth`, `Heartbeat`)
/// are fatal; the allow-list errors never are.
#[derive(Debug, thiserror::Error)]
pub enum WardenError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Heartbeat(#[from] HeartbeatError),

    #[error(transparent)]
    Refresh(#[from] RefreshError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl WardenError {
    /// Whether the host should shut down.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Refresh(_) | Self::Load(_))
    }

    /// A one-line hint for the operator.
    pub fn remediation(&self) -> String {
        match self {
            Self::Config(ConfigError::MissingServerKey)
            | Self::Auth(AuthError::EmptyKey) => format!(
                "Set server.key in the config file or the {ENV_SERVER_KEY} environment variable."
            ),
            Self::Config(_) => {
                "Fix or delete the config file; a default one is created when missing."
                    .into()
            }
            Self::Auth(AuthError::Transport(TransportError::Protocol(
                ProtocolError::Rejected(_),
            ))) => "Please check your server key and try again.".into(),
            Self::Auth(AuthError::IncompleteSession(_)) => {
                "Failed to obtain valid session credentials. Try again later."
                    .into()
            }
            Self::Auth(_) | Self::Transport(_) => {
                "Check that this machine can reach the authority and try again."
                    .into()
            }
            Self::Heartbeat(_) => {
                "The authority did not accept the first heartbeat. Check connectivity and that the server key is still valid."
                    .into()
            }
            Self::Refresh(RefreshError::Unrestricted) => {
                "This server is public; there is no allow-list to refresh."
                    .into()
            }
            Self::Refresh(_) => {
                "The current allow-list is still enforced. Try again later; repeated calls may be rate limited."
                    .into()
            }
            Self::Load(_) => {
                "Check the allow-list cache file, or refresh from the authority to rewrite it."
                    .into()
            }
        }
    }
}
