//! Agent configuration, read from a TOML file.
//!
//! Every section and field is optional. Missing values take the defaults
//! shown in [`TEMPLATE`], which is also what gets written when the file
//! doesn't exist yet. Only `server.key` has no usable default; the agent
//! refuses to start without one.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use warden_allowlist::AllowlistConfig;
use warden_heartbeat::HeartbeatConfig;
use warden_protocol::DEFAULT_BASE_URL;
use warden_transport::AuthorityConfig;

use crate::ConfigError;

/// Where hosts conventionally keep the config file.
pub const DEFAULT_CONFIG_PATH: &str = "config/warden/warden.toml";

/// Environment variable that overrides `server.key` when set and non-empty.
pub const ENV_SERVER_KEY: &str = "WARDEN_SERVER_KEY";

/// Default kick message for players not on the allow-list.
pub const DEFAULT_KICK_MESSAGE: &str =
    "You are not allowed to join this private server";

/// The file written on first run.
pub const TEMPLATE: &str = r#"# Warden agent configuration

[server]
# Server key issued by the authority. Can also be supplied through the
# WARDEN_SERVER_KEY environment variable.
key = ""
# Verbose logging for the agent's own modules.
debug = false
# Shown to players who are not on a private server's allow-list.
kick_message = "You are not allowed to join this private server"

[authority]
base_url = "https://api.visoftware.dev/services/runtime/server"
connect_timeout_secs = 10

[heartbeat]
period_secs = 30
retry_base_secs = 30
retry_max_secs = 300
stop_grace_secs = 5

[allowlist]
# Relative paths are resolved against this file's directory.
cache_file = "allowlist-cache.json"
refresh_interval_secs = 900
accept_empty = false
"#;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub key: String,
    pub debug: bool,
    pub kick_message: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            key: String::new(),
            debug: false,
            kick_message: DEFAULT_KICK_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthoritySection {
    pub base_url: String,
    pub connect_timeout_secs: u64,
}

impl Default for AuthoritySection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatSection {
    pub period_secs: u64,
    pub retry_base_secs: u64,
    pub retry_max_secs: u64,
    pub stop_grace_secs: u64,
}

impl Default for HeartbeatSection {
    fn default() -> Self {
        Self {
            period_secs: 30,
            retry_base_secs: 30,
            retry_max_secs: 300,
            stop_grace_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowlistSection {
    pub cache_file: PathBuf,
    pub refresh_interval_secs: u64,
    pub accept_empty: bool,
}

impl Default for AllowlistSection {
    fn default() -> Self {
        Self {
            cache_file: PathBuf::from("allowlist-cache.json"),
            refresh_interval_secs: 900,
            accept_empty: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AgentConfig
// ---------------------------------------------------------------------------

/// Everything the agent reads from its config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub server: ServerSection,
    pub authority: AuthoritySection,
    pub heartbeat: HeartbeatSection,
    pub allowlist: AllowlistSection,
}

impl AgentConfig {
    /// Parses a TOML document. `path` is only used in error messages.
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads and parses `path`, resolves `cache_file` against its
    /// directory and applies environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let mut config = Self::from_toml(&content, path)?;

        if let Some(dir) = path.parent() {
            config.resolve_relative_to(dir);
        }
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Like [`load`](Self::load), but writes [`TEMPLATE`] first if `path`
    /// doesn't exist.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let write_err = |source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            };
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir).map_err(write_err)?;
            }
            fs::write(path, TEMPLATE).map_err(write_err)?;
            info!(path = %path.display(), "created default config");
        }
        Self::load(path)
    }

    /// Makes a relative `cache_file` relative to `dir`.
    pub fn resolve_relative_to(&mut self, dir: &Path) {
        if self.allowlist.cache_file.is_relative() {
            self.allowlist.cache_file = dir.join(&self.allowlist.cache_file);
        }
    }

    /// Applies environment overrides using `lookup` to read variables.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) {
        if let Some(key) = lookup(ENV_SERVER_KEY).filter(|k| !k.trim().is_empty()) {
            if !self.server.key.is_empty() {
                warn!("{ENV_SERVER_KEY} overrides server.key from the config file");
            }
            self.server.key = key.trim().to_string();
        }
    }

    /// Checks what can't be defaulted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.key.trim().is_empty() {
            return Err(ConfigError::MissingServerKey);
        }
        Ok(())
    }

    pub fn authority_config(&self) -> AuthorityConfig {
        AuthorityConfig {
            base_url: self.authority.base_url.clone(),
            connect_timeout: Duration::from_secs(
                self.authority.connect_timeout_secs,
            ),
        }
    }

    pub fn heartbeat_config(&self) -> HeartbeatConfig {
        HeartbeatConfig {
            period: Duration::from_secs(self.heartbeat.period_secs),
            retry_base: Duration::from_secs(self.heartbeat.retry_base_secs),
            retry_max: Duration::from_secs(self.heartbeat.retry_max_secs),
            stop_grace: Duration::from_secs(self.heartbeat.stop_grace_secs),
        }
    }

    pub fn allowlist_config(&self) -> AllowlistConfig {
        AllowlistConfig {
            snapshot_path: self.allowlist.cache_file.clone(),
            refresh_interval: Duration::from_secs(
                self.allowlist.refresh_interval_secs,
            ),
            accept_empty: self.allowlist.accept_empty,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let config =
            AgentConfig::from_toml(TEMPLATE, Path::new("warden.toml")).unwrap();
        assert_eq!(config, AgentConfig::default());
    }

    #[test]
    fn test_from_toml_partial_file_fills_defaults() {
        let config = AgentConfig::from_toml(
            "[server]\nkey = \"abc\"\n[heartbeat]\nperiod_secs = 10\n",
            Path::new("warden.toml"),
        )
        .unwrap();

        assert_eq!(config.server.key, "abc");
        assert_eq!(config.server.kick_message, DEFAULT_KICK_MESSAGE);
        assert_eq!(config.heartbeat.period_secs, 10);
        assert_eq!(config.heartbeat.retry_max_secs, 300);
        assert_eq!(config.authority.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_from_toml_invalid_is_parse_error() {
        let err = AgentConfig::from_toml("[server\nkey=", Path::new("w.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("w.toml"));
    }

    #[test]
    fn test_validate_empty_key_is_missing() {
        let err = AgentConfig::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingServerKey));
    }

    #[test]
    fn test_env_override_replaces_key() {
        let mut config = AgentConfig::default();
        config.server.key = "from-file".into();

        config.apply_env_overrides(|name| {
            (name == ENV_SERVER_KEY).then(|| " from-env ".to_string())
        });

        assert_eq!(config.server.key, "from-env");
    }

    #[test]
    fn test_env_override_ignores_blank_value() {
        let mut config = AgentConfig::default();
        config.server.key = "from-file".into();

        config.apply_env_overrides(|_| Some("  ".into()));
        config.apply_env_overrides(no_env);

        assert_eq!(config.server.key, "from-file");
    }

    #[test]
    fn test_resolve_relative_cache_file() {
        let mut config = AgentConfig::default();
        config.resolve_relative_to(Path::new("/srv/game/config/warden"));
        assert_eq!(
            config.allowlist.cache_file,
            PathBuf::from("/srv/game/config/warden/allowlist-cache.json")
        );

        config.allowlist.cache_file = PathBuf::from("/var/cache/allow.json");
        config.resolve_relative_to(Path::new("/elsewhere"));
        assert_eq!(
            config.allowlist.cache_file,
            PathBuf::from("/var/cache/allow.json")
        );
    }

    #[test]
    fn test_component_configs_use_sections() {
        let mut config = AgentConfig::default();
        config.heartbeat.retry_max_secs = 120;
        config.allowlist.accept_empty = true;
        config.authority.connect_timeout_secs = 3;

        assert_eq!(config.heartbeat_config().retry_max, Duration::from_secs(120));
        assert!(config.allowlist_config().accept_empty);
        assert_eq!(
            config.allowlist_config().refresh_interval,
            Duration::from_secs(900)
        );
        assert_eq!(
            config.authority_config().connect_timeout,
            Duration::from_secs(3)
        );
    }
}
