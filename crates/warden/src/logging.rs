//! Tracing subscriber setup for hosts that don't install their own.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Targets that get `debug` level when the config's `debug` flag is on.
const AGENT_TARGETS: &[&str] = &[
    "warden",
    "warden_protocol",
    "warden_transport",
    "warden_session",
    "warden_heartbeat",
    "warden_allowlist",
];

/// The filter used when `RUST_LOG` is not set.
pub fn default_directives(debug: bool) -> String {
    let mut directives = String::from("info");
    if debug {
        for target in AGENT_TARGETS {
            directives.push_str(&format!(",{target}=debug"));
        }
    }
    directives
}

/// Installs a fmt subscriber. `RUST_LOG` wins when set.
///
/// Returns `false` if a global subscriber was already installed, in which
/// case nothing changes.
pub fn init(debug: bool) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(debug)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
