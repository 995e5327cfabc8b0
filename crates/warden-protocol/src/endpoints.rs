//! Authority endpoint URLs.

/// Production authority base. All three endpoints hang off this path.
pub const DEFAULT_BASE_URL: &str =
    "https://api.visoftware.dev/services/runtime/server";

/// Fully resolved URLs for the three authority calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authenticate: String,
    pub heartbeat: String,
    pub allowlist: String,
}

impl Endpoints {
    /// Resolves the endpoint URLs under `base`. A trailing `/` on the base
    /// is ignored.
    pub fn new(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            authenticate: format!("{base}/authenticate"),
            // The authority really does spell it this way.
            heartbeat: format!("{base}/heartbreath"),
            allowlist: format!("{base}/fetchallowlist"),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
