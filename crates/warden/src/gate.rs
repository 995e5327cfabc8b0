//! The admission predicate the host consults for each joining player.

use std::sync::Arc;

use tracing::{debug, info};
use warden_allowlist::AllowlistCache;
use warden_transport::Authority;

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    /// The host should disconnect the player with `kick_message`.
    Denied { kick_message: String },
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Read-only view over the allow-list cache.
///
/// Whether the server is restricted was decided at authentication and
/// never changes; on an unrestricted server everyone is granted.
pub struct AccessGate<A> {
    cache: Arc<AllowlistCache<A>>,
    kick_message: String,
}

impl<A> Clone for AccessGate<A> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            kick_message: self.kick_message.clone(),
        }
    }
}

impl<A: Authority> AccessGate<A> {
    pub fn new(
        cache: Arc<AllowlistCache<A>>,
        kick_message: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            kick_message: kick_message.into(),
        }
    }

    /// Whether `identity` may join.
    pub fn is_allowed(&self, identity: &str) -> bool {
        self.cache.is_allowed(identity)
    }

    /// Like [`is_allowed`](Self::is_allowed), but logs the outcome and
    /// carries the kick message on denial.
    pub fn check(&self, identity: &str) -> AccessDecision {
        if self.is_allowed(identity) {
            debug!(identity, "access granted");
            AccessDecision::Granted
        } else {
            info!(identity, "access denied, player not on the allow-list");
            AccessDecision::Denied {
                kick_message: self.kick_message.clone(),
            }
        }
    }

    pub fn is_restricted(&self) -> bool {
        self.cache.is_restricted()
    }

    pub fn kick_message(&self) -> &str {
        &self.kick_message
    }
}

#[cfg(test)]
mod tests {
    use warden_allowlist::AllowlistConfig;
    use warden_protocol::Session;
    use warden_transport::mock::MockAuthority;

    use super::*;

    const MEMBER: &str = "abcd1234-0000-0000-0000-000000000001";

    fn gate(
        restricted: bool,
        dir: &tempfile::TempDir,
    ) -> (AccessGate<MockAuthority>, Arc<MockAuthority>) {
        let mock = Arc::new(MockAuthority::new());
        let cache = AllowlistCache::new(
            Arc::clone(&mock),
            Session::new("sk", "sid"),
            restricted,
            AllowlistConfig::with_snapshot_path(dir.path().join("cache.json")),
        );
        (AccessGate::new(Arc::new(cache), "Private server"), mock)
    }

    #[test]
    fn test_check_unrestricted_grants_everyone() {
        let dir = tempfile::tempdir().unwrap();
        let (gate, _) = gate(false, &dir);

        assert!(!gate.is_restricted());
        assert_eq!(gate.check("anyone"), AccessDecision::Granted);
    }

    #[tokio::test]
    async fn test_check_restricted_denies_with_kick_message() {
        let dir = tempfile::tempdir().unwrap();
        let (gate, mock) = gate(true, &dir);
        mock.push_allowlist(Ok(vec![MEMBER.to_string()]));
        gate.cache.refresh().await.unwrap();

        assert!(gate.check(&MEMBER.to_uppercase()).is_granted());
        assert_eq!(
            gate.check(&"f".repeat(32)),
            AccessDecision::Denied {
                kick_message: "Private server".into()
            }
        );
    }

    #[test]
    fn test_check_restricted_before_any_load_denies() {
        let dir = tempfile::tempdir().unwrap();
        let (gate, _) = gate(true, &dir);

        assert!(!gate.is_allowed(MEMBER));
        assert_eq!(gate.kick_message(), "Private server");
    }
}
