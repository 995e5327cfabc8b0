//! The one-shot credential exchange.
//!
//! The authenticator is generic over [`Authority`] so the same code runs
//! against the real HTTP authority in production and a scripted one in
//! tests. It holds the authority behind an `Arc` because the heartbeat
//! scheduler and the allow-list cache keep using the same client after
//! bootstrap.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use warden_protocol::{ServerProfile, Session};
use warden_transport::Authority;

use crate::AuthError;

/// The result of a successful exchange.
#[derive(Debug, Clone)]
pub struct Authenticated {
    /// Credentials for every later authority call.
    pub session: Session,
    /// What the authority told us about this server.
    pub profile: ServerProfile,
}

/// Exchanges the server key for a session.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use warden_session::SessionAuthenticator;
/// use warden_transport::{AuthorityConfig, HttpAuthority};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let authority = Arc::new(HttpAuthority::new(&AuthorityConfig::default())?);
/// let authenticated = SessionAuthenticator::new(authority)
///     .authenticate("my-server-key")
///     .await?;
/// println!("running as {}", authenticated.profile.name);
/// # Ok(())
/// # }
/// ```
pub struct SessionAuthenticator<A> {
    authority: Arc<A>,
}

impl<A: Authority> SessionAuthenticator<A> {
    pub fn new(authority: Arc<A>) -> Self {
        Self { authority }
    }

    /// Performs the exchange.
    ///
    /// No retry: the caller treats every error as fatal.
    ///
    /// # Errors
    /// - [`AuthError::EmptyKey`] if `server_key` is empty (no request is made)
    /// - [`AuthError::Transport`] for network failures, non-200 statuses and
    ///   rejections (the authority's message is kept verbatim)
    /// - [`AuthError::IncompleteSession`] if the reply is `OK` but either
    ///   session field is missing or empty
    pub async fn authenticate(
        &self,
        server_key: &str,
    ) -> Result<Authenticated, AuthError> {
        if server_key.is_empty() {
            return Err(AuthError::EmptyKey);
        }

        debug!("authenticating with the authority");
        let reply = self.authority.authenticate(server_key).await?;

        let session_key = reply
            .session_key
            .filter(|k| !k.is_empty())
            .ok_or(AuthError::IncompleteSession("sessionKey"))?;
        let session_id = reply
            .session_id
            .filter(|id| !id.is_empty())
            .ok_or(AuthError::IncompleteSession("sessionId"))?;

        let session = Session::new(session_key, session_id);
        let profile = ServerProfile::from_info(reply.server, Utc::now());

        info!(
            server_id = %profile.id,
            server = %profile.name,
            private = profile.is_private,
            "authenticated"
        );

        Ok(Authenticated { session, profile })
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use warden_protocol::ProtocolError;
    use warden_transport::mock::{auth_reply, Failure, MockAuthority};
    use warden_transport::TransportError;

    use super::*;

    fn authenticator(
        mock: MockAuthority,
    ) -> (Arc<MockAuthority>, SessionAuthenticator<MockAuthority>) {
        let mock = Arc::new(mock);
        (Arc::clone(&mock), SessionAuthenticator::new(mock))
    }

    // =====================================================================
    // Success
    // =====================================================================

    #[tokio::test]
    async fn test_authenticate_success_returns_session_and_profile() {
        let (mock, auth) = authenticator(MockAuthority::private_server());

        let result = auth.authenticate("key-1").await.expect("should succeed");

        assert_eq!(result.session.key(), "mock-session-key");
        assert_eq!(result.session.id(), "mock-session-id");
        assert!(result.session.is_valid());
        assert_eq!(result.profile.id, "srv-mock");
        assert!(result.profile.is_private);
        assert_eq!(result.profile.player_count, 0);
        assert_eq!(mock.server_keys(), vec!["key-1".to_string()]);
    }

    #[tokio::test]
    async fn test_authenticate_public_server_profile_not_private() {
        let (_mock, auth) = authenticator(MockAuthority::new());

        let result = auth.authenticate("key").await.expect("should succeed");

        assert!(!result.profile.is_private);
        assert_eq!(result.profile.visibility(), "Public");
    }

    // =====================================================================
    // Failures
    // =====================================================================

    #[tokio::test]
    async fn test_authenticate_empty_key_makes_no_request() {
        let (mock, auth) = authenticator(MockAuthority::new());

        let err = auth.authenticate("").await.unwrap_err();

        assert!(matches!(err, AuthError::EmptyKey));
        assert!(mock.server_keys().is_empty());
    }

    #[tokio::test]
    async fn test_authenticate_rejected_keeps_authority_message() {
        let mock = MockAuthority::new();
        mock.push_auth(Err(Failure::Rejected("Invalid server key".into())));
        let (_mock, auth) = authenticator(mock);

        let err = auth.authenticate("bad").await.unwrap_err();

        assert!(matches!(
            err,
            AuthError::Transport(TransportError::Protocol(
                ProtocolError::Rejected(_)
            ))
        ));
        assert_eq!(err.to_string(), "Invalid server key");
    }

    #[tokio::test]
    async fn test_authenticate_non_200_is_error() {
        let mock = MockAuthority::new();
        mock.push_auth(Err(Failure::Status(502)));
        let (_mock, auth) = authenticator(mock);

        let err = auth.authenticate("key").await.unwrap_err();

        assert!(err.to_string().contains("502"), "got {err}");
    }

    #[tokio::test]
    async fn test_authenticate_missing_session_key_is_incomplete() {
        let mock = MockAuthority::new();
        let mut reply = auth_reply(false);
        reply.session_key = None;
        mock.push_auth(Ok(reply));
        let (_mock, auth) = authenticator(mock);

        let err = auth.authenticate("key").await.unwrap_err();

        assert!(matches!(err, AuthError::IncompleteSession("sessionKey")));
    }

    #[tokio::test]
    async fn test_authenticate_empty_session_id_is_incomplete() {
        let mock = MockAuthority::new();
        let mut reply = auth_reply(false);
        reply.session_id = Some(String::new());
        mock.push_auth(Ok(reply));
        let (_mock, auth) = authenticator(mock);

        let err = auth.authenticate("key").await.unwrap_err();

        assert!(matches!(err, AuthError::IncompleteSession("sessionId")));
        assert_eq!(err.to_string(), "authority reply is missing sessionId");
    }
}
