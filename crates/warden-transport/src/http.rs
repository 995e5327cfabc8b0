//! HTTP authority implementation using `reqwest`.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, StatusCode};
use warden_protocol::{
    decode_reply, headers, AllowlistReply, AuthReply, Endpoints,
    HeartbeatReply, Session, DEFAULT_BASE_URL,
};

use crate::{Authority, TransportError};

/// Where the authority lives and how long we wait to reach it.
#[derive(Debug, Clone)]
pub struct AuthorityConfig {
    /// Base URL; endpoint paths are appended to it.
    pub base_url: String,
    /// Bound on establishing a connection. Default: 10 seconds.
    pub connect_timeout: Duration,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl AuthorityConfig {
    /// Default settings pointed at a different base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

/// An [`Authority`] reached over HTTPS.
///
/// Cheap to share: `reqwest::Client` pools connections internally, so one
/// instance is meant to serve the authenticator, the heartbeat scheduler
/// and the allow-list cache for the life of the process.
#[derive(Debug, Clone)]
pub struct HttpAuthority {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpAuthority {
    /// Builds the HTTP client.
    pub fn new(config: &AuthorityConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(TransportError::Client)?;

        tracing::debug!(base_url = %config.base_url, "authority client ready");

        Ok(Self {
            client,
            endpoints: Endpoints::new(&config.base_url),
        })
    }

    /// The resolved endpoint URLs.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Sends the request and returns the body of a 200 response.
    async fn exchange(
        &self,
        request: RequestBuilder,
    ) -> Result<Vec<u8>, TransportError> {
        let response = request
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(TransportError::Request)?;

        let status = response.status();
        let body = response.bytes().await.map_err(TransportError::Request)?;

        tracing::trace!(
            status = status.as_u16(),
            body = %String::from_utf8_lossy(&body),
            "authority response"
        );

        if status != StatusCode::OK {
            return Err(TransportError::Status {
                code: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(body.to_vec())
    }

    fn with_session(
        request: RequestBuilder,
        session: &Session,
    ) -> RequestBuilder {
        request
            .header(headers::SESSION_KEY, session.key())
            .header(headers::SESSION_ID, session.id())
    }
}

impl Authority for HttpAuthority {
    async fn authenticate(
        &self,
        server_key: &str,
    ) -> Result<AuthReply, TransportError> {
        let request = self
            .client
            .post(self.endpoints.authenticate.as_str())
            .header(headers::SERVER_KEY, server_key);

        let body = self.exchange(request).await?;
        Ok(decode_reply(&body)?)
    }

    async fn heartbeat(
        &self,
        session: &Session,
        player_count: u32,
    ) -> Result<(), TransportError> {
        let request = Self::with_session(
            self.client.post(self.endpoints.heartbeat.as_str()),
            session,
        )
        .header(headers::PLAYER_COUNT, player_count.to_string());

        let body = self.exchange(request).await?;
        decode_reply::<HeartbeatReply>(&body)?;
        Ok(())
    }

    async fn fetch_allowlist(
        &self,
        session: &Session,
    ) -> Result<AllowlistReply, TransportError> {
        let request = Self::with_session(
            self.client.get(self.endpoints.allowlist.as_str()),
            session,
        );

        let body = self.exchange(request).await?;
        Ok(decode_reply(&body)?)
    }
}
