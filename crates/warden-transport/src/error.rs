use warden_protocol::ProtocolError;

/// Errors that can occur while talking to the authority.
///
/// The `Display` output doubles as the operator-facing diagnostic, so
/// `Status` includes the response body and `Protocol` passes the
/// authority's own `message` through unchanged.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The HTTP client could not be constructed.
    #[cfg(feature = "http")]
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request never produced a response (DNS, connect timeout,
    /// TLS, reset connection, invalid header value).
    #[cfg(feature = "http")]
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The authority answered with a non-200 HTTP status.
    #[error("unexpected status {code}: {body}")]
    Status { code: u16, body: String },

    /// The authority answered 200 but the body was unusable or rejected.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
