//! Error types for the session layer.

use warden_transport::TransportError;

/// Why authentication failed.
///
/// Every variant is fatal to startup. `Display` is meant to be shown to
/// the operator as-is, so a rejection carries the authority's own message.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No server key was supplied.
    #[error("server key is empty")]
    EmptyKey,

    /// The request failed, returned a non-200 status, or was rejected.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The authority said `OK` but left out part of the session.
    #[error("authority reply is missing {0}")]
    IncompleteSession(&'static str),
}
