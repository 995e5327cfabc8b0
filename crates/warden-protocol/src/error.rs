//! Error types for the protocol layer.
//!
//! Each crate in Warden defines its own error enum. A `ProtocolError`
//! means the authority answered, but the answer was unusable: malformed
//! JSON, a non-`OK` application status, or a missing field.

/// Errors that can occur while decoding an authority reply.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The body was not valid JSON, or didn't match the expected shape.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The reply carried no `status` field at all.
    #[error("reply is missing the status field")]
    MissingStatus,

    /// The authority answered with a status other than `"OK"`.
    ///
    /// The string is the reply's `message` field, verbatim, or
    /// `"Unknown error"` when the authority didn't send one.
    #[error("{0}")]
    Rejected(String),

    /// A field required by the caller was absent or empty.
    #[error("reply is missing required field `{0}`")]
    MissingField(&'static str),
}
