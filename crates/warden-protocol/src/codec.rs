//! Reply decoding.
//!
//! Every authority reply is a JSON object with a `status` field. Success
//! at the application level is `"status": "OK"`, which is checked
//! separately from (and in addition to) the HTTP status the transport
//! layer already verified. On failure the object carries a `message`
//! that we surface verbatim.
//!
//! The reply is parsed once into a `serde_json::Value`, the status is
//! checked, and only then is the value converted into the typed reply.
//! That way a rejected reply never fails with a confusing "missing field"
//! error for fields that a failure reply simply doesn't have.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::ProtocolError;

/// The application-level status value that marks a successful reply.
pub const STATUS_OK: &str = "OK";

/// Fallback diagnostic when a rejection carries no `message`.
const UNKNOWN_ERROR: &str = "Unknown error";

/// Decodes an authority reply body into `T`.
///
/// # Errors
/// - [`ProtocolError::Decode`]: body is not JSON or doesn't fit `T`
/// - [`ProtocolError::MissingStatus`]: no `status` string in the body
/// - [`ProtocolError::Rejected`]: `status` is anything but `"OK"`
///
/// # Example
///
/// ```rust
/// use warden_protocol::{decode_reply, AllowlistReply};
///
/// let body = br#"{"status":"OK","allowedUsers":["abc"]}"#;
/// let reply: AllowlistReply = decode_reply(body).unwrap();
/// assert_eq!(reply.allowed_users, vec!["abc".to_string()]);
/// ```
pub fn decode_reply<T: DeserializeOwned>(
    body: &[u8],
) -> Result<T, ProtocolError> {
    let value: Value =
        serde_json::from_slice(body).map_err(ProtocolError::Decode)?;

    let status = value
        .get("status")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingStatus)?;

    if status != STATUS_OK {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_ERROR);
        return Err(ProtocolError::Rejected(message.to_string()));
    }

    serde_json::from_value(value).map_err(ProtocolError::Decode)
}
