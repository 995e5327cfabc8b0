//! Identity normalization.
//!
//! The authority and the game host disagree on formatting: one side sends
//! `0F8FAD5B-D9CB-469F-A165-70867728950E`, the other asks about
//! `0f8fad5bd9cb469fa16570867728950e`. Both become the same [`IdentityId`]:
//! separators stripped, lower-cased, exactly [`IDENTITY_LEN`] characters.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Length of a normalized identity.
pub const IDENTITY_LEN: usize = 32;

/// Strips `-` separators and lower-cases. Does not validate.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// A normalized identity.
///
/// Implements `Borrow<str>` so sets of identities can be queried with a
/// normalized `&str` without allocating an `IdentityId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityId(String);

impl IdentityId {
    /// Normalizes `raw` and checks its length.
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let normalized = normalize(raw);
        let len = normalized.chars().count();
        if len != IDENTITY_LEN {
            return Err(IdentityError::WrongLength {
                raw: raw.to_string(),
                len,
            });
        }
        Ok(Self(normalized))
    }

    /// Normalizes `raw` without checking its length.
    ///
    /// Used for identities the authority sends, which are applied as
    /// received. Only snapshot entries are length-checked.
    pub fn normalized(raw: &str) -> Self {
        Self(normalize(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for IdentityId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Borrow<str> for IdentityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A raw identity that doesn't normalize to a valid [`IdentityId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("invalid identity {raw:?}: normalized length {len}, expected 32")]
    WrongLength { raw: String, len: usize },
}
