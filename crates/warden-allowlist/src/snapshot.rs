//! The persisted allow-list snapshot.
//!
//! ```json
//! { "identities": [ { "identity": "0f8f…950e", "expiresAt": "2026-01-01T00:00:00Z" } ] }
//! ```
//!
//! The file is the offline fallback: overwritten wholesale after every
//! successful remote refresh, read back on startup and on explicit
//! reload. Writes go to a temporary file in the same directory which is
//! then renamed over the target, so a crash mid-write leaves the previous
//! snapshot intact.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::{IdentityId, SnapshotError};

/// One persisted identity.
///
/// `identity` is kept as a raw string so a hand-edited file with a bad
/// entry still loads; validation happens when the snapshot is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub identity: String,
    #[serde(
        rename = "expiresAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<DateTime<Utc>>,
}

impl SnapshotEntry {
    /// A permanent entry.
    pub fn permanent(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            expires_at: None,
        }
    }

    /// An entry that stops counting at `expires_at`.
    pub fn expiring(
        identity: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            identity: identity.into(),
            expires_at: Some(expires_at),
        }
    }

    /// Expired entries are inert: an expiry at or before `now` excludes
    /// the entry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// The whole snapshot file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub identities: Vec<SnapshotEntry>,
}

impl Snapshot {
    /// A snapshot of permanent entries, in the given order.
    pub fn from_ids<'a>(ids: impl IntoIterator<Item = &'a IdentityId>) -> Self {
        Self {
            identities: ids
                .into_iter()
                .map(|id| SnapshotEntry::permanent(id.as_str()))
                .collect(),
        }
    }
}

/// Reads and writes the snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the snapshot. A missing file is an empty snapshot.
    pub fn load(&self) -> Result<Snapshot, SnapshotError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(Snapshot::default());
            }
            Err(source) => return Err(self.io_error(source)),
        };

        serde_json::from_slice(&bytes).map_err(|source| {
            SnapshotError::Format {
                path: self.path.clone(),
                source,
            }
        })
    }

    /// Replaces the snapshot file atomically.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let json = serde_json::to_vec_pretty(snapshot).map_err(|source| {
            SnapshotError::Format {
                path: self.path.clone(),
                source,
            }
        })?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;

        let mut tmp =
            NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(&json).map_err(|e| self.io_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;
        Ok(())
    }

    fn io_error(&self, source: io::Error) -> SnapshotError {
        SnapshotError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
