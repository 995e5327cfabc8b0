//! Error types for the allow-list cache.

use std::path::PathBuf;

use warden_transport::TransportError;

/// Reading or writing the snapshot file failed.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot I/O failed at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot at {} is not valid JSON: {source}", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Why a remote refresh was refused. The cached set is unchanged in
/// every case.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// This deployment is not access-restricted; there is nothing to fetch.
    #[error("cannot refresh the allow-list of an unrestricted server")]
    Unrestricted,

    /// The fetch failed, returned a non-200 status, or was rejected.
    #[error("allow-list fetch failed: {0}")]
    Transport(#[from] TransportError),

    /// The authority answered `OK` with no identities and empty
    /// sets are not accepted.
    #[error("authority returned an empty allow-list ({received} raw entries); keeping the current set")]
    EmptyAllowlist { received: usize },
}

/// Why loading the persisted snapshot failed.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to load allow-list snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}
