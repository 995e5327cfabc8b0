//! Allow-list cache for Warden.
//!
//! On an access-restricted server only identities on the authority's
//! allow-list may join. This crate keeps that list in memory, refreshes
//! it from the authority every 15 minutes, and persists every successful
//! refresh to a local snapshot so a restart while the authority is
//! unreachable still enforces the last known list.
//!
//! # Sources of truth
//!
//! The in-memory set always comes from exactly one place:
//!
//! ```text
//! refresh()               → last successful remote fetch (also persisted)
//! reload_from_persisted() → the snapshot as of that load
//! ```
//!
//! A failed refresh changes nothing. Expired snapshot entries and
//! identities that don't normalize to 32 characters are skipped.

mod cache;
mod config;
mod error;
mod identity;
mod snapshot;

pub use cache::{AllowedSet, AllowlistCache, AllowlistStatus, SetSource};
pub use config::AllowlistConfig;
pub use error::{LoadError, RefreshError, SnapshotError};
pub use identity::{normalize, IdentityError, IdentityId, IDENTITY_LEN};
pub use snapshot::{Snapshot, SnapshotEntry, SnapshotStore};
