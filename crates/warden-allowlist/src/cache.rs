//! The allow-list cache.
//!
//! Readers ([`AllowlistCache::is_allowed`]) take a shared `RwLock` read.
//! Every replacement of the set (periodic refresh, manual refresh, manual
//! reload) goes through one writer mutex, so two replacements never
//! interleave their snapshot write and swap. The network call happens
//! before the writer mutex is taken:
//!
//! ```text
//! fetch + parse (no lock) → writer lock → persist snapshot → swap set → unlock
//! ```
//!
//! Readers always see a complete set, old or new.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};
use warden_protocol::Session;
use warden_transport::Authority;

use crate::{
    normalize, AllowlistConfig, IdentityId, LoadError, RefreshError,
    Snapshot, SnapshotStore, IDENTITY_LEN,
};

// ---------------------------------------------------------------------------
// AllowedSet
// ---------------------------------------------------------------------------

/// Where the current set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetSource {
    /// Nothing loaded yet. Denies everyone on a restricted server.
    Empty,
    /// The last successful remote refresh.
    Remote,
    /// The persisted snapshot.
    Snapshot,
}

impl std::fmt::Display for SetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::Remote => write!(f, "remote"),
            Self::Snapshot => write!(f, "snapshot"),
        }
    }
}

/// An immutable set of normalized identities plus its provenance.
#[derive(Debug, Clone)]
pub struct AllowedSet {
    ids: HashSet<IdentityId>,
    source: SetSource,
    loaded_at: DateTime<Utc>,
}

impl AllowedSet {
    fn empty() -> Self {
        Self {
            ids: HashSet::new(),
            source: SetSource::Empty,
            loaded_at: Utc::now(),
        }
    }

    fn new(ids: HashSet<IdentityId>, source: SetSource) -> Self {
        Self {
            ids,
            source,
            loaded_at: Utc::now(),
        }
    }

    /// `normalized` must already be normalized.
    pub fn contains(&self, normalized: &str) -> bool {
        self.ids.contains(normalized)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Point-in-time view of the cache, for status output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowlistStatus {
    pub restricted: bool,
    pub size: usize,
    pub source: SetSource,
    pub loaded_at: DateTime<Utc>,
    pub refreshing: bool,
}

// ---------------------------------------------------------------------------
// AllowlistCache
// ---------------------------------------------------------------------------

/// Membership predicate for a restricted server, kept fresh from the
/// authority and backed by a local snapshot.
///
/// The restricted flag is fixed at construction. On an unrestricted
/// server every query is allowed, nothing is fetched and `start` is a
/// no-op.
pub struct AllowlistCache<A> {
    inner: Arc<Inner<A>>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct Inner<A> {
    authority: Arc<A>,
    session: Session,
    restricted: bool,
    config: AllowlistConfig,
    store: SnapshotStore,
    allowed: RwLock<AllowedSet>,
    /// Serializes set replacement.
    writer: Mutex<()>,
}

impl<A: Authority> AllowlistCache<A> {
    pub fn new(
        authority: Arc<A>,
        session: Session,
        restricted: bool,
        config: AllowlistConfig,
    ) -> Self {
        let config = config.validated();
        let (shutdown, _) = watch::channel(false);

        debug!(
            restricted,
            snapshot = %config.snapshot_path.display(),
            interval = ?config.refresh_interval,
            "allow-list cache created"
        );

        Self {
            inner: Arc::new(Inner {
                authority,
                session,
                restricted,
                store: SnapshotStore::new(config.snapshot_path.clone()),
                config,
                allowed: RwLock::new(AllowedSet::empty()),
                writer: Mutex::new(()),
            }),
            shutdown,
            task: Mutex::new(None),
        }
    }

    /// Whether `identity` may join.
    ///
    /// Always `true` when unrestricted. Otherwise the query is normalized
    /// and tested against the current set; a malformed query is simply
    /// not a member.
    pub fn is_allowed(&self, identity: &str) -> bool {
        if !self.inner.restricted {
            return true;
        }
        let normalized = normalize(identity);
        let allowed = self.inner.allowed.read().contains(&normalized);
        trace!(identity, allowed, "allow-list check");
        allowed
    }

    /// Fetches the allow-list from the authority and replaces the set.
    ///
    /// Returns the number of identities now allowed.
    ///
    /// # Errors
    /// - [`RefreshError::Unrestricted`] on an unrestricted server
    /// - [`RefreshError::Transport`] if the fetch fails
    /// - [`RefreshError::EmptyAllowlist`] if the reply has no identities
    ///   and `accept_empty` is off
    ///
    /// On any error the set and the snapshot are unchanged.
    pub async fn refresh(&self) -> Result<usize, RefreshError> {
        self.inner.refresh().await
    }

    /// Replaces the set with the unexpired, well-formed entries of the
    /// persisted snapshot. Never touches the network.
    pub fn reload_from_persisted(&self) -> Result<usize, LoadError> {
        self.inner.reload_from_persisted()
    }

    /// Loads the snapshot, then refreshes immediately and every
    /// `refresh_interval` until [`stop`](Self::stop).
    ///
    /// No-op when unrestricted, already started, or stopped. A snapshot
    /// load failure is logged and the cache starts empty (deny all) until
    /// the first successful refresh.
    pub fn start(&self) {
        if !self.inner.restricted {
            debug!("unrestricted server, allow-list cache idle");
            return;
        }
        if *self.shutdown.borrow() {
            warn!("allow-list cache already stopped, not restarting");
            return;
        }

        let mut task = self.task.lock();
        if task.is_some() {
            warn!("allow-list refresh already running");
            return;
        }

        if let Err(e) = self.inner.reload_from_persisted() {
            error!(error = %e, "could not load allow-list snapshot, starting empty");
        }

        let inner = Arc::clone(&self.inner);
        *task = Some(tokio::spawn(refresh_loop(
            inner,
            self.shutdown.subscribe(),
        )));
        info!(
            interval = ?self.inner.config.refresh_interval,
            "allow-list refresh started"
        );
    }

    /// Stops the periodic refresh. An in-flight refresh gets up to
    /// `stop_grace` to finish before the task is aborted. A snapshot write
    /// is never cut short: it runs synchronously inside the writer lock.
    /// Idempotent.
    pub async fn stop(&self) {
        self.shutdown.send_replace(true);

        let handle = self.task.lock().take();
        let Some(mut handle) = handle else {
            return;
        };

        let grace = self.inner.config.stop_grace;
        if time::timeout(grace, &mut handle).await.is_err() {
            warn!(?grace, "allow-list refresh still in flight, aborting");
            handle.abort();
        }
        info!("allow-list refresh stopped");
    }

    pub fn is_restricted(&self) -> bool {
        self.inner.restricted
    }

    pub fn len(&self) -> usize {
        self.inner.allowed.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn status(&self) -> AllowlistStatus {
        let allowed = self.inner.allowed.read();
        AllowlistStatus {
            restricted: self.inner.restricted,
            size: allowed.len(),
            source: allowed.source,
            loaded_at: allowed.loaded_at,
            refreshing: self.task.lock().is_some() && !*self.shutdown.borrow(),
        }
    }

    pub fn snapshot_store(&self) -> &SnapshotStore {
        &self.inner.store
    }
}

impl<A: Authority> Inner<A> {
    async fn refresh(&self) -> Result<usize, RefreshError> {
        if !self.restricted {
            return Err(RefreshError::Unrestricted);
        }

        let reply = self.authority.fetch_allowlist(&self.session).await?;
        let received = reply.allowed_users.len();

        // Reply order is kept for the snapshot; duplicates collapse.
        let mut ids = HashSet::with_capacity(received);
        let mut ordered = Vec::with_capacity(received);
        for raw in &reply.allowed_users {
            let id = IdentityId::normalized(raw);
            if id.as_str().chars().count() != IDENTITY_LEN {
                debug!(identity = %id, "allow-list entry is not a 32-character id");
            }
            if ids.insert(id.clone()) {
                ordered.push(id);
            }
        }

        if ids.is_empty() && !self.config.accept_empty {
            return Err(RefreshError::EmptyAllowlist { received });
        }

        let total = ids.len();
        {
            let _writer = self.writer.lock();
            // Blocking file write on the runtime thread. It is a small
            // file and must finish before the swap, under the lock.
            if let Err(e) = self.store.save(&Snapshot::from_ids(&ordered)) {
                error!(
                    error = %e,
                    "failed to persist allow-list snapshot, applying the fetched set anyway"
                );
            }
            *self.allowed.write() = AllowedSet::new(ids, SetSource::Remote);
        }

        info!(total, received, "allow-list refreshed");
        Ok(total)
    }

    fn reload_from_persisted(&self) -> Result<usize, LoadError> {
        let _writer = self.writer.lock();

        let snapshot = self.store.load()?;
        let now = Utc::now();
        let mut ids = HashSet::with_capacity(snapshot.identities.len());
        let mut expired = 0usize;

        for entry in &snapshot.identities {
            let id = match IdentityId::parse(&entry.identity) {
                Ok(id) => id,
                Err(e) => {
                    warn!(error = %e, "skipping malformed snapshot entry");
                    continue;
                }
            };
            if entry.is_expired(now) {
                expired += 1;
                continue;
            }
            ids.insert(id);
        }

        let total = ids.len();
        *self.allowed.write() = AllowedSet::new(ids, SetSource::Snapshot);

        info!(
            total,
            expired,
            path = %self.store.path().display(),
            "allow-list loaded from snapshot"
        );
        Ok(total)
    }
}

async fn refresh_loop<A: Authority>(
    inner: Arc<Inner<A>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = time::interval(inner.config.refresh_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    if *shutdown.borrow_and_update() {
        return;
    }

    loop {
        tokio::select! {
            biased;

            _ = shutdown.changed() => break,

            _ = interval.tick() => {
                if let Err(e) = inner.refresh().await {
                    warn!(error = %e, "periodic allow-list refresh failed");
                }
            }
        }
    }

    trace!("allow-list refresh task exiting");
}
