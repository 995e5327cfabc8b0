//! Where the heartbeat gets its player count from.
//!
//! The host owns the real number. It hands the scheduler either a closure
//! or an [`AtomicPlayerCount`] it bumps on join/leave. The count is read
//! once per heartbeat, at send time.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// A closure returning the current player count.
pub type PlayerCountProvider = Arc<dyn Fn() -> u32 + Send + Sync>;

/// A cloneable handle to a replaceable player-count provider.
///
/// Clones share the provider, so a [`replace`](Self::replace) on one is
/// seen by the scheduler holding another.
#[derive(Clone)]
pub struct PlayerCountSource {
    provider: Arc<RwLock<PlayerCountProvider>>,
}

impl PlayerCountSource {
    pub fn new(provider: impl Fn() -> u32 + Send + Sync + 'static) -> Self {
        Self {
            provider: Arc::new(RwLock::new(Arc::new(provider))),
        }
    }

    /// A source that always reports `count`.
    pub fn fixed(count: u32) -> Self {
        Self::new(move || count)
    }

    /// A source backed by a shared counter.
    pub fn counter(counter: AtomicPlayerCount) -> Self {
        Self::new(move || counter.get())
    }

    /// Swaps the provider for every clone of this handle.
    pub fn replace(&self, provider: impl Fn() -> u32 + Send + Sync + 'static) {
        *self.provider.write() = Arc::new(provider);
    }

    /// Reads the current count.
    pub fn current(&self) -> u32 {
        // Clone out so a slow provider never blocks `replace`.
        let provider = Arc::clone(&self.provider.read());
        provider()
    }
}

impl Default for PlayerCountSource {
    fn default() -> Self {
        Self::fixed(0)
    }
}

impl fmt::Debug for PlayerCountSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerCountSource")
            .field("current", &self.current())
            .finish()
    }
}

/// A shared player counter the host updates on join and leave.
#[derive(Debug, Clone, Default)]
pub struct AtomicPlayerCount(Arc<AtomicU32>);

impl AtomicPlayerCount {
    pub fn new(initial: u32) -> Self {
        Self(Arc::new(AtomicU32::new(initial)))
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, count: u32) {
        self.0.store(count, Ordering::Relaxed);
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Saturates at zero.
    pub fn decrement(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                n.checked_sub(1)
            });
    }
}
