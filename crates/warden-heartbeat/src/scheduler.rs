//! The heartbeat task.
//!
//! One Tokio task per scheduler drives both the periodic heartbeat and
//! the failure retry from a single `select!` loop:
//!
//! ```text
//! loop {
//!     select! {
//!         shutdown  => exit
//!         retry     => beat, on failure re-arm retry(backoff.advance())
//!         interval  => beat, on failure arm retry(backoff.advance()) unless armed
//!     }
//! }
//! ```
//!
//! Because both timers live on one task, a scheduler never has two
//! heartbeats in flight. At most one retry is pending. A failing tick
//! arms it only when none is armed, so ticks never push an armed retry
//! further out; a success disarms it. A successful retry leaves the
//! periodic interval on its original cadence.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};
use warden_protocol::{ServerProfile, Session};
use warden_transport::Authority;

use crate::backoff::Backoff;
use crate::{
    HeartbeatConfig, HeartbeatError, HeartbeatMetrics, HeartbeatMonitor,
    HeartbeatState, PlayerCountSource,
};

/// The server profile, shared between the scheduler (writer) and the host
/// (readers).
pub type SharedProfile = Arc<RwLock<ServerProfile>>;

/// Reports liveness to the authority on a fixed period.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use parking_lot::RwLock;
/// use warden_heartbeat::{HeartbeatConfig, HeartbeatScheduler, PlayerCountSource};
/// # use warden_protocol::{ServerProfile, Session};
/// # use warden_transport::Authority;
///
/// # async fn run<A: Authority>(authority: Arc<A>, session: Session, profile: ServerProfile)
/// #     -> Result<(), warden_heartbeat::HeartbeatError> {
/// let scheduler = HeartbeatScheduler::new(
///     authority,
///     session,
///     Arc::new(RwLock::new(profile)),
///     PlayerCountSource::fixed(0),
///     HeartbeatConfig::default(),
/// );
/// scheduler.start(0).await?;
/// // ... server runs ...
/// scheduler.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct HeartbeatScheduler<A> {
    worker: Worker<A>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<A: Authority> HeartbeatScheduler<A> {
    pub fn new(
        authority: Arc<A>,
        session: Session,
        profile: SharedProfile,
        players: PlayerCountSource,
        config: HeartbeatConfig,
    ) -> Self {
        let config = config.validated();
        let (shutdown, _) = watch::channel(false);

        debug!(
            period = ?config.period,
            retry_base = ?config.retry_base,
            retry_max = ?config.retry_max,
            "heartbeat scheduler created"
        );

        Self {
            worker: Worker {
                monitor: Arc::new(HeartbeatMonitor::new(config.retry_base)),
                authority,
                session,
                profile,
                players,
                config,
            },
            shutdown,
            task: Mutex::new(None),
        }
    }

    /// Sends one heartbeat immediately, then starts the periodic task.
    ///
    /// The first periodic heartbeat fires one full period after the first heartbeat.
    ///
    /// # Errors
    /// - [`HeartbeatError::InitialFailed`] if the immediate heartbeat fails;
    ///   the scheduler is left `Stopped`
    /// - [`HeartbeatError::AlreadyStarted`] if called twice
    /// - [`HeartbeatError::Stopped`] if called after [`stop`](Self::stop)
    pub async fn start(
        &self,
        initial_player_count: u32,
    ) -> Result<(), HeartbeatError> {
        let monitor = &self.worker.monitor;
        monitor
            .transition(HeartbeatState::Idle, HeartbeatState::Probing)
            .map_err(|actual| match actual {
                HeartbeatState::Stopped => HeartbeatError::Stopped,
                _ => HeartbeatError::AlreadyStarted,
            })?;

        if let Err(e) = self.worker.send(initial_player_count).await {
            monitor.stop();
            return Err(HeartbeatError::InitialFailed(e));
        }
        monitor.record_success();

        // A concurrent stop() wins over the first heartbeat.
        monitor
            .transition(HeartbeatState::Probing, HeartbeatState::Steady)
            .map_err(|_| HeartbeatError::Stopped)?;

        let period = self.worker.config.period;
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let handle = tokio::spawn(
            self.worker
                .clone()
                .run(interval, self.shutdown.subscribe()),
        );
        *self.task.lock() = Some(handle);

        info!(
            players = initial_player_count,
            period = ?period,
            "heartbeat started"
        );
        Ok(())
    }

    /// Stops the periodic task.
    ///
    /// No new heartbeat starts after this is called. An in-flight one gets
    /// up to `stop_grace` to finish; after that the task is aborted.
    /// Idempotent.
    pub async fn stop(&self) {
        let previous = self.worker.monitor.stop();
        self.shutdown.send_replace(true);

        let handle = self.task.lock().take();
        let Some(mut handle) = handle else {
            if previous != HeartbeatState::Stopped {
                debug!(%previous, "heartbeat scheduler stopped before start");
            }
            return;
        };

        if time::timeout(self.worker.config.stop_grace, &mut handle)
            .await
            .is_err()
        {
            warn!(
                grace = ?self.worker.config.stop_grace,
                "heartbeat still in flight after grace period, aborting"
            );
            handle.abort();
        }
        info!("heartbeat stopped");
    }

    pub fn state(&self) -> HeartbeatState {
        self.worker.monitor.state()
    }

    pub fn metrics(&self) -> HeartbeatMetrics {
        self.worker.monitor.metrics()
    }

    /// The shared monitor, for hosts that want to poll state without
    /// holding the scheduler.
    pub fn monitor(&self) -> Arc<HeartbeatMonitor> {
        Arc::clone(&self.worker.monitor)
    }

    pub fn profile(&self) -> &SharedProfile {
        &self.worker.profile
    }

    pub fn players(&self) -> &PlayerCountSource {
        &self.worker.players
    }
}

// ---------------------------------------------------------------------------
// Worker (runs inside the spawned task)
// ---------------------------------------------------------------------------

struct Worker<A> {
    authority: Arc<A>,
    session: Session,
    profile: SharedProfile,
    players: PlayerCountSource,
    monitor: Arc<HeartbeatMonitor>,
    config: HeartbeatConfig,
}

impl<A> Clone for Worker<A> {
    fn clone(&self) -> Self {
        Self {
            authority: Arc::clone(&self.authority),
            session: self.session.clone(),
            profile: Arc::clone(&self.profile),
            players: self.players.clone(),
            monitor: Arc::clone(&self.monitor),
            config: self.config.clone(),
        }
    }
}

impl<A: Authority> Worker<A> {
    async fn run(
        self,
        mut interval: Interval,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut backoff =
            Backoff::new(self.config.retry_base, self.config.retry_max);
        let retry = time::sleep(self.config.retry_base);
        tokio::pin!(retry);
        let mut retry_armed = false;

        // stop() may have fired between subscribe and spawn.
        if *shutdown.borrow_and_update() {
            return;
        }

        loop {
            let ok = tokio::select! {
                biased;

                _ = shutdown.changed() => break,

                // A retry due at the same instant as a tick runs first.
                () = &mut retry, if retry_armed => {
                    retry_armed = false;
                    self.beat("retry").await
                }

                _ = interval.tick() => self.beat("tick").await,
            };

            if ok {
                backoff.reset();
                retry_armed = false;
            } else if !retry_armed {
                // An armed retry is never postponed by a failing tick.
                let delay = backoff.advance();
                retry.as_mut().reset(Instant::now() + delay);
                retry_armed = true;
                debug!(delay = ?delay, "heartbeat retry scheduled");
            }
            self.monitor.set_retry_delay(backoff.current());
        }

        trace!("heartbeat task exiting");
    }

    /// One heartbeat with the current player count. Feeds the monitor.
    async fn beat(&self, attempt: &'static str) -> bool {
        let count = self.players.current();
        match self.send(count).await {
            Ok(()) => {
                self.monitor.record_success();
                trace!(attempt, players = count, "heartbeat sent");
                true
            }
            Err(e) => {
                debug!(attempt, error = %e, "heartbeat failed");
                self.monitor.record_failure(&e.to_string());
                false
            }
        }
    }

    /// Sends a heartbeat and, on success, stamps the profile.
    async fn send(
        &self,
        player_count: u32,
    ) -> Result<(), warden_transport::TransportError> {
        self.authority
            .heartbeat(&self.session, player_count)
            .await?;
        self.profile
            .write()
            .record_heartbeat(player_count, Utc::now());
        Ok(())
    }
}
