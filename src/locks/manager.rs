//! The lock manager: acquisition, release, status checks, and lifecycle.

use super::daemon;
use super::guard::LockHandle;
use super::identity::owner_string;
use super::queue::UnlockQueue;
use super::session::{LockSessionId, WaitPolicy};
use crate::catalog::{LockCatalog, LockRequest};
use crate::config::Config;
use crate::error::{DistLockError, Result};
use chrono::Utc;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How often a contended `lock()` call reports how long it has been waiting.
pub const WAIT_NOTICE_INTERVAL: Duration = Duration::from_secs(10);

/// Everything shared between caller threads and the liveness daemon.
/// Guarded by the single mutex in [`ManagerInner::state`].
#[derive(Debug, Default)]
pub(super) struct SharedState {
    pub(super) shutting_down: bool,
    pub(super) unlock_queue: UnlockQueue,
    worker: Option<JoinHandle<()>>,
}

pub(super) struct ManagerInner {
    pub(super) process_id: String,
    pub(super) catalog: Arc<dyn LockCatalog>,
    pub(super) ping_interval: Duration,
    state: Mutex<SharedState>,
    pub(super) wakeup: Condvar,
}

impl ManagerInner {
    pub(super) fn state(&self) -> MutexGuard<'_, SharedState> {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    pub(super) fn is_shutting_down(&self) -> bool {
        self.state().shutting_down
    }

    pub(super) fn queue_unlock(&self, session_id: LockSessionId) {
        self.state().unlock_queue.push(session_id);
    }
}

/// Distributed lock manager for one process.
///
/// Cloning is cheap and every clone drives the same manager; [`LockHandle`]
/// keeps one as its way back to [`LockManager::unlock`].
///
/// # Lifecycle
///
/// [`start`](Self::start) spawns the liveness daemon, which pings the catalog
/// every `ping_interval` and retries releases that failed. [`stop`](Self::stop)
/// shuts the daemon down, joins it, and removes this process's ping record.
/// The daemon keeps the manager alive, so a started manager must be stopped.
#[derive(Clone)]
pub struct LockManager {
    inner: Arc<ManagerInner>,
}

impl LockManager {
    pub fn new(
        process_id: impl Into<String>,
        catalog: Arc<dyn LockCatalog>,
        ping_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                process_id: process_id.into(),
                catalog,
                ping_interval,
                state: Mutex::new(SharedState::default()),
                wakeup: Condvar::new(),
            }),
        }
    }

    pub fn from_config(config: &Config, catalog: Arc<dyn LockCatalog>) -> Self {
        Self::new(
            config.resolved_process_id(),
            catalog,
            config.ping_interval(),
        )
    }

    pub fn process_id(&self) -> &str {
        &self.inner.process_id
    }

    pub fn ping_interval(&self) -> Duration {
        self.inner.ping_interval
    }

    /// Spawn the liveness daemon.
    ///
    /// Fails if the daemon is already running or the manager was stopped.
    pub fn start(&self) -> Result<()> {
        let mut state = self.inner.state();

        if state.shutting_down {
            return Err(DistLockError::Lifecycle(
                "lock manager has already been shut down".to_string(),
            ));
        }
        if state.worker.is_some() {
            return Err(DistLockError::Lifecycle(
                "lock manager is already started".to_string(),
            ));
        }

        let inner = Arc::clone(&self.inner);
        let worker = thread::Builder::new()
            .name("distlock-pinger".to_string())
            .spawn(move || daemon::run(&inner))
            .map_err(|e| {
                DistLockError::Lifecycle(format!("failed to spawn liveness daemon: {}", e))
            })?;

        state.worker = Some(worker);
        Ok(())
    }

    /// Stop the liveness daemon and deregister this process's ping record.
    ///
    /// Joins the daemon before returning. Only the first call does anything.
    pub fn stop(&self) {
        let worker = {
            let mut state = self.inner.state();
            if state.shutting_down {
                return;
            }
            state.shutting_down = true;
            self.inner.wakeup.notify_all();
            state.worker.take()
        };

        // The mutex must not be held here: the daemon needs it to observe shutdown.
        if let Some(worker) = worker
            && worker.join().is_err()
        {
            warn!(process_id = %self.inner.process_id, "liveness daemon panicked");
        }

        if let Err(e) = self.inner.catalog.stop_ping(&self.inner.process_id) {
            warn!(
                process_id = %self.inner.process_id,
                error = %e,
                "error encountered while cleaning up distributed ping entry"
            );
        }
    }

    /// Whether the daemon has been started and not yet stopped.
    pub fn is_running(&self) -> bool {
        let state = self.inner.state();
        state.worker.is_some() && !state.shutting_down
    }

    /// Acquire the lock `name`, retrying while another session holds it.
    ///
    /// Every attempt writes under a freshly generated session id. Contention
    /// is retried every `retry_interval` (clamped to the time remaining) until
    /// `wait` runs out, after which [`DistLockError::LockBusy`] is returned.
    /// Any other catalog error is returned immediately, and the attempt's
    /// session id is queued for a deferred unlock in case the write landed.
    ///
    /// # Returns
    ///
    /// * `Ok(LockHandle)` - The lock is held until the handle is released
    /// * `Err(DistLockError::LockBusy)` - Still held elsewhere when `wait` ran out
    /// * `Err(DistLockError::Catalog)` - Ambiguous failure; a cleanup unlock is queued
    /// * `Err(_)` - The catalog rejected the request; the caller does not hold the lock
    pub fn lock(
        &self,
        name: &str,
        reason: &str,
        wait: impl Into<WaitPolicy>,
        retry_interval: Duration,
    ) -> Result<LockHandle> {
        if name.is_empty() {
            return Err(DistLockError::InvalidArgument(
                "lock name must not be empty".to_string(),
            ));
        }

        let wait = wait.into();
        let started = Instant::now();
        let mut last_notice = Instant::now();
        let who = owner_string(&self.inner.process_id);

        loop {
            let session_id = LockSessionId::generate();
            let request = LockRequest {
                name,
                session_id: &session_id,
                who: &who,
                process_id: &self.inner.process_id,
                time: Utc::now(),
                reason,
            };

            match self.inner.catalog.grab_lock(&request) {
                Ok(_) => {
                    debug!(lock = name, session = %session_id, "acquired distributed lock");
                    return Ok(LockHandle::new(self.clone(), session_id));
                }
                Err(e) if e.is_contention() => {}
                Err(e @ DistLockError::Catalog(_)) => {
                    // The write may have been applied despite the error.
                    warn!(
                        lock = name,
                        session = %session_id,
                        error = %e,
                        "lock acquisition failed, scheduling cleanup unlock"
                    );
                    self.inner.queue_unlock(session_id);
                    return Err(e);
                }
                // Rejected before anything was written.
                Err(e) => return Err(e),
            }

            // TODO: take over locks whose holder has stopped pinging, once the
            // catalog exposes lease expiry.

            let pause = match wait {
                WaitPolicy::TryOnce => break,
                WaitPolicy::Forever => retry_interval,
                WaitPolicy::Timeout(max) => {
                    retry_interval.min(max.saturating_sub(started.elapsed()))
                }
            };

            if last_notice.elapsed() > WAIT_NOTICE_INTERVAL {
                info!(
                    lock = name,
                    reason,
                    waited_secs = started.elapsed().as_secs(),
                    "still waiting for distributed lock"
                );
                last_notice = Instant::now();
            }

            thread::sleep(pause);

            if let WaitPolicy::Timeout(max) = wait
                && started.elapsed() >= max
            {
                break;
            }
        }

        Err(DistLockError::LockBusy(format!("timed out waiting for {}", name)))
    }

    /// Release the acquisition identified by `session_id`.
    ///
    /// Never fails: if the catalog call errors, the session is queued and the
    /// liveness daemon retries it on its next cycle.
    pub fn unlock(&self, session_id: &LockSessionId) {
        if let Err(e) = self.inner.catalog.unlock(session_id) {
            debug!(session = %session_id, error = %e, "unlock failed, deferring to liveness daemon");
            self.inner.queue_unlock(*session_id);
        }
    }

    /// Confirm `session_id` is still the catalog's current holder of its lock.
    ///
    /// Point-in-time only; the answer may change right after the call.
    pub fn check_status(&self, session_id: &LockSessionId) -> Result<()> {
        let record = self.inner.catalog.get_lock_by_session(session_id)?;

        if !record.is_held_by(session_id) {
            return Err(DistLockError::LockNotFound("lock owner changed".to_string()));
        }

        Ok(())
    }

    /// Number of sessions waiting for a deferred unlock.
    pub fn pending_unlocks(&self) -> usize {
        self.inner.state().unlock_queue.len()
    }
}

impl fmt::Debug for LockManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockManager")
            .field("process_id", &self.inner.process_id)
            .field("ping_interval", &self.inner.ping_interval)
            .finish_non_exhaustive()
    }
}
