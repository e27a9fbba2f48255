//! Shared fixtures for unit tests.

use crate::catalog::{InMemoryCatalog, LockCatalog, LockRecord, LockRequest};
use crate::error::{DistLockError, Result};
use crate::locks::LockSessionId;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Error a [`RecordingCatalog`] should fail the next matching call with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fault {
    /// The catalog's "held by another session" signal.
    Contention,
    /// A transient failure with an unknown write outcome.
    Network,
    /// The request was refused before anything was written.
    Rejected,
}

impl Fault {
    fn to_error(self, op: &str) -> DistLockError {
        match self {
            Fault::Contention => {
                DistLockError::LockStateChangeFailed(format!("{}: injected contention", op))
            }
            Fault::Network => DistLockError::Catalog(format!("{}: injected network error", op)),
            Fault::Rejected => {
                DistLockError::InvalidArgument(format!("{}: injected rejection", op))
            }
        }
    }
}

/// In-memory catalog that counts calls and fails on request.
#[derive(Debug, Default)]
pub(crate) struct RecordingCatalog {
    store: InMemoryCatalog,
    pub(crate) grab_calls: AtomicUsize,
    pub(crate) unlock_calls: AtomicUsize,
    pub(crate) ping_calls: AtomicUsize,
    pub(crate) stop_ping_calls: AtomicUsize,
    grab_fault: Mutex<Option<Fault>>,
    unlock_failures: AtomicUsize,
    ping_failures: AtomicUsize,
    latency: Mutex<Duration>,
    grabbed_sessions: Mutex<Vec<LockSessionId>>,
    unlocked_sessions: Mutex<Vec<LockSessionId>>,
}

impl RecordingCatalog {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn store(&self) -> &InMemoryCatalog {
        &self.store
    }

    /// Fail every `grab_lock` with `fault` until cleared with `None`.
    pub(crate) fn set_grab_fault(&self, fault: Option<Fault>) {
        *self.grab_fault.lock().unwrap() = fault;
    }

    /// Fail the next `count` unlock calls.
    pub(crate) fn fail_unlocks(&self, count: usize) {
        self.unlock_failures.store(count, Ordering::SeqCst);
    }

    /// Fail the next `count` ping calls.
    pub(crate) fn fail_pings(&self, count: usize) {
        self.ping_failures.store(count, Ordering::SeqCst);
    }

    /// Delay every catalog call by `latency`.
    pub(crate) fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub(crate) fn grabs(&self) -> usize {
        self.grab_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn unlocks(&self) -> usize {
        self.unlock_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn pings(&self) -> usize {
        self.ping_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn stop_pings(&self) -> usize {
        self.stop_ping_calls.load(Ordering::SeqCst)
    }

    /// Session ids passed to `grab_lock`, in call order.
    pub(crate) fn grabbed_sessions(&self) -> Vec<LockSessionId> {
        self.grabbed_sessions.lock().unwrap().clone()
    }

    /// Session ids passed to `unlock`, in call order (failed calls included).
    pub(crate) fn unlocked_sessions(&self) -> Vec<LockSessionId> {
        self.unlocked_sessions.lock().unwrap().clone()
    }

    fn delay(&self) {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            thread::sleep(latency);
        }
    }
}

/// Decrement `counter` if positive; true when a failure should be injected.
fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl LockCatalog for RecordingCatalog {
    fn grab_lock(&self, request: &LockRequest<'_>) -> Result<LockRecord> {
        self.grab_calls.fetch_add(1, Ordering::SeqCst);
        self.grabbed_sessions
            .lock()
            .unwrap()
            .push(*request.session_id);
        self.delay();

        if let Some(fault) = *self.grab_fault.lock().unwrap() {
            return Err(fault.to_error("grab_lock"));
        }
        self.store.grab_lock(request)
    }

    fn unlock(&self, session_id: &LockSessionId) -> Result<()> {
        self.unlock_calls.fetch_add(1, Ordering::SeqCst);
        self.unlocked_sessions.lock().unwrap().push(*session_id);
        self.delay();

        if take_failure(&self.unlock_failures) {
            return Err(Fault::Network.to_error("unlock"));
        }
        self.store.unlock(session_id)
    }

    fn ping(&self, process_id: &str, time: DateTime<Utc>) -> Result<()> {
        self.ping_calls.fetch_add(1, Ordering::SeqCst);
        self.delay();

        if take_failure(&self.ping_failures) {
            return Err(Fault::Network.to_error("ping"));
        }
        self.store.ping(process_id, time)
    }

    fn get_lock_by_session(&self, session_id: &LockSessionId) -> Result<LockRecord> {
        self.delay();
        self.store.get_lock_by_session(session_id)
    }

    fn stop_ping(&self, process_id: &str) -> Result<()> {
        self.stop_ping_calls.fetch_add(1, Ordering::SeqCst);
        self.delay();
        self.store.stop_ping(process_id)
    }
}

/// Poll `condition` every few milliseconds until it holds or `timeout` passes.
pub(crate) fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
