//! Liveness daemon: periodic pings plus deferred unlock retries.

use super::manager::ManagerInner;
use super::session::LockSessionId;
use chrono::Utc;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Body of the daemon thread. Returns once shutdown is requested.
pub(super) fn run(inner: &ManagerInner) {
    debug!(
        process_id = %inner.process_id,
        interval_ms = inner.ping_interval.as_millis() as u64,
        "liveness daemon started"
    );

    while !inner.is_shutting_down() {
        if let Err(e) = inner.catalog.ping(&inner.process_id, Utc::now()) {
            warn!(process_id = %inner.process_id, error = %e, "failed to ping lock catalog");
        }

        let batch = inner.state().unlock_queue.take_all();
        if !drain_unlock_batch(inner, batch) {
            break;
        }

        let state = inner.state();
        let _ = inner
            .wakeup
            .wait_timeout_while(state, inner.ping_interval, |state| !state.shutting_down)
            .unwrap_or_else(|poison| poison.into_inner());
    }

    debug!(process_id = %inner.process_id, "liveness daemon stopped");
}

/// Retry each queued unlock, requeueing failures.
///
/// Returns `false` if shutdown interrupted the batch; the rest is dropped.
fn drain_unlock_batch(inner: &ManagerInner, batch: VecDeque<LockSessionId>) -> bool {
    let total = batch.len();

    for (index, session_id) in batch.into_iter().enumerate() {
        if let Err(e) = inner.catalog.unlock(&session_id) {
            warn!(session = %session_id, error = %e, "failed to unlock lock session");
            inner.queue_unlock(session_id);
        }

        if inner.is_shutting_down() {
            let abandoned = total - index - 1;
            if abandoned > 0 {
                debug!(abandoned, "shutdown requested, abandoning deferred unlocks");
            }
            return false;
        }
    }

    true
}
