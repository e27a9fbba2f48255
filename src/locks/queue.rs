//! Buffer of session ids whose release must be retried.

use super::session::LockSessionId;
use std::collections::VecDeque;

/// At-least-once buffer of sessions waiting for a deferred unlock.
///
/// Not synchronized on its own: it lives inside the manager's shared state and
/// is only touched while that mutex is held. The daemon takes the whole
/// contents in one swap and works through the batch without the mutex.
#[derive(Debug, Default)]
pub struct UnlockQueue {
    pending: VecDeque<LockSessionId>,
}

impl UnlockQueue {
    pub fn push(&mut self, session_id: LockSessionId) {
        self.pending.push_back(session_id);
    }

    /// Swap out everything queued so far, leaving the queue empty.
    pub fn take_all(&mut self) -> VecDeque<LockSessionId> {
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
