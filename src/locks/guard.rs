//! RAII handle for an acquired distributed lock.

use super::manager::LockManager;
use super::session::LockSessionId;
use crate::error::Result;

/// Ownership of one successful acquisition.
///
/// When dropped, the lock is released through [`LockManager::unlock`].
/// Release happens exactly once: [`release`](Self::release) consumes the
/// handle, and a released handle does nothing on drop. The handle can be moved
/// but not cloned.
#[derive(Debug)]
#[must_use = "dropping a LockHandle releases the lock immediately"]
pub struct LockHandle {
    manager: LockManager,
    session_id: LockSessionId,
    released: bool,
}

impl LockHandle {
    pub(super) fn new(manager: LockManager, session_id: LockSessionId) -> Self {
        Self {
            manager,
            session_id,
            released: false,
        }
    }

    /// The session id (fencing token) of this acquisition.
    pub fn session_id(&self) -> LockSessionId {
        self.session_id
    }

    /// Confirm the catalog still records this handle as the holder.
    pub fn check_status(&self) -> Result<()> {
        self.manager.check_status(&self.session_id)
    }

    /// Release the lock now rather than at end of scope.
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.manager.unlock(&self.session_id);
        }
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        self.release_once();
    }
}
