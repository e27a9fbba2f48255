//! Distributed lock manager.
//!
//! # Acquisition
//!
//! [`LockManager::lock`] polls the catalog's atomic acquire-if-free write,
//! sleeping between attempts while another session holds the name. Only the
//! catalog's dedicated contention error is retried; any other failure is
//! returned to the caller at once, with a cleanup unlock queued for the
//! attempt's session in case the write landed anyway.
//!
//! # Release
//!
//! Locks are released through [`LockHandle`], an RAII object that calls
//! [`LockManager::unlock`] exactly once. Unlock never fails observably: a
//! release the catalog rejects is queued and retried by the liveness daemon.
//!
//! # Liveness daemon
//!
//! One background thread per manager pings the catalog every ping interval
//! and drains the deferred-unlock queue. The catalog is never called while the
//! manager's mutex is held.

mod daemon;
mod guard;
mod identity;
mod manager;
mod queue;
mod session;


// Re-export public API
pub use guard::LockHandle;
pub use identity::default_process_id;
pub use manager::{LockManager, WAIT_NOTICE_INTERVAL};
pub use queue::UnlockQueue;
pub use session::{LockSessionId, WaitPolicy};
