//! The lock catalog: the durable store the lock manager writes through.
//!
//! The manager only needs five operations from a catalog, captured by the
//! [`LockCatalog`] trait. Two implementations ship with the crate:
//! - [`InMemoryCatalog`]: a process-local catalog with the same atomic
//!   acquire-if-free semantics, for embedding and tests
//! - [`FileCatalog`]: a directory of JSON records shared by every process that
//!   can see the directory
//!
//! # Contract
//!
//! - `grab_lock` must be atomic: it writes the record only if the name is not
//!   currently held, and reports an existing holder with
//!   [`DistLockError::LockStateChangeFailed`](crate::error::DistLockError::LockStateChangeFailed).
//!   Every other error is treated by the manager as an ambiguous outcome.
//! - `unlock` of a session that is unknown or already released succeeds, and
//!   never disturbs a record written by another session.
//! - `get_lock_by_session` reports a missing record with
//!   [`DistLockError::LockNotFound`](crate::error::DistLockError::LockNotFound).

mod file;
mod memory;
mod types;


// Re-export public API
pub use file::{FileCatalog, LockEntry};
pub use memory::InMemoryCatalog;
pub use types::{LockRecord, LockRequest, LockState, PingRecord};

use crate::error::Result;
use crate::locks::LockSessionId;
use chrono::{DateTime, Utc};

/// Durable lock and liveness store consumed by the lock manager.
///
/// Implementations are shared between caller threads and the liveness daemon,
/// so every method takes `&self`.
pub trait LockCatalog: Send + Sync {
    /// Write the lock record if, and only if, the name is currently unheld.
    fn grab_lock(&self, request: &LockRequest<'_>) -> Result<LockRecord>;

    /// Release the acquisition identified by `session_id`.
    fn unlock(&self, session_id: &LockSessionId) -> Result<()>;

    /// Upsert the liveness record for `process_id`.
    fn ping(&self, process_id: &str, time: DateTime<Utc>) -> Result<()>;

    /// Look up the lock record written by `session_id`.
    fn get_lock_by_session(&self, session_id: &LockSessionId) -> Result<LockRecord>;

    /// Remove the liveness record for `process_id`.
    fn stop_ping(&self, process_id: &str) -> Result<()>;
}
