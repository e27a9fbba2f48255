//! Distlock: a distributed mutual-exclusion manager.
//!
//! Processes that share a lock catalog coordinate exclusive access to named
//! resources through a [`LockManager`]. A successful acquisition yields a
//! [`LockHandle`] whose release (explicit or on drop) returns the lock.
//!
//! ```no_run
//! use distlock::catalog::FileCatalog;
//! use distlock::locks::{LockManager, WaitPolicy};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let catalog = Arc::new(FileCatalog::open("/var/lib/distlock")?);
//! let manager = LockManager::new("node-1", catalog, Duration::from_secs(30));
//! manager.start()?;
//!
//! let handle = manager.lock(
//!     "nightly-backup",
//!     "backup window",
//!     WaitPolicy::Timeout(Duration::from_secs(5)),
//!     Duration::from_millis(500),
//! )?;
//! // ... exclusive work ...
//! handle.release();
//!
//! manager.stop();
//! # Ok::<(), distlock::error::DistLockError>(())
//! ```

pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod locks;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{DistLockError, Result};
pub use locks::{LockHandle, LockManager, LockSessionId, WaitPolicy};
