//! Process-local catalog with atomic acquire-if-free semantics.

use super::LockCatalog;
use super::types::{LockRecord, LockRequest, PingRecord};
use crate::error::{DistLockError, Result};
use crate::locks::LockSessionId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Tables {
    locks: HashMap<String, LockRecord>,
    pings: HashMap<String, PingRecord>,
}

/// A [`LockCatalog`] held entirely in memory.
///
/// All tables sit behind one mutex, so `grab_lock` is a single atomic
/// check-and-insert. Useful for embedding several managers in one process and
/// as the backing store for tests.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    tables: Mutex<Tables>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current record for `name`, if held.
    pub fn lock_record(&self, name: &str) -> Option<LockRecord> {
        self.tables().locks.get(name).cloned()
    }

    /// Snapshot of the liveness record for `process_id`.
    pub fn ping_record(&self, process_id: &str) -> Option<PingRecord> {
        self.tables().pings.get(process_id).cloned()
    }

    /// Number of names currently held.
    pub fn held_count(&self) -> usize {
        self.tables().locks.len()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl LockCatalog for InMemoryCatalog {
    fn grab_lock(&self, request: &LockRequest<'_>) -> Result<LockRecord> {
        let mut tables = self.tables();

        if let Some(holder) = tables.locks.get(request.name) {
            return Err(DistLockError::LockStateChangeFailed(format!(
                "'{}' is held by {} since {}",
                request.name, holder.who, holder.acquired_at
            )));
        }

        let record = LockRecord::locked(request);
        tables
            .locks
            .insert(request.name.to_string(), record.clone());
        Ok(record)
    }

    fn unlock(&self, session_id: &LockSessionId) -> Result<()> {
        self.tables()
            .locks
            .retain(|_, record| record.session_id != *session_id);
        Ok(())
    }

    fn ping(&self, process_id: &str, time: DateTime<Utc>) -> Result<()> {
        self.tables().pings.insert(
            process_id.to_string(),
            PingRecord {
                process_id: process_id.to_string(),
                pinged_at: time,
            },
        );
        Ok(())
    }

    fn get_lock_by_session(&self, session_id: &LockSessionId) -> Result<LockRecord> {
        self.tables()
            .locks
            .values()
            .find(|record| record.session_id == *session_id)
            .cloned()
            .ok_or_else(|| {
                DistLockError::LockNotFound(format!("no lock held by session {}", session_id))
            })
    }

    fn stop_ping(&self, process_id: &str) -> Result<()> {
        self.tables().pings.remove(process_id);
        Ok(())
    }
}
