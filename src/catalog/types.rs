//! Record types stored in a lock catalog.

use crate::locks::LockSessionId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// State of a lock record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    Unlocked,
    Locked,
}

/// Everything a catalog needs to write one acquisition.
#[derive(Debug, Clone, Copy)]
pub struct LockRequest<'a> {
    pub name: &'a str,
    pub session_id: &'a LockSessionId,
    /// Process identity plus calling thread, for diagnostics.
    pub who: &'a str,
    pub process_id: &'a str,
    pub time: DateTime<Utc>,
    pub reason: &'a str,
}

/// A lock as recorded by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Lock name; unique within a catalog.
    pub name: String,

    /// Session that performed the acquisition.
    pub session_id: LockSessionId,

    pub state: LockState,

    /// Owner string (`<process>:<thread>`).
    pub who: String,

    /// Identity of the owning process; matches its ping record.
    pub process_id: String,

    /// Timestamp when the lock was acquired (RFC3339).
    pub acquired_at: DateTime<Utc>,

    /// Human-readable reason supplied by the caller.
    pub reason: String,
}

impl LockRecord {
    /// Build the record a successful `grab_lock` writes.
    pub fn locked(request: &LockRequest<'_>) -> Self {
        Self {
            name: request.name.to_string(),
            session_id: *request.session_id,
            state: LockState::Locked,
            who: request.who.to_string(),
            process_id: request.process_id.to_string(),
            acquired_at: request.time,
            reason: request.reason.to_string(),
        }
    }

    /// Whether this record is a live acquisition by `session_id`.
    pub fn is_held_by(&self, session_id: &LockSessionId) -> bool {
        self.state == LockState::Locked && self.session_id == *session_id
    }

    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.acquired_at)
    }

    pub fn age_string(&self) -> String {
        format_age(self.age())
    }
}

/// Liveness record maintained by a running lock manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingRecord {
    pub process_id: String,
    pub pinged_at: DateTime<Utc>,
}

impl PingRecord {
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.pinged_at)
    }

    pub fn age_string(&self) -> String {
        format_age(self.age())
    }

    /// Check if the process has gone quiet for longer than `stale_minutes`.
    pub fn is_stale(&self, stale_minutes: u32) -> bool {
        self.age().num_minutes() > i64::from(stale_minutes)
    }
}

/// Format an age as a coarse human-readable string (`3d 4h`, `2h 5m`, `7m`).
fn format_age(age: Duration) -> String {
    let minutes = age.num_minutes();
    let hours = age.num_hours();
    let days = age.num_days();

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}

impl std::fmt::Display for LockRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (owner: {}, age: {}, reason: {})",
            self.name,
            self.who,
            self.age_string(),
            self.reason
        )
    }
}
