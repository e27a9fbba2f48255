//! Lock session identifiers and wait policies.

use crate::error::{DistLockError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Identifies one acquisition attempt that reached the catalog.
///
/// The session id is the fencing token of a lock: releasing or checking a
/// lock goes through the session id, never through the lock name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockSessionId(Uuid);

impl LockSessionId {
    /// Generate a fresh random session id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for LockSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for LockSessionId {
    type Err = DistLockError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim()).map(Self).map_err(|e| {
            DistLockError::InvalidArgument(format!("invalid lock session id '{}': {}", s, e))
        })
    }
}

/// How long [`LockManager::lock`](super::LockManager::lock) keeps retrying
/// while the lock is held elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// One catalog attempt, no sleeping.
    TryOnce,
    /// Retry until this much wall-clock time has passed since the call began.
    Timeout(Duration),
    /// Retry until acquired.
    Forever,
}

impl WaitPolicy {
    /// `0` tries once, a positive value waits that many milliseconds,
    /// a negative value waits forever.
    pub fn from_millis(millis: i64) -> Self {
        match millis {
            0 => WaitPolicy::TryOnce,
            m if m < 0 => WaitPolicy::Forever,
            m => WaitPolicy::Timeout(Duration::from_millis(m.unsigned_abs())),
        }
    }
}

impl From<Duration> for WaitPolicy {
    fn from(wait: Duration) -> Self {
        if wait.is_zero() {
            WaitPolicy::TryOnce
        } else {
            WaitPolicy::Timeout(wait)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = LockSessionId::generate();
        let b = LockSessionId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn display_parses_back() {
        let id = LockSessionId::generate();
        let parsed: LockSessionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn hyphenated_form_is_accepted() {
        let id = LockSessionId::generate();
        let hyphenated = Uuid::parse_str(&id.to_string()).unwrap().hyphenated().to_string();
        assert!(hyphenated.contains('-'));
        let parsed: LockSessionId = hyphenated.parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn garbage_is_rejected() {
        let err = "not-a-session".parse::<LockSessionId>().unwrap_err();
        assert!(matches!(err, DistLockError::InvalidArgument(_)));
    }

    #[test]
    fn wait_policy_from_duration() {
        assert_eq!(WaitPolicy::from(Duration::ZERO), WaitPolicy::TryOnce);
        assert_eq!(
            WaitPolicy::from(Duration::from_secs(2)),
            WaitPolicy::Timeout(Duration::from_secs(2))
        );
    }

    #[test]
    fn wait_policy_from_millis() {
        assert_eq!(WaitPolicy::from_millis(0), WaitPolicy::TryOnce);
        assert_eq!(WaitPolicy::from_millis(-1), WaitPolicy::Forever);
        assert_eq!(
            WaitPolicy::from_millis(1500),
            WaitPolicy::Timeout(Duration::from_millis(1500))
        );
    }
}
