//! Error types for distlock.
//!
//! Uses thiserror for derive macros. The lock manager relies on one variant in
//! particular, [`DistLockError::LockStateChangeFailed`], to tell expected
//! contention apart from every other catalog failure.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for distlock operations.
#[derive(Error, Debug)]
pub enum DistLockError {
    /// Contention outlasted the caller's wait budget.
    #[error("Lock busy: {0}")]
    LockBusy(String),

    /// The catalog refused the write because another session holds the lock.
    #[error("Lock is held by another session: {0}")]
    LockStateChangeFailed(String),

    /// No current lock record matches the session.
    #[error("Lock not found: {0}")]
    LockNotFound(String),

    /// Transient or ambiguous catalog failure.
    #[error("Catalog operation failed: {0}")]
    Catalog(String),

    /// Caller supplied an unusable argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration could not be read, parsed, or validated.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Manager lifecycle misuse or worker startup failure.
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    /// A command run under a lock exited unsuccessfully.
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

impl DistLockError {
    /// Whether this is the catalog's "currently held by someone else" signal.
    pub fn is_contention(&self) -> bool {
        matches!(self, DistLockError::LockStateChangeFailed(_))
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            DistLockError::LockBusy(_) | DistLockError::LockStateChangeFailed(_) => {
                exit_codes::LOCK_BUSY
            }
            DistLockError::LockNotFound(_) => exit_codes::LOCK_NOT_FOUND,
            DistLockError::Catalog(_) => exit_codes::CATALOG_FAILURE,
            DistLockError::InvalidArgument(_)
            | DistLockError::Config(_)
            | DistLockError::Lifecycle(_) => exit_codes::USER_ERROR,
            DistLockError::CommandFailed(_) => exit_codes::COMMAND_FAILURE,
        }
    }
}

/// Result type alias for distlock operations.
pub type Result<T> = std::result::Result<T, DistLockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_state_change_failure_is_contention() {
        assert!(DistLockError::LockStateChangeFailed("a".to_string()).is_contention());
        assert!(!DistLockError::LockBusy("a".to_string()).is_contention());
        assert!(!DistLockError::Catalog("network".to_string()).is_contention());
        assert!(!DistLockError::LockNotFound("a".to_string()).is_contention());
    }

    #[test]
    fn busy_and_contention_share_exit_code() {
        let busy = DistLockError::LockBusy("timed out waiting for jobs".to_string());
        let held = DistLockError::LockStateChangeFailed("jobs".to_string());
        assert_eq!(busy.exit_code(), exit_codes::LOCK_BUSY);
        assert_eq!(held.exit_code(), exit_codes::LOCK_BUSY);
    }

    #[test]
    fn catalog_error_has_correct_exit_code() {
        let err = DistLockError::Catalog("connection reset".to_string());
        assert_eq!(err.exit_code(), exit_codes::CATALOG_FAILURE);
    }

    #[test]
    fn user_facing_errors_map_to_user_error() {
        for err in [
            DistLockError::InvalidArgument("empty name".to_string()),
            DistLockError::Config("bad yaml".to_string()),
            DistLockError::Lifecycle("already started".to_string()),
        ] {
            assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
        }
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = DistLockError::LockBusy("timed out waiting for balancer".to_string());
        assert_eq!(err.to_string(), "Lock busy: timed out waiting for balancer");

        let err = DistLockError::LockNotFound("lock owner changed".to_string());
        assert_eq!(err.to_string(), "Lock not found: lock owner changed");
    }
}
