//! Exit code constants for the distlock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, bad config, lifecycle misuse)
//! - 2: Command run under the lock failed
//! - 3: Catalog operation failure
//! - 4: Lock busy (contention outlasted the wait budget)
//! - 5: Lock not found (status check)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid configuration, or lifecycle misuse.
pub const USER_ERROR: i32 = 1;

/// The command executed while holding the lock exited unsuccessfully.
pub const COMMAND_FAILURE: i32 = 2;

/// Catalog failure: I/O, serialization, or an ambiguous write outcome.
pub const CATALOG_FAILURE: i32 = 3;

/// Lock acquisition timed out under contention.
pub const LOCK_BUSY: i32 = 4;

/// Status check found no matching lock record.
pub const LOCK_NOT_FOUND: i32 = 5;
