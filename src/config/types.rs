//! Configuration constants and defaults for distlock.

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "distlock.yaml";

// Default value functions for serde
pub(crate) fn default_catalog_dir() -> String {
    ".distlock".to_string()
}
pub(crate) fn default_ping_interval_ms() -> u64 {
    30_000
}
pub(crate) fn default_lock_wait_ms() -> i64 {
    5_000
}
pub(crate) fn default_lock_retry_interval_ms() -> u64 {
    500
}
pub(crate) fn default_ping_stale_minutes() -> u32 {
    15
}
