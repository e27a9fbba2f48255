//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for a distlock process.
///
/// This struct represents the contents of `distlock.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Identity
    // =========================================================================
    /// Identity written as the owner of every lock and as the ping key.
    /// Derived from `user@host:pid` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<String>,

    // =========================================================================
    // Catalog settings
    // =========================================================================
    /// Directory holding the file-backed lock catalog.
    #[serde(default = "default_catalog_dir")]
    pub catalog_dir: String,

    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Interval between liveness pings and deferred-unlock drains.
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    /// How long to wait for a contended lock.
    /// `0` tries once, a negative value waits forever.
    #[serde(default = "default_lock_wait_ms")]
    pub lock_wait_ms: i64,

    /// Pause between acquisition attempts while the lock is held elsewhere.
    #[serde(default = "default_lock_retry_interval_ms")]
    pub lock_retry_interval_ms: u64,

    /// Minutes without a ping after which a process is reported as stale.
    #[serde(default = "default_ping_stale_minutes")]
    pub ping_stale_minutes: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            process_id: None,
            catalog_dir: default_catalog_dir(),
            ping_interval_ms: default_ping_interval_ms(),
            lock_wait_ms: default_lock_wait_ms(),
            lock_retry_interval_ms: default_lock_retry_interval_ms(),
            ping_stale_minutes: default_ping_stale_minutes(),
        }
    }
}
