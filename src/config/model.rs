//! Config struct definition and defaults.

use serde::{Deserialize, Serialize};

/// Configuration for one model.
///
/// This struct represents the contents of `.fleet/config.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Transaction settings
    // =========================================================================
    /// Attempts per transaction before a `Conflict` is reported.
    #[serde(default = "default_txn_max_attempts")]
    pub txn_max_attempts: u32,

    /// Pause between transaction attempts, in milliseconds.
    #[serde(default = "default_txn_retry_backoff_ms")]
    pub txn_retry_backoff_ms: u64,

    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Minutes after which a lock is considered stale.
    #[serde(default = "default_lock_stale_minutes")]
    pub lock_stale_minutes: u32,

    // =========================================================================
    // Branch settings
    // =========================================================================
    /// How many branches may be in flight at once.
    #[serde(default = "default_max_active_branches")]
    pub max_active_branches: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            txn_max_attempts: default_txn_max_attempts(),
            txn_retry_backoff_ms: default_txn_retry_backoff_ms(),
            lock_stale_minutes: default_lock_stale_minutes(),
            max_active_branches: default_max_active_branches(),
        }
    }
}

fn default_txn_max_attempts() -> u32 {
    3
}

fn default_txn_retry_backoff_ms() -> u64 {
    25
}

fn default_lock_stale_minutes() -> u32 {
    30
}

fn default_max_active_branches() -> u32 {
    1
}
