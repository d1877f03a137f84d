//! Lock manager settings

use serde::{Deserialize, Serialize};

/// Lease duration used when the caller does not pick one
pub const DEFAULT_TTL_SECONDS: i64 = 30;

/// Settings for a `LockManager`, read from the `lock` config section
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockSettings {
    pub default_ttl_seconds: i64,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            default_ttl_seconds: DEFAULT_TTL_SECONDS,
        }
    }
}
