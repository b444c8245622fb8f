//! Controller configuration
//!
//! An explicit settings value constructed once and passed to each
//! component's constructor; there is no process-wide configuration.

use serde::{Deserialize, Serialize};

fn default_lease_ttl_secs() -> i64 {
    600
}

/// Controller settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerSettings {
    /// The single authoritative lease TTL, used by both acquisition and
    /// renewal
    #[serde(default = "default_lease_ttl_secs")]
    pub lease_ttl_secs: i64,

    /// SHA-512 hex digest of the bearer token agents must present; empty
    /// disables authentication
    #[serde(default)]
    pub hashed_access_token: String,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        ControllerSettings {
            lease_ttl_secs: default_lease_ttl_secs(),
            hashed_access_token: String::new(),
        }
    }
}
