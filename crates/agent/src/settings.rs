//! Agent configuration
//!
//! One explicit settings value passed into the agent's constructor;
//! whatever produces it (flags, files) is the embedder's concern.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use wgfabric_core::PublicPeer;

fn default_interface() -> String {
    "wg-0".to_string()
}

fn default_listen_port() -> u16 {
    6666
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_mtu() -> u32 {
    1420
}

fn default_keepalive_secs() -> u16 {
    5
}

fn default_state_file() -> PathBuf {
    PathBuf::from("/var/lib/wgfabric/agent.state")
}

fn default_key_file() -> PathBuf {
    PathBuf::from("/var/lib/wgfabric/agent.key")
}

/// Agent settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Network to join
    pub network: String,

    /// Name of the WireGuard interface this agent owns exclusively
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Also maintain a companion bridge named `br-<interface>`
    #[serde(default)]
    pub create_bridge: bool,

    /// Externally reachable address to advertise, if any
    #[serde(default)]
    pub public_address: Option<String>,

    /// WireGuard listen port, also advertised with `public_address`
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Durable `{lease_uuid}` record, written after every lease step
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    /// Private key file; generated with owner-only permissions on first
    /// run, reused afterwards
    #[serde(default = "default_key_file")]
    pub key_file: PathBuf,

    /// Seconds between reconciliation ticks
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// MTU applied to the managed interface
    #[serde(default = "default_mtu")]
    pub mtu: u32,

    /// Persistent keepalive attached to every peer
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u16,
}

impl Default for AgentSettings {
    fn default() -> Self {
        AgentSettings {
            network: String::new(),
            interface: default_interface(),
            create_bridge: false,
            public_address: None,
            listen_port: default_listen_port(),
            state_file: default_state_file(),
            key_file: default_key_file(),
            poll_interval_secs: default_poll_interval_secs(),
            mtu: default_mtu(),
            keepalive_secs: default_keepalive_secs(),
        }
    }
}

impl AgentSettings {
    /// Name of the companion bridge device
    pub fn bridge_name(&self) -> String {
        format!("br-{}", self.interface)
    }

    /// The reachable endpoint to advertise on acquired leases
    pub fn public_peer(&self) -> Option<PublicPeer> {
        self.public_address.as_ref().map(|address| PublicPeer {
            address: address.clone(),
            port: self.listen_port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = AgentSettings::default();
        assert_eq!(settings.interface, "wg-0");
        assert_eq!(settings.listen_port, 6666);
        assert_eq!(settings.poll_interval_secs, 10);
        assert_eq!(settings.mtu, 1420);
        assert_eq!(settings.keepalive_secs, 5);
        assert_eq!(settings.bridge_name(), "br-wg-0");
        assert!(settings.public_peer().is_none());
    }

    #[test]
    fn test_public_peer_carries_listen_port() {
        let settings = AgentSettings {
            public_address: Some("203.0.113.9".to_string()),
            listen_port: 51820,
            ..Default::default()
        };
        let peer = settings.public_peer().unwrap();
        assert_eq!(peer.address, "203.0.113.9");
        assert_eq!(peer.port, 51820);
    }
}
