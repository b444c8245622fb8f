//! Device layer: link and WireGuard backends
//!
//! The reconciliation logic never talks to the kernel directly; it goes
//! through these traits. [`CommandBackend`] drives the real system via
//! `ip` and `wg`, [`MockBackend`] keeps everything in memory so the full
//! loop can run unprivileged in tests and embedders.

pub mod command;
pub mod mock;

use async_trait::async_trait;
use std::net::SocketAddr;

use crate::error::AgentResult;

pub use command::CommandBackend;
pub use mock::MockBackend;

/// Kinds of links the agent manages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Wireguard,
    Bridge,
}

impl LinkKind {
    /// The kernel's name for this device kind
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Wireguard => "wireguard",
            LinkKind::Bridge => "bridge",
        }
    }
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fully resolved peer, ready to apply to the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePeer {
    /// Base64 public key, already validated
    pub public_key: String,
    /// Allowed address ranges (CIDR strings)
    pub allowed_ips: Vec<String>,
    /// Where to dial the peer, if known
    pub endpoint: Option<SocketAddr>,
    /// Persistent keepalive in seconds
    pub keepalive_secs: u16,
}

/// The complete desired device configuration; applying it replaces
/// whatever peers the device had before
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Base64 private key
    pub private_key: String,
    pub listen_port: u16,
    pub peers: Vec<DevicePeer>,
}

/// Link-level operations on network devices
#[async_trait]
pub trait LinkBackend: Send + Sync {
    /// Kind of the named link, `None` if it does not exist
    async fn link_kind(&self, name: &str) -> AgentResult<Option<String>>;

    async fn add_link(&self, name: &str, kind: LinkKind) -> AgentResult<()>;

    async fn delete_link(&self, name: &str) -> AgentResult<()>;

    async fn set_mtu(&self, name: &str, mtu: u32) -> AgentResult<()>;

    async fn set_up(&self, name: &str) -> AgentResult<()>;

    /// IPv4 addresses currently assigned to the link (CIDR strings)
    async fn list_addresses(&self, name: &str) -> AgentResult<Vec<String>>;

    /// Add-or-update an address on the link
    async fn replace_address(&self, name: &str, address: &str) -> AgentResult<()>;

    async fn delete_address(&self, name: &str, address: &str) -> AgentResult<()>;

    /// Replace-or-create a link-scoped route to `destination`
    async fn replace_route(&self, name: &str, destination: &str) -> AgentResult<()>;

    /// Enable IPv4 forwarding on the host
    async fn enable_forwarding(&self) -> AgentResult<()>;
}

/// WireGuard device configuration
#[async_trait]
pub trait WgBackend: Send + Sync {
    /// Apply the full configuration to the named device, replacing its
    /// peer set entirely
    async fn apply_device(&self, name: &str, config: &DeviceConfig) -> AgentResult<()>;
}
