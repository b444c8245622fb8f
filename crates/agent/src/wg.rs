//! Peer application
//!
//! Turns the mesh configuration handed back by the control plane into a
//! full device configuration and applies it, replacing whatever peers
//! the device held before. Bad entries are skipped with a warning so a
//! single broken peer cannot take the rest of the mesh down.

use std::net::SocketAddr;
use std::sync::Arc;

use ipnetwork::Ipv4Network;
use tracing::{debug, warn};

use wgfabric_core::{Endpoint, MeshConfig};

use crate::device::{DeviceConfig, DevicePeer, WgBackend};
use crate::error::AgentResult;
use crate::keys::{parse_public_key, WgKeyPair};

/// Applies mesh configurations to a WireGuard device
pub struct WireGuardConfigurer {
    backend: Arc<dyn WgBackend>,
    keepalive_secs: u16,
}

impl WireGuardConfigurer {
    pub fn new(backend: Arc<dyn WgBackend>, keepalive_secs: u16) -> Self {
        Self {
            backend,
            keepalive_secs,
        }
    }

    /// Build the desired device configuration from the mesh view.
    ///
    /// The node's own public key is filtered out; the control plane may
    /// or may not have excluded it already.
    pub fn build_config(
        &self,
        keys: &WgKeyPair,
        listen_port: u16,
        mesh: &MeshConfig,
    ) -> DeviceConfig {
        let own_public = keys.public_base64();
        let peers = mesh
            .endpoints
            .iter()
            .filter(|e| e.public_key != own_public)
            .filter_map(|e| self.build_peer(e))
            .collect();
        DeviceConfig {
            private_key: keys.private_base64(),
            listen_port,
            peers,
        }
    }

    fn build_peer(&self, endpoint: &Endpoint) -> Option<DevicePeer> {
        if let Err(err) = parse_public_key(&endpoint.public_key) {
            warn!(public_key = %endpoint.public_key, error = %err, "skipping peer with malformed key");
            return None;
        }
        let mut allowed_ips = Vec::with_capacity(endpoint.allowed_ips.len());
        for cidr in &endpoint.allowed_ips {
            match cidr.parse::<Ipv4Network>() {
                Ok(_) => allowed_ips.push(cidr.clone()),
                Err(err) => {
                    warn!(public_key = %endpoint.public_key, cidr = %cidr, error = %err, "skipping malformed allowed range");
                }
            }
        }
        if allowed_ips.is_empty() {
            warn!(public_key = %endpoint.public_key, "skipping peer with no usable allowed ranges");
            return None;
        }
        let peer_endpoint = endpoint.peer.as_ref().and_then(|p| {
            match format!("{}:{}", p.address, p.port).parse::<SocketAddr>() {
                Ok(addr) => Some(addr),
                Err(err) => {
                    warn!(public_key = %endpoint.public_key, address = %p.address, error = %err, "ignoring unparsable peer endpoint");
                    None
                }
            }
        });
        Some(DevicePeer {
            public_key: endpoint.public_key.clone(),
            allowed_ips,
            endpoint: peer_endpoint,
            keepalive_secs: self.keepalive_secs,
        })
    }

    /// Apply the configuration to the named device
    pub async fn apply(&self, device: &str, config: &DeviceConfig) -> AgentResult<()> {
        debug!(device, peers = config.peers.len(), "applying device configuration");
        self.backend.apply_device(device, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MockBackend;
    use wgfabric_core::PublicPeer;

    fn configurer() -> WireGuardConfigurer {
        WireGuardConfigurer::new(Arc::new(MockBackend::new()), 5)
    }

    fn endpoint(key: &str, allowed: &[&str], peer: Option<PublicPeer>) -> Endpoint {
        Endpoint {
            public_key: key.to_string(),
            allowed_ips: allowed.iter().map(|s| s.to_string()).collect(),
            peer,
        }
    }

    fn mesh(endpoints: Vec<Endpoint>) -> MeshConfig {
        MeshConfig {
            network: "mesh".to_string(),
            address: "10.0.0.0/24".to_string(),
            endpoints,
        }
    }

    #[test]
    fn own_key_is_filtered_out() {
        let keys = WgKeyPair::generate();
        let other = WgKeyPair::generate();
        let config = configurer().build_config(
            &keys,
            6666,
            &mesh(vec![
                endpoint(&keys.public_base64(), &["10.0.0.1/32"], None),
                endpoint(&other.public_base64(), &["10.0.0.2/32"], None),
            ]),
        );
        assert_eq!(config.peers.len(), 1);
        assert_eq!(config.peers[0].public_key, other.public_base64());
    }

    #[test]
    fn malformed_key_skipped() {
        let keys = WgKeyPair::generate();
        let other = WgKeyPair::generate();
        let config = configurer().build_config(
            &keys,
            6666,
            &mesh(vec![
                endpoint("not base64!!", &["10.0.0.1/32"], None),
                endpoint(&other.public_base64(), &["10.0.0.2/32"], None),
            ]),
        );
        assert_eq!(config.peers.len(), 1);
    }

    #[test]
    fn malformed_allowed_range_dropped_peer_kept() {
        let keys = WgKeyPair::generate();
        let other = WgKeyPair::generate();
        let config = configurer().build_config(
            &keys,
            6666,
            &mesh(vec![endpoint(
                &other.public_base64(),
                &["nonsense", "10.0.0.2/32"],
                None,
            )]),
        );
        assert_eq!(config.peers.len(), 1);
        assert_eq!(config.peers[0].allowed_ips, vec!["10.0.0.2/32".to_string()]);
    }

    #[test]
    fn unparsable_endpoint_ignored() {
        let keys = WgKeyPair::generate();
        let other = WgKeyPair::generate();
        let config = configurer().build_config(
            &keys,
            6666,
            &mesh(vec![endpoint(
                &other.public_base64(),
                &["10.0.0.2/32"],
                Some(PublicPeer {
                    address: "not-an-ip".to_string(),
                    port: 6666,
                }),
            )]),
        );
        assert_eq!(config.peers[0].endpoint, None);
    }

    #[test]
    fn endpoint_and_keepalive_carried() {
        let keys = WgKeyPair::generate();
        let other = WgKeyPair::generate();
        let config = configurer().build_config(
            &keys,
            6666,
            &mesh(vec![endpoint(
                &other.public_base64(),
                &["10.0.0.2/32"],
                Some(PublicPeer {
                    address: "192.0.2.10".to_string(),
                    port: 7000,
                }),
            )]),
        );
        let peer = &config.peers[0];
        assert_eq!(peer.endpoint, Some("192.0.2.10:7000".parse().unwrap()));
        assert_eq!(peer.keepalive_secs, 5);
    }
}
