//! Mesh configuration projection

use std::sync::Arc;

use wgfabric_core::{now_ts, Endpoint, MeshConfig, Result};
use wgfabric_store::LeaseStore;

/// Projects a network's active leases into the peer list an agent needs
pub struct ConfigurationView {
    store: Arc<dyn LeaseStore>,
}

impl ConfigurationView {
    pub fn new(store: Arc<dyn LeaseStore>) -> Self {
        ConfigurationView { store }
    }

    /// Every lease with `expires_at > now` becomes one endpoint: the
    /// holder's public key, its held subnet as the single allowed range,
    /// and its reachable address if it advertised one.
    pub async fn fetch(&self, network: &str) -> Result<MeshConfig> {
        let network = self.store.get_network(network).await?;
        let leases = self
            .store
            .list_active_leases(&network.name, now_ts())
            .await?;

        let endpoints = leases
            .into_iter()
            .map(|lease| Endpoint {
                public_key: lease.public_key,
                allowed_ips: vec![lease.address],
                peer: lease.peer,
            })
            .collect();

        Ok(MeshConfig {
            network: network.name,
            address: network.address,
            endpoints,
        })
    }
}
