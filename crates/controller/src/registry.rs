//! Network registration: CIDR partitioning plus persistence

use std::sync::Arc;

use tracing::info;

use wgfabric_core::subnets;
use wgfabric_core::{
    CreateNetworkRequest, Network, NetworkView, Result, Subnet,
};
use wgfabric_store::LeaseStore;

/// Creates and deletes networks and their subnet pools
pub struct NetworkRegistry {
    store: Arc<dyn LeaseStore>,
}

impl NetworkRegistry {
    pub fn new(store: Arc<dyn LeaseStore>) -> Self {
        NetworkRegistry { store }
    }

    /// Partition the base range and persist the network with one subnet
    /// row per partition, each immediately allocatable (`free_at = 0`).
    pub async fn create_network(&self, req: CreateNetworkRequest) -> Result<NetworkView> {
        let (base, partitions) = subnets::partition(&req.address, req.subnet_count)?;

        let network = Network {
            name: req.name.clone(),
            address: base.to_string(),
            subnet_count: req.subnet_count,
        };
        let rows: Vec<Subnet> = partitions
            .iter()
            .map(|subnet| Subnet {
                network: req.name.clone(),
                address: subnet.to_string(),
                free_at: 0,
            })
            .collect();
        let addresses: Vec<String> = rows.iter().map(|s| s.address.clone()).collect();

        self.store.create_network(network.clone(), rows).await?;
        info!(
            network = %network.name,
            address = %network.address,
            subnets = addresses.len(),
            "created network"
        );

        Ok(NetworkView {
            network,
            subnets: addresses,
        })
    }

    pub async fn get_network(&self, name: &str) -> Result<NetworkView> {
        let network = self.store.get_network(name).await?;
        let subnets = self.store.list_subnets(name).await?;
        Ok(NetworkView {
            network,
            subnets: subnets.into_iter().map(|s| s.address).collect(),
        })
    }

    pub async fn list_networks(&self) -> Result<Vec<Network>> {
        self.store.list_networks().await
    }

    /// Delete the network and cascade to its subnets. Orphaned leases
    /// are left for purge to clean up.
    pub async fn delete_network(&self, name: &str) -> Result<()> {
        self.store.delete_network(name).await?;
        info!(network = %name, "deleted network");
        Ok(())
    }
}
