//! The `ControlPlane` facade a transport exposes
//!
//! Thin delegation to the registry, allocator and view, mirroring the
//! request/response shape of the RPC surface. A server binding attaches
//! its authentication interceptor in front of this facade; calls that
//! reach it are trusted.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use wgfabric_core::{
    AcquireLeaseRequest, ControlPlane, CreateNetworkRequest, LeaseInfo,
    MeshConfig, Network, NetworkView, Result,
};
use wgfabric_store::LeaseStore;

use crate::allocator::LeaseAllocator;
use crate::registry::NetworkRegistry;
use crate::settings::ControllerSettings;
use crate::view::ConfigurationView;

/// The whole control plane behind one handle
pub struct ControllerService {
    registry: NetworkRegistry,
    allocator: LeaseAllocator,
    view: ConfigurationView,
}

impl ControllerService {
    pub fn new(store: Arc<dyn LeaseStore>, settings: &ControllerSettings) -> Self {
        ControllerService {
            registry: NetworkRegistry::new(store.clone()),
            allocator: LeaseAllocator::new(store.clone(), settings),
            view: ConfigurationView::new(store),
        }
    }
}

#[async_trait]
impl ControlPlane for ControllerService {
    async fn create_network(&self, req: CreateNetworkRequest) -> Result<NetworkView> {
        self.registry.create_network(req).await
    }

    async fn get_network(&self, name: &str) -> Result<NetworkView> {
        self.registry.get_network(name).await
    }

    async fn list_networks(&self) -> Result<Vec<Network>> {
        self.registry.list_networks().await
    }

    async fn delete_network(&self, name: &str) -> Result<()> {
        self.registry.delete_network(name).await
    }

    async fn acquire_lease(&self, req: AcquireLeaseRequest) -> Result<LeaseInfo> {
        self.allocator.acquire(req).await
    }

    async fn renew_lease(&self, uuid: Uuid) -> Result<LeaseInfo> {
        self.allocator.renew(uuid).await
    }

    async fn get_lease(&self, uuid: Uuid) -> Result<LeaseInfo> {
        self.allocator.get(uuid).await
    }

    async fn list_leases(&self) -> Result<Vec<LeaseInfo>> {
        self.allocator.list().await
    }

    async fn delete_lease(&self, uuid: Uuid) -> Result<()> {
        self.allocator.delete(uuid).await
    }

    async fn purge_leases(&self) -> Result<u64> {
        self.allocator.purge().await
    }

    async fn fetch_configuration(&self, network: &str) -> Result<MeshConfig> {
        self.view.fetch(network).await
    }
}
