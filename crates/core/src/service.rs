//! The transport-agnostic control-plane surface
//!
//! `ControlPlane` is implemented by the controller on the server side and
//! by whatever RPC client an agent is wired with; the core neither knows
//! nor cares about the wire encoding. Authentication is an external
//! interceptor concern; once a call reaches these methods it is trusted.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{LeaseInfo, MeshConfig, Network, PublicPeer};

/// Request to create a network and partition its base range
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CreateNetworkRequest {
    pub name: String,
    /// Base address range (CIDR)
    pub address: String,
    pub subnet_count: u32,
}

/// Request to allocate a lease out of a network's subnet pool
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AcquireLeaseRequest {
    pub network: String,
    /// Requester's WireGuard public key (base64)
    pub public_key: String,
    /// Externally reachable address/port, if any
    pub peer: Option<PublicPeer>,
}

/// A network together with its generated subnet pool
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NetworkView {
    pub network: Network,
    /// Subnet address ranges in address order
    pub subnets: Vec<String>,
}

/// The full RPC surface of the control plane
#[async_trait]
pub trait ControlPlane: Send + Sync + 'static {
    /// Create a network and its subnet pool. Fails with `AlreadyExists`
    /// for a duplicate name and `Validation` for a malformed range.
    async fn create_network(&self, req: CreateNetworkRequest) -> Result<NetworkView>;

    /// Look up one network with its subnet pool
    async fn get_network(&self, name: &str) -> Result<NetworkView>;

    /// List all networks
    async fn list_networks(&self) -> Result<Vec<Network>>;

    /// Delete a network, cascading to its subnets. Leases referencing
    /// them are orphaned and cleaned up by purge.
    async fn delete_network(&self, name: &str) -> Result<()>;

    /// Allocate one free subnet of the network to the requester. Fails
    /// with `CapacityExhausted` when no subnet is eligible.
    async fn acquire_lease(&self, req: AcquireLeaseRequest) -> Result<LeaseInfo>;

    /// Extend a lease and its backing subnet's `free_at` together. An
    /// unknown or already-expired lease yields the expired sentinel, not
    /// an error; callers then acquire afresh.
    async fn renew_lease(&self, uuid: Uuid) -> Result<LeaseInfo>;

    /// Look up one lease; `expired` is computed at response time
    async fn get_lease(&self, uuid: Uuid) -> Result<LeaseInfo>;

    /// List all leases
    async fn list_leases(&self) -> Result<Vec<LeaseInfo>>;

    /// Delete one lease
    async fn delete_lease(&self, uuid: Uuid) -> Result<()>;

    /// Delete every expired lease, returning how many were removed.
    /// Housekeeping only: capacity returns via `free_at`, not via purge.
    async fn purge_leases(&self) -> Result<u64>;

    /// Mesh membership snapshot of a network: every unexpired lease as a
    /// peer endpoint, plus the base range for aggregate routing
    async fn fetch_configuration(&self, network: &str) -> Result<MeshConfig>;
}
