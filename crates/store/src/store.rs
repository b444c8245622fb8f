//! The `LeaseStore` trait and its transactional contract

use async_trait::async_trait;
use uuid::Uuid;

use wgfabric_core::{Lease, Network, PublicPeer, Result, Subnet, Timestamp};

/// The fields of a lease the allocator decides before the store picks a
/// subnet for it
#[derive(Debug, Clone)]
pub struct PendingLease {
    pub uuid: Uuid,
    pub public_key: String,
    pub peer: Option<PublicPeer>,
    pub expires_at: Timestamp,
}

/// Outcome of a renewal attempt. `Unknown` and `Expired` are ordinary
/// outcomes, not errors: the caller answers them with the expired
/// sentinel so agents re-acquire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewOutcome {
    /// Lease and backing subnet were extended together
    Renewed(Lease),
    /// The lease exists but already expired; nothing was mutated
    Expired,
    /// No lease with that uuid
    Unknown,
}

/// Transactional persistence for networks, subnets and leases.
///
/// ISOLATION CONTRACT: every method is one transaction. In particular,
/// [`allocate_lease`](LeaseStore::allocate_lease) must select its subnet
/// with serializable isolation or an explicit locking read, so that two
/// concurrent calls can never claim the same row, and
/// [`renew_lease`](LeaseStore::renew_lease) must mutate the lease's
/// `expires_at` and the subnet's `free_at` atomically, otherwise a
/// concurrent allocation could reallocate a subnet mid-renewal. On any
/// failure no partial state may remain visible. Implementations that
/// cannot provide this are incorrect, not merely slow.
#[async_trait]
pub trait LeaseStore: Send + Sync + 'static {
    /// Insert a network and its subnet rows atomically. A duplicate name
    /// fails with `AlreadyExists` and inserts nothing.
    async fn create_network(&self, network: Network, subnets: Vec<Subnet>) -> Result<()>;

    /// Look up one network by name
    async fn get_network(&self, name: &str) -> Result<Network>;

    /// All networks
    async fn list_networks(&self) -> Result<Vec<Network>>;

    /// Remove a network and cascade to its subnets. Leases referencing
    /// the deleted subnets stay behind until purged.
    async fn delete_network(&self, name: &str) -> Result<()>;

    /// Subnet rows of a network, in address order
    async fn list_subnets(&self, network: &str) -> Result<Vec<Subnet>>;

    /// Claim the lowest-addressed subnet of `network` with
    /// `free_at <= now`, set its `free_at` to the lease's expiry and
    /// insert the lease, all in one transaction. `None` means no subnet
    /// is eligible (capacity exhausted).
    async fn allocate_lease(
        &self,
        network: &str,
        now: Timestamp,
        lease: PendingLease,
    ) -> Result<Option<Lease>>;

    /// Extend a live lease's `expires_at` and its subnet's `free_at` to
    /// `expires_at`, atomically. Expired leases are left untouched and
    /// reported as [`RenewOutcome::Expired`].
    async fn renew_lease(
        &self,
        uuid: Uuid,
        now: Timestamp,
        expires_at: Timestamp,
    ) -> Result<RenewOutcome>;

    /// Look up one lease by uuid
    async fn get_lease(&self, uuid: Uuid) -> Result<Option<Lease>>;

    /// All leases, across networks
    async fn list_leases(&self) -> Result<Vec<Lease>>;

    /// Delete one lease; `false` when the uuid is unknown
    async fn delete_lease(&self, uuid: Uuid) -> Result<bool>;

    /// Delete every lease with `expires_at < now`. Subnets' `free_at` is
    /// deliberately left alone: capacity returns when `free_at` passes.
    async fn purge_leases(&self, now: Timestamp) -> Result<u64>;

    /// Unexpired leases of one network (`expires_at > now`)
    async fn list_active_leases(&self, network: &str, now: Timestamp) -> Result<Vec<Lease>>;
}
