//! Lease allocation, renewal and housekeeping
//!
//! All correctness under concurrency is delegated to the store's
//! transactional contract; the allocator only decides policy: the TTL,
//! the uuid, and how outcomes map onto responses.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use wgfabric_core::{
    now_ts, AcquireLeaseRequest, Error, LeaseInfo, Result,
};
use wgfabric_store::{LeaseStore, PendingLease, RenewOutcome};

use crate::settings::ControllerSettings;

/// Allocates, renews, inspects, deletes and purges leases
pub struct LeaseAllocator {
    store: Arc<dyn LeaseStore>,
    ttl_secs: i64,
}

impl LeaseAllocator {
    pub fn new(store: Arc<dyn LeaseStore>, settings: &ControllerSettings) -> Self {
        LeaseAllocator {
            store,
            ttl_secs: settings.lease_ttl_secs,
        }
    }

    /// Grant one free subnet of the network to the requester.
    ///
    /// The store claims the subnet and inserts the lease in a single
    /// transaction; on any failure nothing is visible. No eligible
    /// subnet fails with `CapacityExhausted`.
    pub async fn acquire(&self, req: AcquireLeaseRequest) -> Result<LeaseInfo> {
        // Unknown networks fail with NotFound before anything is claimed
        self.store.get_network(&req.network).await?;

        let now = now_ts();
        let pending = PendingLease {
            uuid: Uuid::new_v4(),
            public_key: req.public_key,
            peer: req.peer,
            expires_at: now + self.ttl_secs,
        };

        match self.store.allocate_lease(&req.network, now, pending).await? {
            Some(lease) => {
                info!(
                    network = %lease.network,
                    subnet = %lease.address,
                    uuid = %lease.uuid,
                    "acquired lease"
                );
                Ok(LeaseInfo::from_lease(&lease, now))
            }
            None => Err(Error::capacity_exhausted(format!(
                "no free subnet in network {}",
                req.network
            ))),
        }
    }

    /// Extend a lease and its backing subnet together. Unknown or
    /// already-expired leases yield the expired sentinel rather than an
    /// error; the caller is expected to acquire afresh.
    pub async fn renew(&self, uuid: Uuid) -> Result<LeaseInfo> {
        let now = now_ts();
        match self.store.renew_lease(uuid, now, now + self.ttl_secs).await? {
            RenewOutcome::Renewed(lease) => {
                debug!(uuid = %uuid, expires_at = lease.expires_at, "renewed lease");
                Ok(LeaseInfo::from_lease(&lease, now))
            }
            RenewOutcome::Expired => {
                debug!(uuid = %uuid, "refusing to renew expired lease");
                Ok(LeaseInfo::expired_sentinel(uuid))
            }
            RenewOutcome::Unknown => {
                debug!(uuid = %uuid, "renewal for unknown lease");
                Ok(LeaseInfo::expired_sentinel(uuid))
            }
        }
    }

    pub async fn get(&self, uuid: Uuid) -> Result<LeaseInfo> {
        let now = now_ts();
        match self.store.get_lease(uuid).await? {
            Some(lease) => Ok(LeaseInfo::from_lease(&lease, now)),
            None => Err(Error::not_found(format!("lease {}", uuid))),
        }
    }

    pub async fn list(&self) -> Result<Vec<LeaseInfo>> {
        let now = now_ts();
        let leases = self.store.list_leases().await?;
        Ok(leases
            .iter()
            .map(|lease| LeaseInfo::from_lease(lease, now))
            .collect())
    }

    pub async fn delete(&self, uuid: Uuid) -> Result<()> {
        if !self.store.delete_lease(uuid).await? {
            return Err(Error::not_found(format!("lease {}", uuid)));
        }
        info!(uuid = %uuid, "deleted lease");
        Ok(())
    }

    /// Remove every expired lease. Capacity is governed by `free_at`,
    /// not lease existence, so this is housekeeping only.
    pub async fn purge(&self) -> Result<u64> {
        let purged = self.store.purge_leases(now_ts()).await?;
        if purged > 0 {
            info!(purged, "purged expired leases");
        }
        Ok(purged)
    }
}
