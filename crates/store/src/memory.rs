//! In-memory `LeaseStore` implementation
//!
//! One mutex guards all tables, so every method body runs as a single
//! serialized transaction. That trivially satisfies the isolation
//! contract and makes this store the reference for testing the
//! allocator's concurrency behavior; a relational implementation has to
//! reproduce the same guarantees with locking reads.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use ipnetwork::Ipv4Network;
use tokio::sync::Mutex;
use uuid::Uuid;

use wgfabric_core::{Error, Lease, Network, Result, Subnet, Timestamp};

use crate::store::{LeaseStore, PendingLease, RenewOutcome};

#[derive(Default)]
struct Tables {
    networks: HashMap<String, Network>,
    /// Keyed by (network, subnet address as u32) so iteration within one
    /// network is lowest-address-first
    subnets: BTreeMap<(String, u32), Subnet>,
    leases: HashMap<Uuid, Lease>,
}

/// In-memory store; cheap to clone handles via `Arc`
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn subnet_sort_key(address: &str) -> Result<u32> {
    let net: Ipv4Network = address
        .parse()
        .map_err(|e| Error::store(format!("unparseable subnet address {}: {}", address, e)))?;
    Ok(u32::from(net.network()))
}

#[async_trait]
impl LeaseStore for MemoryStore {
    async fn create_network(&self, network: Network, subnets: Vec<Subnet>) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if tables.networks.contains_key(&network.name) {
            return Err(Error::already_exists(format!(
                "network {} already exists",
                network.name
            )));
        }

        // Validate every row before inserting anything, so a bad subnet
        // cannot leave a half-created network behind
        let mut rows = Vec::with_capacity(subnets.len());
        for subnet in subnets {
            let key = (subnet.network.clone(), subnet_sort_key(&subnet.address)?);
            rows.push((key, subnet));
        }

        tables.networks.insert(network.name.clone(), network);
        for (key, subnet) in rows {
            tables.subnets.insert(key, subnet);
        }
        Ok(())
    }

    async fn get_network(&self, name: &str) -> Result<Network> {
        let tables = self.tables.lock().await;
        tables
            .networks
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("network {}", name)))
    }

    async fn list_networks(&self) -> Result<Vec<Network>> {
        let tables = self.tables.lock().await;
        let mut networks: Vec<Network> = tables.networks.values().cloned().collect();
        networks.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(networks)
    }

    async fn delete_network(&self, name: &str) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if tables.networks.remove(name).is_none() {
            return Err(Error::not_found(format!("network {}", name)));
        }
        tables.subnets.retain(|(owner, _), _| owner != name);
        Ok(())
    }

    async fn list_subnets(&self, network: &str) -> Result<Vec<Subnet>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .subnets
            .range((network.to_string(), 0)..=(network.to_string(), u32::MAX))
            .map(|(_, subnet)| subnet.clone())
            .collect())
    }

    async fn allocate_lease(
        &self,
        network: &str,
        now: Timestamp,
        lease: PendingLease,
    ) -> Result<Option<Lease>> {
        let mut tables = self.tables.lock().await;

        // Lowest address first, to keep selection deterministic and
        // fragmentation low
        let claimed = tables
            .subnets
            .range_mut((network.to_string(), 0)..=(network.to_string(), u32::MAX))
            .map(|(_, subnet)| subnet)
            .find(|subnet| subnet.free_at <= now);

        let address = match claimed {
            Some(subnet) => {
                subnet.free_at = lease.expires_at;
                subnet.address.clone()
            }
            None => return Ok(None),
        };

        let row = Lease {
            uuid: lease.uuid,
            network: network.to_string(),
            address,
            public_key: lease.public_key,
            peer: lease.peer,
            expires_at: lease.expires_at,
        };
        tables.leases.insert(row.uuid, row.clone());
        Ok(Some(row))
    }

    async fn renew_lease(
        &self,
        uuid: Uuid,
        now: Timestamp,
        expires_at: Timestamp,
    ) -> Result<RenewOutcome> {
        let mut tables = self.tables.lock().await;

        let (network, address, expired) = match tables.leases.get(&uuid) {
            Some(lease) => (
                lease.network.clone(),
                lease.address.clone(),
                lease.is_expired(now),
            ),
            None => return Ok(RenewOutcome::Unknown),
        };

        // Expired leases are not resurrectable; purge and re-acquire
        if expired {
            return Ok(RenewOutcome::Expired);
        }

        let key = (network, subnet_sort_key(&address)?);
        match tables.subnets.get_mut(&key) {
            Some(subnet) => subnet.free_at = expires_at,
            None => {
                // Network was deleted under the lease; treat the lease
                // as dead rather than extend a grant on nothing
                return Ok(RenewOutcome::Expired);
            }
        }

        let lease = tables
            .leases
            .get_mut(&uuid)
            .ok_or_else(|| Error::store("lease vanished mid-transaction"))?;
        lease.expires_at = expires_at;
        Ok(RenewOutcome::Renewed(lease.clone()))
    }

    async fn get_lease(&self, uuid: Uuid) -> Result<Option<Lease>> {
        let tables = self.tables.lock().await;
        Ok(tables.leases.get(&uuid).cloned())
    }

    async fn list_leases(&self) -> Result<Vec<Lease>> {
        let tables = self.tables.lock().await;
        let mut leases: Vec<Lease> = tables.leases.values().cloned().collect();
        leases.sort_by_key(|l| l.uuid);
        Ok(leases)
    }

    async fn delete_lease(&self, uuid: Uuid) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        Ok(tables.leases.remove(&uuid).is_some())
    }

    async fn purge_leases(&self, now: Timestamp) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        let before = tables.leases.len();
        tables.leases.retain(|_, lease| !lease.is_expired(now));
        Ok((before - tables.leases.len()) as u64)
    }

    async fn list_active_leases(&self, network: &str, now: Timestamp) -> Result<Vec<Lease>> {
        let tables = self.tables.lock().await;
        let mut leases: Vec<Lease> = tables
            .leases
            .values()
            .filter(|lease| lease.network == network && lease.expires_at > now)
            .cloned()
            .collect();
        leases.sort_by_key(|l| l.uuid);
        Ok(leases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgfabric_core::now_ts;

    fn network(name: &str) -> Network {
        Network {
            name: name.to_string(),
            address: "10.0.0.0/24".to_string(),
            subnet_count: 4,
        }
    }

    fn subnet(name: &str, address: &str) -> Subnet {
        Subnet {
            network: name.to_string(),
            address: address.to_string(),
            free_at: 0,
        }
    }

    fn pending(expires_at: Timestamp) -> PendingLease {
        PendingLease {
            uuid: Uuid::new_v4(),
            public_key: "pk".to_string(),
            peer: None,
            expires_at,
        }
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .create_network(
                network("prod"),
                vec![
                    subnet("prod", "10.0.0.0/26"),
                    subnet("prod", "10.0.0.64/26"),
                    subnet("prod", "10.0.0.128/26"),
                    subnet("prod", "10.0.0.192/26"),
                ],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_duplicate_network_rejected() {
        let store = seeded().await;
        let err = store
            .create_network(network("prod"), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_allocate_prefers_lowest_address() {
        let store = seeded().await;
        let now = now_ts();
        let first = store
            .allocate_lease("prod", now, pending(now + 600))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.address, "10.0.0.0/26");

        let second = store
            .allocate_lease("prod", now, pending(now + 600))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.address, "10.0.0.64/26");
    }

    #[tokio::test]
    async fn test_allocate_exhausts_pool() {
        let store = seeded().await;
        let now = now_ts();
        for _ in 0..4 {
            assert!(store
                .allocate_lease("prod", now, pending(now + 600))
                .await
                .unwrap()
                .is_some());
        }
        assert!(store
            .allocate_lease("prod", now, pending(now + 600))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_renew_extends_lease_and_subnet_together() {
        let store = seeded().await;
        let now = now_ts();
        let lease = store
            .allocate_lease("prod", now, pending(now + 600))
            .await
            .unwrap()
            .unwrap();

        let outcome = store
            .renew_lease(lease.uuid, now, now + 1200)
            .await
            .unwrap();
        let renewed = match outcome {
            RenewOutcome::Renewed(l) => l,
            other => panic!("expected renewal, got {:?}", other),
        };
        assert_eq!(renewed.expires_at, now + 1200);

        let subnets = store.list_subnets("prod").await.unwrap();
        let backing = subnets.iter().find(|s| s.address == lease.address).unwrap();
        assert_eq!(backing.free_at, now + 1200);
    }

    #[tokio::test]
    async fn test_renew_unknown_and_expired() {
        let store = seeded().await;
        let now = now_ts();

        assert_eq!(
            store.renew_lease(Uuid::new_v4(), now, now + 600).await.unwrap(),
            RenewOutcome::Unknown
        );

        let lease = store
            .allocate_lease("prod", now, pending(now - 30))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            store.renew_lease(lease.uuid, now, now + 600).await.unwrap(),
            RenewOutcome::Expired
        );
        // Untouched by the failed renewal
        let stored = store.get_lease(lease.uuid).await.unwrap().unwrap();
        assert_eq!(stored.expires_at, now - 30);
    }

    #[tokio::test]
    async fn test_purge_removes_only_expired() {
        let store = seeded().await;
        let now = now_ts();
        let dead = store
            .allocate_lease("prod", now, pending(now - 30))
            .await
            .unwrap()
            .unwrap();
        let live = store
            .allocate_lease("prod", now, pending(now + 600))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(store.purge_leases(now).await.unwrap(), 1);
        assert!(store.get_lease(dead.uuid).await.unwrap().is_none());
        assert!(store.get_lease(live.uuid).await.unwrap().is_some());

        // free_at is not reset by purge
        let subnets = store.list_subnets("prod").await.unwrap();
        let freed = subnets.iter().find(|s| s.address == dead.address).unwrap();
        assert_eq!(freed.free_at, now - 30);
    }

    #[tokio::test]
    async fn test_delete_network_cascades_subnets() {
        let store = seeded().await;
        store.delete_network("prod").await.unwrap();
        assert!(store.list_subnets("prod").await.unwrap().is_empty());
        assert!(matches!(
            store.get_network("prod").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_networks_do_not_share_subnet_rows() {
        let store = seeded().await;
        store
            .create_network(
                Network {
                    name: "dev".to_string(),
                    address: "10.1.0.0/24".to_string(),
                    subnet_count: 1,
                },
                vec![subnet("dev", "10.1.0.0/24")],
            )
            .await
            .unwrap();

        let now = now_ts();
        let lease = store
            .allocate_lease("dev", now, pending(now + 600))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lease.address, "10.1.0.0/24");
        assert_eq!(store.list_subnets("prod").await.unwrap().len(), 4);
    }
}
