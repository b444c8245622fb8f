//! Persisted data model and wire-shaped views
//!
//! A `Lease` never stores an `expired` flag; expiry is always computed
//! against the clock at read time so writers and readers cannot drift.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::Timestamp;

/// A named overlay network partitioned into a fixed pool of subnets.
/// Immutable once created, except by deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// Unique network name
    pub name: String,
    /// Base address range (CIDR)
    pub address: String,
    /// Number of subnets the base range was partitioned into
    pub subnet_count: u32,
}

/// One partition of a network's base range. Subnet rows are created at
/// network creation time and never afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    /// Owning network name
    pub network: String,
    /// Address range of this partition (CIDR)
    pub address: String,
    /// Timestamp after which this subnet is allocatable again; this is
    /// the allocation lock, not the existence of a lease
    pub free_at: Timestamp,
}

/// A time-bounded grant of one subnet to one node's public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    /// Globally unique, never reused
    pub uuid: Uuid,
    /// Owning network name
    pub network: String,
    /// The held subnet's address range (CIDR)
    pub address: String,
    /// Requester's WireGuard public key (base64)
    pub public_key: String,
    /// Externally reachable address/port, if the node advertised one
    pub peer: Option<PublicPeer>,
    /// Expiry timestamp; extended on renewal together with the backing
    /// subnet's `free_at`
    pub expires_at: Timestamp,
}

impl Lease {
    /// Whether the lease is expired as of `now`. Never persisted.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at < now
    }
}

/// Externally reachable address and port of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicPeer {
    pub address: String,
    pub port: u16,
}

/// A lease as reported to callers, with expiry computed at response time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseInfo {
    pub uuid: Uuid,
    pub network: String,
    pub address: String,
    pub public_key: String,
    pub peer: Option<PublicPeer>,
    pub expires_at: Timestamp,
    pub expired: bool,
}

impl LeaseInfo {
    /// Project a stored lease into a response as of `now`
    pub fn from_lease(lease: &Lease, now: Timestamp) -> Self {
        LeaseInfo {
            uuid: lease.uuid,
            network: lease.network.clone(),
            address: lease.address.clone(),
            public_key: lease.public_key.clone(),
            peer: lease.peer.clone(),
            expires_at: lease.expires_at,
            expired: lease.is_expired(now),
        }
    }

    /// Sentinel returned by renewal for unknown or expired leases.
    /// Callers detect `expired == true` and acquire a fresh lease.
    pub fn expired_sentinel(uuid: Uuid) -> Self {
        LeaseInfo {
            uuid,
            network: String::new(),
            address: String::new(),
            public_key: String::new(),
            peer: None,
            expires_at: 0,
            expired: true,
        }
    }
}

/// One active peer of a network, as seen by agents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// WireGuard public key (base64)
    pub public_key: String,
    /// Address ranges this peer may originate/receive traffic for; for a
    /// leased peer this is the single held subnet
    pub allowed_ips: Vec<String>,
    /// Reachable address/port, if advertised
    pub peer: Option<PublicPeer>,
}

/// Mesh membership snapshot of a network: every unexpired lease projected
/// into the peer list an agent needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Network name
    pub network: String,
    /// The network's base range, for aggregate routing
    pub address: String,
    /// Active peers
    pub endpoints: Vec<Endpoint>,
}
