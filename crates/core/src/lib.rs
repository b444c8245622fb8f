//! Core types for the wgfabric overlay network, including:
//! - The persisted data model (networks, subnets, leases)
//! - The common error taxonomy
//! - CIDR partitioning of a network's base range into its subnet pool
//! - The `ControlPlane` trait, the transport-agnostic RPC surface

pub mod error;
pub mod service;
pub mod subnets;
pub mod time;
pub mod types;

// Re-export commonly used types and functions
pub use error::{Error, Result};
pub use service::{
    AcquireLeaseRequest,
    ControlPlane,
    CreateNetworkRequest,
    NetworkView,
};
pub use time::{now_ts, Timestamp};
pub use types::{
    Endpoint,
    Lease,
    LeaseInfo,
    MeshConfig,
    Network,
    PublicPeer,
    Subnet,
};
