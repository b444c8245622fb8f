//! Persistence for networks, subnets and leases
//!
//! The store is the only synchronization point in the control plane:
//! there is no in-process locking anywhere above it, and none is needed
//! as long as an implementation honors the transactional contract
//! documented on [`LeaseStore`].

pub mod memory;
pub mod store;

pub use memory::MemoryStore;
pub use store::{LeaseStore, PendingLease, RenewOutcome};
