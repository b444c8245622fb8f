//! Control plane for the wgfabric overlay network, including:
//! - `NetworkRegistry`: network creation and CIDR partitioning
//! - `LeaseAllocator`: concurrency-safe subnet leasing against the store
//! - `ConfigurationView`: mesh membership snapshots for agents
//! - `ControllerService`: the `ControlPlane` facade a transport exposes
//!
//! The store is the sole serialization point; nothing here takes locks.

pub mod allocator;
pub mod auth;
pub mod registry;
pub mod service;
pub mod settings;
pub mod view;

pub use allocator::LeaseAllocator;
pub use registry::NetworkRegistry;
pub use service::ControllerService;
pub use settings::ControllerSettings;
pub use view::ConfigurationView;
