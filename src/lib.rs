//! wgfabric: control plane and node agent for a WireGuard-based overlay
//! network
//!
//! The facade crate re-exports the workspace members:
//! - [`core`]: data model, subnet math and the `ControlPlane` surface
//! - [`store`]: the `LeaseStore` trait and its in-memory implementation
//! - [`controller`]: the server-side allocation engine
//! - [`agent`]: the per-node reconciliation loop

pub use wgfabric_agent as agent;
pub use wgfabric_controller as controller;
pub use wgfabric_core as core;
pub use wgfabric_store as store;
