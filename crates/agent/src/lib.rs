//! Per-node reconciliation agent for the wgfabric overlay network
//!
//! The agent holds a lease from the control plane and drives the local
//! WireGuard interface toward the mesh configuration every tick:
//! - Lease acquisition/renewal with durable resume across restarts
//! - Interface and optional bridge ensure (recreate on foreign devices)
//! - Address, route and full-replace peer reconciliation
//!
//! Device access goes through the backend traits in [`device`], so the
//! whole loop runs unprivileged against [`device::MockBackend`] in tests.

pub mod agent;
pub mod device;
pub mod error;
pub mod ifmanager;
pub mod keys;
pub mod retry;
pub mod settings;
pub mod state;
pub mod wg;

pub use agent::ReconciliationAgent;
pub use error::{AgentError, AgentResult};
pub use ifmanager::InterfaceManager;
pub use keys::WgKeyPair;
pub use retry::{ExponentialBackoff, FixedDelay, RetryDelay};
pub use settings::AgentSettings;
pub use state::AgentState;
pub use wg::WireGuardConfigurer;
