//! Link convergence
//!
//! Idempotent helpers that drive a [`LinkBackend`] toward a desired
//! state: a link of the right kind, exactly one address, a route.

use std::sync::Arc;

use tracing::{info, warn};

use crate::device::{LinkBackend, LinkKind};
use crate::error::{AgentError, AgentResult};

/// Converges network links toward their desired state
pub struct InterfaceManager {
    backend: Arc<dyn LinkBackend>,
}

impl InterfaceManager {
    pub fn new(backend: Arc<dyn LinkBackend>) -> Self {
        Self { backend }
    }

    /// Ensure a link named `name` exists with the given kind and is up.
    ///
    /// A link of a different kind under the same name is deleted and
    /// recreated. Failures here are fatal for the caller: without the
    /// device nothing else can proceed.
    pub async fn ensure_link(
        &self,
        name: &str,
        kind: LinkKind,
        mtu: Option<u32>,
    ) -> AgentResult<()> {
        match self.backend.link_kind(name).await? {
            Some(existing) if existing == kind.as_str() => {}
            Some(existing) => {
                warn!(
                    link = name,
                    found = %existing,
                    wanted = %kind,
                    "link has wrong kind, recreating"
                );
                self.backend.delete_link(name).await?;
                self.backend.add_link(name, kind).await?;
                info!(link = name, kind = %kind, "link recreated");
            }
            None => {
                self.backend.add_link(name, kind).await?;
                info!(link = name, kind = %kind, "link created");
            }
        }
        if let Some(mtu) = mtu {
            self.backend.set_mtu(name, mtu).await?;
        }
        self.backend.set_up(name).await?;
        Ok(())
    }

    /// Ensure `address` is the only address on the link.
    ///
    /// Stray addresses are removed first; a removal failure is logged
    /// and skipped so one undeletable address cannot wedge the loop.
    pub async fn ensure_single_address(&self, name: &str, address: &str) -> AgentResult<()> {
        let current = self.backend.list_addresses(name).await?;
        for addr in current.iter().filter(|a| a.as_str() != address) {
            if let Err(err) = self.backend.delete_address(name, addr).await {
                warn!(link = name, address = %addr, error = %err, "failed to remove stray address");
            } else {
                info!(link = name, address = %addr, "removed stray address");
            }
        }
        self.backend.replace_address(name, address).await
    }

    /// Ensure a link-scoped route to `destination` through the link
    pub async fn ensure_route(&self, name: &str, destination: &str) -> AgentResult<()> {
        self.backend.replace_route(name, destination).await
    }

    /// Turn on IPv4 forwarding, mapping failure to a fatal error
    pub async fn ensure_forwarding(&self) -> AgentResult<()> {
        self.backend
            .enable_forwarding()
            .await
            .map_err(|err| AgentError::FatalDevice(format!("enabling ip forwarding: {}", err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MockBackend;

    fn manager() -> (Arc<MockBackend>, InterfaceManager) {
        let backend = Arc::new(MockBackend::new());
        let manager = InterfaceManager::new(backend.clone());
        (backend, manager)
    }

    #[tokio::test]
    async fn creates_missing_link() {
        let (backend, manager) = manager();
        manager
            .ensure_link("wg-0", LinkKind::Wireguard, Some(1420))
            .await
            .unwrap();
        let link = backend.link("wg-0").unwrap();
        assert_eq!(link.kind, "wireguard");
        assert_eq!(link.mtu, Some(1420));
        assert!(link.up);
    }

    #[tokio::test]
    async fn recreates_link_of_wrong_kind() {
        let (backend, manager) = manager();
        backend.seed_link("wg-0", "dummy");
        manager
            .ensure_link("wg-0", LinkKind::Wireguard, None)
            .await
            .unwrap();
        assert_eq!(backend.link("wg-0").unwrap().kind, "wireguard");
    }

    #[tokio::test]
    async fn existing_link_left_in_place() {
        let (backend, manager) = manager();
        manager
            .ensure_link("br-wg-0", LinkKind::Bridge, None)
            .await
            .unwrap();
        manager
            .ensure_link("br-wg-0", LinkKind::Bridge, None)
            .await
            .unwrap();
        assert_eq!(backend.link("br-wg-0").unwrap().kind, "bridge");
    }

    #[tokio::test]
    async fn strays_removed_before_assigning() {
        let (backend, manager) = manager();
        manager
            .ensure_link("wg-0", LinkKind::Wireguard, None)
            .await
            .unwrap();
        backend.link("wg-0").unwrap();
        manager
            .ensure_single_address("wg-0", "10.0.0.1/32")
            .await
            .unwrap();
        manager
            .ensure_single_address("wg-0", "10.0.0.2/32")
            .await
            .unwrap();
        assert_eq!(
            backend.link("wg-0").unwrap().addresses,
            vec!["10.0.0.2/32".to_string()]
        );
    }
}
