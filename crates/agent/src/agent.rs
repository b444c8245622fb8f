//! The reconciliation loop
//!
//! One tick drives the node from whatever state it is in toward full
//! mesh membership: hold a valid lease, own a healthy interface, carry
//! the right addresses and route, and mirror the control plane's peer
//! set on the device. Every step is idempotent, so a tick after a crash
//! or restart converges the same way a first tick does.

use std::sync::Arc;
use std::time::Duration;

use ipnetwork::Ipv4Network;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use wgfabric_core::subnets::{host_address, second_host_address};
use wgfabric_core::{AcquireLeaseRequest, ControlPlane, LeaseInfo};

use crate::device::{LinkBackend, LinkKind, WgBackend};
use crate::error::{AgentError, AgentResult};
use crate::ifmanager::InterfaceManager;
use crate::keys::WgKeyPair;
use crate::retry::RetryDelay;
use crate::settings::AgentSettings;
use crate::state::AgentState;
use crate::wg::WireGuardConfigurer;

/// A node agent holding one lease on one network
pub struct ReconciliationAgent {
    settings: AgentSettings,
    client: Arc<dyn ControlPlane>,
    links: InterfaceManager,
    wg: WireGuardConfigurer,
    keys: WgKeyPair,
    state: AgentState,
    retry: Box<dyn RetryDelay>,
}

impl ReconciliationAgent {
    /// Build an agent, loading or generating its key material and
    /// durable state from the configured paths.
    pub async fn new(
        settings: AgentSettings,
        client: Arc<dyn ControlPlane>,
        link_backend: Arc<dyn LinkBackend>,
        wg_backend: Arc<dyn WgBackend>,
        retry: Box<dyn RetryDelay>,
    ) -> AgentResult<Self> {
        let keys = WgKeyPair::load_or_generate(&settings.key_file).await?;
        let state = AgentState::load(&settings.state_file).await;
        let wg = WireGuardConfigurer::new(wg_backend, settings.keepalive_secs);
        Ok(ReconciliationAgent {
            links: InterfaceManager::new(link_backend),
            wg,
            keys,
            state,
            retry,
            settings,
            client,
        })
    }

    /// The lease this agent currently holds, if any
    pub fn lease_uuid(&self) -> Option<uuid::Uuid> {
        self.state.lease_uuid
    }

    /// This node's public key, base64 encoded
    pub fn public_key(&self) -> String {
        self.keys.public_base64()
    }

    /// Run ticks until `shutdown` flips to true or a fatal error ends
    /// the agent. Transient failures delay the next tick per the retry
    /// policy instead of terminating.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> AgentResult<()> {
        self.links.ensure_forwarding().await?;
        loop {
            let delay = match self.run_once().await {
                Ok(()) => {
                    self.retry.reset();
                    Duration::from_secs(self.settings.poll_interval_secs)
                }
                Err(err) if err.is_fatal() => {
                    error!(error = %err, "fatal error, stopping agent");
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.retry.next_delay();
                    warn!(error = %err, delay_secs = delay.as_secs(), "tick failed, backing off");
                    delay
                }
            };
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("shutdown requested, stopping agent");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// One reconciliation tick
    pub async fn run_once(&mut self) -> AgentResult<()> {
        let lease = self.lease_step().await?;
        let subnet: Ipv4Network = lease
            .address
            .parse()
            .map_err(|e| AgentError::transient(format!("leased range {}: {}", lease.address, e)))?;

        self.links
            .ensure_link(&self.settings.interface, LinkKind::Wireguard, Some(self.settings.mtu))
            .await
            .map_err(|err| AgentError::FatalDevice(err.to_string()))?;

        if self.settings.create_bridge {
            retryable(
                self.links
                    .ensure_link(&self.settings.bridge_name(), LinkKind::Bridge, None)
                    .await,
            )?;
        }

        let mesh = self.client.fetch_configuration(&self.settings.network).await?;

        retryable(
            self.links
                .ensure_single_address(&self.settings.interface, &host_address(&subnet).to_string())
                .await,
        )?;
        retryable(
            self.links
                .ensure_route(&self.settings.interface, &mesh.address)
                .await,
        )?;

        if self.settings.create_bridge {
            match second_host_address(&subnet) {
                Some(bridge_addr) => {
                    retryable(
                        self.links
                            .ensure_single_address(&self.settings.bridge_name(), &bridge_addr.to_string())
                            .await,
                    )?;
                }
                None => {
                    debug!(subnet = %subnet, "leased range too small for a bridge address, skipping");
                }
            }
        }

        let config = self
            .wg
            .build_config(&self.keys, self.settings.listen_port, &mesh);
        retryable(self.wg.apply(&self.settings.interface, &config).await)?;

        debug!(
            network = %self.settings.network,
            subnet = %subnet,
            peers = config.peers.len(),
            "tick converged"
        );
        Ok(())
    }

    /// Hold a valid lease: renew the persisted one if it is still alive,
    /// otherwise acquire afresh. The uuid is persisted before the tick
    /// proceeds so a crash never loses a granted lease.
    async fn lease_step(&mut self) -> AgentResult<LeaseInfo> {
        let lease = match self.state.lease_uuid {
            Some(uuid) => {
                let renewed = self.client.renew_lease(uuid).await?;
                if renewed.expired {
                    info!(%uuid, "held lease is gone, acquiring a new one");
                    self.acquire().await?
                } else {
                    debug!(%uuid, expires_at = renewed.expires_at, "lease renewed");
                    renewed
                }
            }
            None => self.acquire().await?,
        };
        if self.state.lease_uuid != Some(lease.uuid) {
            self.state.lease_uuid = Some(lease.uuid);
            self.state.save(&self.settings.state_file).await?;
        }
        Ok(lease)
    }

    async fn acquire(&self) -> AgentResult<LeaseInfo> {
        let lease = self
            .client
            .acquire_lease(AcquireLeaseRequest {
                network: self.settings.network.clone(),
                public_key: self.keys.public_base64(),
                peer: self.settings.public_peer(),
            })
            .await?;
        info!(uuid = %lease.uuid, address = %lease.address, "lease acquired");
        Ok(lease)
    }
}

/// Reclassify raw device errors as transient so the loop waits them out
fn retryable<T>(result: AgentResult<T>) -> AgentResult<T> {
    result.map_err(|err| match err {
        AgentError::Device(msg) => AgentError::Transient(msg),
        other => other,
    })
}
