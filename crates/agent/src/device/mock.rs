//! In-memory device backend
//!
//! Records every link mutation and applied WireGuard configuration so
//! tests can assert on the state the agent converged to, including the
//! exact peer set of each tick.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AgentError, AgentResult};

use super::{DeviceConfig, LinkBackend, LinkKind, WgBackend};

/// State of one simulated link
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockLink {
    pub kind: String,
    pub mtu: Option<u32>,
    pub up: bool,
    pub addresses: Vec<String>,
    pub routes: Vec<String>,
}

/// In-memory `LinkBackend` + `WgBackend`
#[derive(Debug, Default)]
pub struct MockBackend {
    links: Mutex<HashMap<String, MockLink>>,
    applied: Mutex<Vec<(String, DeviceConfig)>>,
    forwarding: AtomicBool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a device of a foreign kind, as if something else had
    /// taken the name
    pub fn seed_link(&self, name: &str, kind: &str) {
        let mut links = self.links.lock().unwrap();
        links.insert(
            name.to_string(),
            MockLink {
                kind: kind.to_string(),
                ..Default::default()
            },
        );
    }

    /// Current state of a link, if it exists
    pub fn link(&self, name: &str) -> Option<MockLink> {
        self.links.lock().unwrap().get(name).cloned()
    }

    /// Every configuration applied so far, in order, as
    /// `(device, config)` pairs
    pub fn applied_configs(&self) -> Vec<(String, DeviceConfig)> {
        self.applied.lock().unwrap().clone()
    }

    /// Whether IPv4 forwarding was enabled
    pub fn forwarding_enabled(&self) -> bool {
        self.forwarding.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkBackend for MockBackend {
    async fn link_kind(&self, name: &str) -> AgentResult<Option<String>> {
        Ok(self.links.lock().unwrap().get(name).map(|l| l.kind.clone()))
    }

    async fn add_link(&self, name: &str, kind: LinkKind) -> AgentResult<()> {
        let mut links = self.links.lock().unwrap();
        if links.contains_key(name) {
            return Err(AgentError::device(format!("link {} already exists", name)));
        }
        links.insert(
            name.to_string(),
            MockLink {
                kind: kind.as_str().to_string(),
                ..Default::default()
            },
        );
        Ok(())
    }

    async fn delete_link(&self, name: &str) -> AgentResult<()> {
        let mut links = self.links.lock().unwrap();
        links
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| AgentError::device(format!("no such link {}", name)))
    }

    async fn set_mtu(&self, name: &str, mtu: u32) -> AgentResult<()> {
        let mut links = self.links.lock().unwrap();
        let link = links
            .get_mut(name)
            .ok_or_else(|| AgentError::device(format!("no such link {}", name)))?;
        link.mtu = Some(mtu);
        Ok(())
    }

    async fn set_up(&self, name: &str) -> AgentResult<()> {
        let mut links = self.links.lock().unwrap();
        let link = links
            .get_mut(name)
            .ok_or_else(|| AgentError::device(format!("no such link {}", name)))?;
        link.up = true;
        Ok(())
    }

    async fn list_addresses(&self, name: &str) -> AgentResult<Vec<String>> {
        let links = self.links.lock().unwrap();
        links
            .get(name)
            .map(|l| l.addresses.clone())
            .ok_or_else(|| AgentError::device(format!("no such link {}", name)))
    }

    async fn replace_address(&self, name: &str, address: &str) -> AgentResult<()> {
        let mut links = self.links.lock().unwrap();
        let link = links
            .get_mut(name)
            .ok_or_else(|| AgentError::device(format!("no such link {}", name)))?;
        if !link.addresses.iter().any(|a| a == address) {
            link.addresses.push(address.to_string());
        }
        Ok(())
    }

    async fn delete_address(&self, name: &str, address: &str) -> AgentResult<()> {
        let mut links = self.links.lock().unwrap();
        let link = links
            .get_mut(name)
            .ok_or_else(|| AgentError::device(format!("no such link {}", name)))?;
        link.addresses.retain(|a| a != address);
        Ok(())
    }

    async fn replace_route(&self, name: &str, destination: &str) -> AgentResult<()> {
        let mut links = self.links.lock().unwrap();
        let link = links
            .get_mut(name)
            .ok_or_else(|| AgentError::device(format!("no such link {}", name)))?;
        if !link.routes.iter().any(|r| r == destination) {
            link.routes.push(destination.to_string());
        }
        Ok(())
    }

    async fn enable_forwarding(&self) -> AgentResult<()> {
        self.forwarding.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl WgBackend for MockBackend {
    async fn apply_device(&self, name: &str, config: &DeviceConfig) -> AgentResult<()> {
        if self.links.lock().unwrap().get(name).is_none() {
            return Err(AgentError::device(format!("no such link {}", name)));
        }
        self.applied
            .lock()
            .unwrap()
            .push((name.to_string(), config.clone()));
        Ok(())
    }
}
