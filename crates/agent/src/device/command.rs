//! Backend driving the real system through `ip` and `wg`
//!
//! Requires CAP_NET_ADMIN. Peer application uses `wg syncconf`, which
//! synchronizes the device to the given file and drops peers the file
//! does not mention: exactly the full-replace semantics the agent
//! relies on for self-healing.

use std::io::Write as _;
use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{AgentError, AgentResult};

use super::{DeviceConfig, LinkBackend, LinkKind, WgBackend};

/// Shells out to the `ip` and `wg` tools
#[derive(Debug, Clone, Default)]
pub struct CommandBackend;

impl CommandBackend {
    pub fn new() -> Self {
        CommandBackend
    }

    async fn run(program: &str, args: &[&str]) -> AgentResult<String> {
        debug!(program, ?args, "running device command");
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| AgentError::device(format!("could not run {}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AgentError::device(format!(
                "{} {} failed: {}",
                program,
                args.join(" "),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn render_config(config: &DeviceConfig) -> String {
        let mut rendered = String::new();
        rendered.push_str("[Interface]\n");
        rendered.push_str(&format!("PrivateKey = {}\n", config.private_key));
        rendered.push_str(&format!("ListenPort = {}\n", config.listen_port));

        for peer in &config.peers {
            rendered.push_str("\n[Peer]\n");
            rendered.push_str(&format!("PublicKey = {}\n", peer.public_key));
            if !peer.allowed_ips.is_empty() {
                rendered.push_str(&format!("AllowedIPs = {}\n", peer.allowed_ips.join(", ")));
            }
            if let Some(endpoint) = peer.endpoint {
                rendered.push_str(&format!("Endpoint = {}\n", endpoint));
            }
            if peer.keepalive_secs > 0 {
                rendered.push_str(&format!(
                    "PersistentKeepalive = {}\n",
                    peer.keepalive_secs
                ));
            }
        }
        rendered
    }
}

#[async_trait]
impl LinkBackend for CommandBackend {
    async fn link_kind(&self, name: &str) -> AgentResult<Option<String>> {
        let sys_path = Path::new("/sys/class/net").join(name);
        if !sys_path.exists() {
            return Ok(None);
        }

        // DEVTYPE identifies wireguard and bridge devices; plain
        // ethernet has no DEVTYPE line at all
        let uevent = tokio::fs::read_to_string(sys_path.join("uevent"))
            .await
            .map_err(|e| AgentError::device(format!("could not read uevent for {}: {}", name, e)))?;
        let kind = uevent
            .lines()
            .find_map(|line| line.strip_prefix("DEVTYPE="))
            .unwrap_or("unknown")
            .to_string();
        Ok(Some(kind))
    }

    async fn add_link(&self, name: &str, kind: LinkKind) -> AgentResult<()> {
        Self::run("ip", &["link", "add", name, "type", kind.as_str()]).await?;
        Ok(())
    }

    async fn delete_link(&self, name: &str) -> AgentResult<()> {
        Self::run("ip", &["link", "delete", name]).await?;
        Ok(())
    }

    async fn set_mtu(&self, name: &str, mtu: u32) -> AgentResult<()> {
        Self::run("ip", &["link", "set", name, "mtu", &mtu.to_string()]).await?;
        Ok(())
    }

    async fn set_up(&self, name: &str) -> AgentResult<()> {
        Self::run("ip", &["link", "set", name, "up"]).await?;
        Ok(())
    }

    async fn list_addresses(&self, name: &str) -> AgentResult<Vec<String>> {
        let output = Self::run("ip", &["-o", "-4", "addr", "show", "dev", name]).await?;
        let mut addresses = Vec::new();
        for line in output.lines() {
            let mut fields = line.split_whitespace();
            while let Some(field) = fields.next() {
                if field == "inet" {
                    if let Some(address) = fields.next() {
                        addresses.push(address.to_string());
                    }
                    break;
                }
            }
        }
        Ok(addresses)
    }

    async fn replace_address(&self, name: &str, address: &str) -> AgentResult<()> {
        Self::run("ip", &["address", "replace", address, "dev", name]).await?;
        Ok(())
    }

    async fn delete_address(&self, name: &str, address: &str) -> AgentResult<()> {
        Self::run("ip", &["address", "del", address, "dev", name]).await?;
        Ok(())
    }

    async fn replace_route(&self, name: &str, destination: &str) -> AgentResult<()> {
        Self::run(
            "ip",
            &["route", "replace", destination, "dev", name, "scope", "link"],
        )
        .await?;
        Ok(())
    }

    async fn enable_forwarding(&self) -> AgentResult<()> {
        tokio::fs::write("/proc/sys/net/ipv4/ip_forward", "1")
            .await
            .map_err(|e| AgentError::device(format!("could not enable ip_forward: {}", e)))
    }
}

#[async_trait]
impl WgBackend for CommandBackend {
    async fn apply_device(&self, name: &str, config: &DeviceConfig) -> AgentResult<()> {
        // The config file carries the private key, so it gets owner-only
        // permissions before anything is written to it
        let mut file = tempfile::NamedTempFile::new()
            .map_err(|e| AgentError::device(format!("could not create config file: {}", e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o600))
                .map_err(|e| {
                    AgentError::device(format!("could not set config permissions: {}", e))
                })?;
        }

        file.write_all(Self::render_config(config).as_bytes())
            .map_err(|e| AgentError::device(format!("could not write config file: {}", e)))?;
        file.flush()
            .map_err(|e| AgentError::device(format!("could not flush config file: {}", e)))?;

        let path = file.path().to_string_lossy().to_string();
        Self::run("wg", &["syncconf", name, &path]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DevicePeer;

    #[test]
    fn test_render_config() {
        let config = DeviceConfig {
            private_key: "PRIV".to_string(),
            listen_port: 6666,
            peers: vec![
                DevicePeer {
                    public_key: "PEER1".to_string(),
                    allowed_ips: vec!["10.0.0.64/26".to_string()],
                    endpoint: Some("203.0.113.7:6666".parse().unwrap()),
                    keepalive_secs: 5,
                },
                DevicePeer {
                    public_key: "PEER2".to_string(),
                    allowed_ips: vec!["10.0.0.128/26".to_string()],
                    endpoint: None,
                    keepalive_secs: 5,
                },
            ],
        };

        let rendered = CommandBackend::render_config(&config);
        assert!(rendered.starts_with("[Interface]\nPrivateKey = PRIV\nListenPort = 6666\n"));
        assert!(rendered.contains("[Peer]\nPublicKey = PEER1\nAllowedIPs = 10.0.0.64/26\nEndpoint = 203.0.113.7:6666\nPersistentKeepalive = 5\n"));
        assert!(rendered.contains("PublicKey = PEER2\nAllowedIPs = 10.0.0.128/26\nPersistentKeepalive = 5\n"));
    }
}
