//! WireGuard key material
//!
//! Curve25519 keys in the base64 form WireGuard speaks everywhere. The
//! private key is generated on first run and persisted with owner-only
//! permissions; later runs reuse it so the node keeps its identity.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand_core::OsRng;
use tracing::info;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::error::{AgentError, AgentResult};

/// Decode and validate a base64 WireGuard public key
pub fn parse_public_key(encoded: &str) -> AgentResult<[u8; 32]> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| AgentError::Key(format!("invalid base64 key: {}", e)))?;
    bytes
        .try_into()
        .map_err(|_| AgentError::Key(format!("key {} is not 32 bytes", encoded)))
}

/// A node's WireGuard keypair
pub struct WgKeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl WgKeyPair {
    /// Generate a fresh keypair
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        WgKeyPair { secret, public }
    }

    /// Parse a keypair from a base64 private key
    pub fn from_private_base64(encoded: &str) -> AgentResult<Self> {
        let bytes = parse_public_key(encoded)?;
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Ok(WgKeyPair { secret, public })
    }

    /// The private key, base64 encoded
    pub fn private_base64(&self) -> String {
        BASE64.encode(self.secret.to_bytes())
    }

    /// The public key, base64 encoded
    pub fn public_base64(&self) -> String {
        BASE64.encode(self.public.as_bytes())
    }

    /// Load the keypair from `path`, generating and persisting a new one
    /// if the file does not exist. A present but malformed key file is
    /// an error rather than silently regenerated, since regenerating
    /// would change the node's identity.
    pub async fn load_or_generate(path: &Path) -> AgentResult<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                info!(path = %path.display(), "reading private key from disk");
                Self::from_private_base64(&contents)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "generating a new private key");
                let pair = Self::generate();
                tokio::fs::write(path, pair.private_base64()).await.map_err(|e| {
                    AgentError::Key(format!(
                        "could not write private key to {}: {}",
                        path.display(),
                        e
                    ))
                })?;

                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                        .await
                        .map_err(|e| {
                            AgentError::Key(format!(
                                "could not set permissions on {}: {}",
                                path.display(),
                                e
                            ))
                        })?;
                }

                Ok(pair)
            }
            Err(e) => Err(AgentError::Key(format!(
                "could not read private key from {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
