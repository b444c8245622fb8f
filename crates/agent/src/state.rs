//! Durable agent state
//!
//! The only client-side record that survives a restart: the lease uuid.
//! With it the agent resumes renewal instead of acquiring a fresh
//! subnet every time it comes up.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::{AgentError, AgentResult};

/// Persisted agent state, a small JSON record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    /// The lease this agent currently holds, if any
    pub lease_uuid: Option<Uuid>,
}

impl AgentState {
    /// Load state from `path`. A missing, unreadable or corrupt file is
    /// a fresh start: losing the record only costs a re-acquisition, so
    /// it must never keep the agent from running.
    pub async fn load(path: &Path) -> AgentState {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return AgentState::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read state file, starting fresh");
                return AgentState::default();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt state file, starting fresh");
                AgentState::default()
            }
        }
    }

    /// Write state to `path` with owner-only permissions
    pub async fn save(&self, path: &Path) -> AgentResult<()> {
        let bytes = serde_json::to_vec(self)
            .map_err(|e| AgentError::State(format!("could not serialize state: {}", e)))?;
        tokio::fs::write(path, bytes).await.map_err(|e| {
            AgentError::State(format!("could not write {}: {}", path.display(), e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| {
                    AgentError::State(format!(
                        "could not set permissions on {}: {}",
                        path.display(),
                        e
                    ))
                })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_state_is_fresh_start() {
        let dir = tempdir().unwrap();
        let state = AgentState::load(&dir.path().join("missing.state")).await;
        assert_eq!(state, AgentState::default());
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("agent.state");
        let state = AgentState {
            lease_uuid: Some(Uuid::new_v4()),
        };
        state.save(&path).await.unwrap();

        let loaded = AgentState::load(&path).await;
        assert_eq!(loaded, state);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn test_corrupt_state_starts_fresh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("agent.state");
        tokio::fs::write(&path, b"{ not json").await.unwrap();
        assert_eq!(AgentState::load(&path).await, AgentState::default());
    }

    #[tokio::test]
    async fn test_unreadable_state_starts_fresh() {
        // A directory at the state path makes the read fail outright
        let dir = tempdir().unwrap();
        assert_eq!(AgentState::load(dir.path()).await, AgentState::default());
    }
}
