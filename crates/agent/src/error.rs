//! Agent-side error taxonomy
//!
//! The loop distinguishes errors it can wait out from errors that end
//! the agent: transient RPC and device failures delay the next tick,
//! while an interface that cannot be created or owned is fatal since no
//! further progress is possible without a usable device.

use thiserror::Error;

/// Result type for agent operations
pub type AgentResult<T> = std::result::Result<T, AgentError>;

/// Errors raised by the reconciliation agent and its device layer
#[derive(Debug, Error)]
pub enum AgentError {
    /// RPC or device failure expected to heal; retried next tick
    #[error("Transient error: {0}")]
    Transient(String),

    /// The managed interface cannot be created or owned; terminates the
    /// agent
    #[error("Fatal device error: {0}")]
    FatalDevice(String),

    /// Raw failure from a device backend, classified by the caller into
    /// transient or fatal depending on the step
    #[error("Device error: {0}")]
    Device(String),

    /// Private key could not be read, parsed or written
    #[error("Key error: {0}")]
    Key(String),

    /// Durable agent state could not be written
    #[error("State error: {0}")]
    State(String),
}

impl AgentError {
    /// Create a new transient error
    pub fn transient<S: Into<String>>(msg: S) -> Self {
        AgentError::Transient(msg.into())
    }

    /// Create a new device error
    pub fn device<S: Into<String>>(msg: S) -> Self {
        AgentError::Device(msg.into())
    }

    /// Whether this error should terminate the loop instead of delaying
    /// the next tick
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AgentError::FatalDevice(_) | AgentError::Key(_) | AgentError::State(_)
        )
    }
}

impl From<wgfabric_core::Error> for AgentError {
    fn from(err: wgfabric_core::Error) -> Self {
        AgentError::Transient(err.to_string())
    }
}
