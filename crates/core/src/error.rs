//! Error types shared by the controller and the stores

use thiserror::Error;

/// Common result type used throughout wgfabric
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for control-plane operations
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Malformed input, such as an unparseable CIDR or a bad subnet count
    #[error("Validation error: {0}")]
    Validation(String),

    /// A network with the same name already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Unknown network or lease
    #[error("Not found: {0}")]
    NotFound(String),

    /// No subnet of the network is allocatable right now
    #[error("Capacity exhausted: {0}")]
    CapacityExhausted(String),

    /// Transaction or connection failure in the backing store; the
    /// allocator never retries these internally, callers may
    #[error("Store error: {0}")]
    Store(String),
}

impl Error {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Error::Validation(msg.into())
    }

    /// Create a new already-exists error
    pub fn already_exists<S: Into<String>>(msg: S) -> Self {
        Error::AlreadyExists(msg.into())
    }

    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Error::NotFound(msg.into())
    }

    /// Create a new capacity-exhausted error
    pub fn capacity_exhausted<S: Into<String>>(msg: S) -> Self {
        Error::CapacityExhausted(msg.into())
    }

    /// Create a new store error
    pub fn store<S: Into<String>>(msg: S) -> Self {
        Error::Store(msg.into())
    }
}

impl From<ipnetwork::IpNetworkError> for Error {
    fn from(err: ipnetwork::IpNetworkError) -> Self {
        Error::Validation(err.to_string())
    }
}
