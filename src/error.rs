//! Error types for Failover
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::domain::ErrorKind;

/// All error types that can occur in Failover
#[derive(Debug, Error)]
pub enum FailoverError {
    /// Processing session could not be opened
    #[error("Session creation failed: {0}")]
    SessionCreation(String),

    /// Workload generate/process step failed (including injected faults)
    #[error("Workload failure: {0}")]
    Workload(String),

    /// Open session did not pass its health check
    #[error("Health check failed: {0}")]
    HealthCheck(String),

    /// Too many restarts without a successful cycle
    #[error("Restart ceiling exceeded: {restarts}/{max} restarts")]
    RestartCeilingExceeded { restarts: u32, max: u32 },

    /// Health probe error
    #[error("Probe error: {0}")]
    Probe(String),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Dashboard template error
    #[error("Render error: {0}")]
    Render(#[from] askama::Error),
}

impl FailoverError {
    /// Only the restart ceiling ends the controller; everything else is retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FailoverError::RestartCeilingExceeded { .. })
    }

    /// Classify an error for the cycle outcome record.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FailoverError::SessionCreation(_) => ErrorKind::SessionCreation,
            FailoverError::HealthCheck(_) => ErrorKind::HealthCheck,
            FailoverError::RestartCeilingExceeded { .. } => ErrorKind::RestartCeiling,
            _ => ErrorKind::Workload,
        }
    }
}

/// Result type alias for Failover operations
pub type Result<T> = std::result::Result<T, FailoverError>;
