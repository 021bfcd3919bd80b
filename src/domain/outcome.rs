//! Cycle execution outcome types.
//!
//! A `CycleOutcome` is produced once per generate+process attempt and is
//! immutable once created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which part of the cycle failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Opening the processing session failed
    SessionCreation,
    /// Workload generate or process failed
    Workload,
    /// The open session failed its health check
    HealthCheck,
    /// Restart ceiling reached
    RestartCeiling,
}

/// Details of a failed cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Outcome of a single cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleOutcome {
    pub succeeded: bool,
    pub error: Option<ErrorInfo>,
    pub timestamp: DateTime<Utc>,
}

impl CycleOutcome {
    /// A successful cycle
    pub fn success() -> Self {
        Self {
            succeeded: true,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// A failed cycle
    pub fn failure(error: ErrorInfo) -> Self {
        Self {
            succeeded: false,
            error: Some(error),
            timestamp: Utc::now(),
        }
    }

    /// Failure reason, if any
    pub fn reason(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }
}
