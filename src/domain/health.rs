//! Health snapshot types shared by the probes, the classifier and the dashboard.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A monitored subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subsystem {
    Master,
    Worker,
    Application,
}

impl Subsystem {
    pub const ALL: [Subsystem; 3] = [Subsystem::Master, Subsystem::Worker, Subsystem::Application];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subsystem::Master => "master",
            Subsystem::Worker => "worker",
            Subsystem::Application => "application",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized health of one subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Degraded,
    Unknown,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one probe of one subsystem.
///
/// Overwritten on every probe cycle; `checked_at` makes staleness visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub subsystem: Subsystem,
    pub status: HealthStatus,
    pub checked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<BTreeMap<String, f64>>,
}

impl HealthSnapshot {
    pub fn new(subsystem: Subsystem, status: HealthStatus) -> Self {
        Self {
            subsystem,
            status,
            checked_at: Utc::now(),
            metrics: None,
        }
    }

    pub fn healthy(subsystem: Subsystem, metrics: BTreeMap<String, f64>) -> Self {
        Self::new(subsystem, HealthStatus::Healthy).with_metrics(metrics)
    }

    pub fn unhealthy(subsystem: Subsystem) -> Self {
        Self::new(subsystem, HealthStatus::Unhealthy)
    }

    pub fn unknown(subsystem: Subsystem) -> Self {
        Self::new(subsystem, HealthStatus::Unknown)
    }

    pub fn with_metrics(mut self, metrics: BTreeMap<String, f64>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.as_ref().and_then(|m| m.get(name).copied())
    }
}
