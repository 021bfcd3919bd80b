//! Aggregated status published by the status aggregator.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::health::{HealthSnapshot, HealthStatus, Subsystem};

/// Coarse application state inferred from the cycle log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    /// An error marker appears in the recent window
    Error,
    /// A success marker appears and no error marker does
    Healthy,
    /// Neither marker appears
    Running,
}

impl AppState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppState::Error => "error",
            AppState::Healthy => "healthy",
            AppState::Running => "running",
        }
    }

    /// Map onto the snapshot status scale
    pub fn health(&self) -> HealthStatus {
        match self {
            AppState::Error => HealthStatus::Unhealthy,
            AppState::Healthy => HealthStatus::Healthy,
            AppState::Running => HealthStatus::Degraded,
        }
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified health view, replaced wholesale on every aggregator tick.
///
/// `restart_count` is derived from the log tail and lags the controller's own
/// counter; it can diverge after log rotation or truncation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedStatus {
    pub snapshots: BTreeMap<Subsystem, HealthSnapshot>,
    /// Retained log tail, most recent last
    pub recent_log_lines: Vec<String>,
    pub restart_count: u32,
    pub application_state: Option<AppState>,
    pub published_at: DateTime<Utc>,
}

impl AggregatedStatus {
    /// Status before the first tick: every subsystem unknown
    pub fn initial() -> Self {
        let snapshots = Subsystem::ALL
            .iter()
            .map(|s| (*s, HealthSnapshot::unknown(*s)))
            .collect();
        Self {
            snapshots,
            recent_log_lines: Vec::new(),
            restart_count: 0,
            application_state: None,
            published_at: Utc::now(),
        }
    }

    pub fn get(&self, subsystem: Subsystem) -> Option<&HealthSnapshot> {
        self.snapshots.get(&subsystem)
    }

    pub fn status_of(&self, subsystem: Subsystem) -> HealthStatus {
        self.get(subsystem).map(|s| s.status).unwrap_or(HealthStatus::Unknown)
    }

    /// The last `n` retained log lines
    pub fn tail(&self, n: usize) -> &[String] {
        let start = self.recent_log_lines.len().saturating_sub(n);
        &self.recent_log_lines[start..]
    }

    /// True when every subsystem reports healthy
    pub fn all_healthy(&self) -> bool {
        Subsystem::ALL
            .iter()
            .all(|s| self.status_of(*s) == HealthStatus::Healthy)
    }
}

impl Default for AggregatedStatus {
    fn default() -> Self {
        Self::initial()
    }
}
