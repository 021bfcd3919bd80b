//! Marker tokens recognised in the cycle log.

use serde::{Deserialize, Serialize};

/// Case-sensitive literals the classifier looks for in log lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogMarkers {
    pub error: Vec<String>,
    pub success: Vec<String>,
    pub restart: Vec<String>,
}

impl Default for LogMarkers {
    fn default() -> Self {
        Self {
            error: vec![
                "ERROR".to_string(),
                "CRITICAL".to_string(),
                "cycle failed".to_string(),
                "max restarts reached".to_string(),
            ],
            success: vec!["cycle succeeded".to_string(), "SUCCESS".to_string(), "COMPLETED".to_string()],
            restart: vec!["restarting in".to_string()],
        }
    }
}

impl LogMarkers {
    pub fn is_error(&self, line: &str) -> bool {
        contains_any(line, &self.error)
    }

    pub fn is_success(&self, line: &str) -> bool {
        contains_any(line, &self.success)
    }

    pub fn is_restart(&self, line: &str) -> bool {
        contains_any(line, &self.restart)
    }
}

fn contains_any(line: &str, markers: &[String]) -> bool {
    markers.iter().any(|m| !m.is_empty() && line.contains(m.as_str()))
}
