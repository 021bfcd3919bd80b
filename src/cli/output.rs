//! Terminal rendering for `failover check`.

use colored::*;

use failover::domain::{AggregatedStatus, HealthStatus, Subsystem};

fn paint(status: HealthStatus) -> ColoredString {
    match status {
        HealthStatus::Healthy => status.as_str().green().bold(),
        HealthStatus::Unhealthy => status.as_str().red().bold(),
        HealthStatus::Degraded => status.as_str().yellow().bold(),
        HealthStatus::Unknown => status.as_str().dimmed(),
    }
}

/// Human-readable summary of one aggregated status
pub fn summary(status: &AggregatedStatus, log_lines: usize) -> String {
    let mut out = String::new();

    for subsystem in Subsystem::ALL {
        let snapshot = status.get(subsystem);
        let state = snapshot.map(|s| s.status).unwrap_or(HealthStatus::Unknown);
        out.push_str(&format!("{:<12} {}", subsystem.as_str().cyan(), paint(state)));

        if let Some(metrics) = snapshot.and_then(|s| s.metrics.as_ref()) {
            let rendered: Vec<String> = metrics.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            out.push_str(&format!("  {}", rendered.join(" ").dimmed()));
        }
        out.push('\n');
    }

    let app_state = status.application_state.map(|s| s.as_str()).unwrap_or("unknown");
    out.push_str(&format!(
        "{:<12} {} (restarts: {})\n",
        "state".cyan(),
        app_state,
        status.restart_count
    ));

    let tail = status.tail(log_lines);
    if !tail.is_empty() {
        out.push_str(&format!("\n{}\n", "Recent log:".bold()));
        for line in tail {
            out.push_str(&format!("  {}\n", line));
        }
    }
    out
}
