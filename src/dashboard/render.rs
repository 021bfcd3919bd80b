//! HTML rendering of the aggregated status.
//!
//! The page lives in `templates/dashboard.html`; askama escapes every
//! interpolated value.

use askama::Template;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::domain::{AggregatedStatus, HealthSnapshot, HealthStatus, Subsystem};
use crate::error::Result;

/// Seconds between automatic page reloads
pub const REFRESH_SECS: u32 = 30;

struct Metric<'a> {
    name: &'a str,
    value: f64,
}

struct Card<'a> {
    subsystem: Subsystem,
    status: HealthStatus,
    metrics: Vec<Metric<'a>>,
    checked: String,
}

impl<'a> Card<'a> {
    fn new(subsystem: Subsystem, snapshot: Option<&'a HealthSnapshot>) -> Self {
        let metrics = snapshot
            .and_then(|s| s.metrics.as_ref())
            .map(|m| {
                m.iter()
                    .map(|(name, value)| Metric { name, value: *value })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            subsystem,
            status: snapshot.map(|s| s.status).unwrap_or(HealthStatus::Unknown),
            metrics,
            checked: match snapshot {
                Some(s) => format!("checked {}", timestamp(&s.checked_at)),
                None => "never checked".to_string(),
            },
        }
    }
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardPage<'a> {
    refresh_secs: u32,
    cards: Vec<Card<'a>>,
    state: &'static str,
    restart_count: u32,
    log_lines: &'a [String],
    published_at: String,
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Render the dashboard page.
pub fn render_page(status: &AggregatedStatus) -> Result<String> {
    let page = DashboardPage {
        refresh_secs: REFRESH_SECS,
        cards: Subsystem::ALL
            .into_iter()
            .map(|subsystem| Card::new(subsystem, status.get(subsystem)))
            .collect(),
        state: status
            .application_state
            .map(|s| s.as_str())
            .unwrap_or("unknown"),
        restart_count: status.restart_count,
        log_lines: &status.recent_log_lines,
        published_at: timestamp(&status.published_at),
    };
    Ok(page.render()?)
}
