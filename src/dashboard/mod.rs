//! Dashboard - read-only HTTP view of the aggregated status.
//!
//! Routes:
//! - `GET /` HTML page, reloads every 30 seconds
//! - `GET /api/status` current status as JSON
//! - `GET /health` liveness, always 200

pub mod render;

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use log::{error, info};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::aggregator::StatusHandle;
use crate::domain::{AppState, HealthSnapshot, Subsystem};
use crate::error::{FailoverError, Result};

pub use render::render_page;

/// Default number of log lines returned by `/api/status`
pub const DEFAULT_API_LOG_LINES: usize = 10;

/// Shared handler state
#[derive(Debug, Clone)]
pub struct DashboardState {
    handle: StatusHandle,
    api_log_lines: usize,
}

impl DashboardState {
    pub fn new(handle: StatusHandle) -> Self {
        Self {
            handle,
            api_log_lines: DEFAULT_API_LOG_LINES,
        }
    }

    pub fn with_api_log_lines(mut self, lines: usize) -> Self {
        self.api_log_lines = lines;
        self
    }
}

type DashboardStateArc = Arc<DashboardState>;

/// `/api/status` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub snapshots: BTreeMap<Subsystem, HealthSnapshot>,
    pub recent_log_lines: Vec<String>,
    pub restart_count: u32,
    pub application_state: Option<AppState>,
    pub timestamp: DateTime<Utc>,
}

/// `/health` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/status", get(api_status))
        .route("/health", get(health))
        .with_state(Arc::new(state))
}

async fn index(State(state): State<DashboardStateArc>) -> Response {
    match render_page(&state.handle.snapshot()) {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            error!("dashboard render failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn api_status(State(state): State<DashboardStateArc>) -> Json<StatusResponse> {
    let status = state.handle.snapshot();
    Json(StatusResponse {
        snapshots: status.snapshots.clone(),
        recent_log_lines: status.tail(state.api_log_lines).to_vec(),
        restart_count: status.restart_count,
        application_state: status.application_state,
        timestamp: status.published_at,
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
    })
}

/// Serve the dashboard on `addr` until `shutdown` is cancelled.
pub async fn serve(addr: &str, state: DashboardState, shutdown: CancellationToken) -> Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| FailoverError::Config(format!("invalid bind address {:?}: {}", addr, e)))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("dashboard listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("dashboard stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::StatusAggregator;
    use crate::classifier::LogClassifier;
    use crate::journal::MemoryJournal;

    #[tokio::test]
    async fn test_serve_rejects_bad_bind_address() {
        let aggregator = StatusAggregator::new(MemoryJournal::new(), LogClassifier::default());
        let state = DashboardState::new(aggregator.handle());

        let result = serve("localhost-ish", state, CancellationToken::new()).await;
        assert!(matches!(result, Err(FailoverError::Config(_))));
    }

    #[tokio::test]
    async fn test_serve_stops_on_cancel() {
        let aggregator = StatusAggregator::new(MemoryJournal::new(), LogClassifier::default());
        let state = DashboardState::new(aggregator.handle());
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        serve("127.0.0.1:0", state, shutdown).await.unwrap();
    }
}
