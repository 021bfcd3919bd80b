//! Dashboard route integration tests

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use failover::aggregator::StatusAggregator;
use failover::classifier::LogClassifier;
use failover::dashboard::{DashboardState, router};
use failover::domain::{HealthSnapshot, Subsystem};
use failover::journal::MemoryJournal;
use failover::probe::StaticProbe;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

async fn get(app: &Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, content_type, body)
}

async fn ticked_dashboard() -> Router {
    let journal = Arc::new(MemoryJournal::new());
    for i in 0..14 {
        journal.push_raw(format!("2026-10-16T08:00:{:02}.000Z INFO cycle started (#{})", i, i));
    }
    journal.push_raw("2026-10-16T08:00:14.000Z ERROR cycle failed: <boom>");
    journal.push_raw("2026-10-16T08:00:14.001Z INFO restarting in 2s (attempt 1/5)");

    let mut metrics = BTreeMap::new();
    metrics.insert("workers".to_string(), 2.0);
    let aggregator = StatusAggregator::new(journal, LogClassifier::default())
        .with_probe(StaticProbe::new(HealthSnapshot::healthy(Subsystem::Master, metrics)))
        .with_probe(StaticProbe::new(HealthSnapshot::unhealthy(Subsystem::Worker)));
    aggregator.tick().await;

    router(DashboardState::new(aggregator.handle()).with_api_log_lines(10))
}

/// Integration test: the JSON status carries every subsystem and the last ten
/// log lines
#[tokio::test]
async fn test_api_status() {
    let app = ticked_dashboard().await;
    let (status, content_type, body) = get(&app, "/api/status").await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("application/json"));

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["snapshots"]["master"]["status"], "healthy");
    assert_eq!(json["snapshots"]["master"]["metrics"]["workers"], 2.0);
    assert_eq!(json["snapshots"]["worker"]["status"], "unhealthy");
    assert_eq!(json["snapshots"]["application"]["status"], "unhealthy");
    assert!(json["snapshots"]["master"]["checkedAt"].is_string());

    let lines = json["recentLogLines"].as_array().unwrap();
    assert_eq!(lines.len(), 10);
    assert!(lines[9].as_str().unwrap().contains("restarting in 2s"));

    assert_eq!(json["restartCount"], 1);
    assert_eq!(json["applicationState"], "error");
    assert!(json["timestamp"].is_string());
}

/// Integration test: liveness is independent of subsystem health
#[tokio::test]
async fn test_health_always_ok() {
    let aggregator = StatusAggregator::new(MemoryJournal::new(), LogClassifier::default());
    let app = router(DashboardState::new(aggregator.handle()));

    let (status, _, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert!(json["timestamp"].is_string());
}

/// Integration test: before the first tick everything is reported unknown
#[tokio::test]
async fn test_status_before_first_tick() {
    let aggregator = StatusAggregator::new(MemoryJournal::new(), LogClassifier::default());
    let app = router(DashboardState::new(aggregator.handle()));

    let (status, _, body) = get(&app, "/api/status").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    for name in ["master", "worker", "application"] {
        assert_eq!(json["snapshots"][name]["status"], "unknown");
    }
    assert_eq!(json["recentLogLines"].as_array().unwrap().len(), 0);
    assert!(json["applicationState"].is_null());
}

/// Integration test: the HTML page renders cards and the escaped log tail
#[tokio::test]
async fn test_index_page() {
    let app = ticked_dashboard().await;
    let (status, content_type, body) = get(&app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/html"));

    let page = String::from_utf8(body).unwrap();
    assert!(page.contains("card healthy"));
    assert!(page.contains("card unhealthy"));
    assert!(page.contains("http-equiv=\"refresh\""));
    assert!(page.contains("cycle failed: &lt;boom&gt;"));
    assert!(page.contains("<li>workers: 2</li>"));
}

/// Integration test: unknown routes are 404
#[tokio::test]
async fn test_unknown_route() {
    let aggregator = StatusAggregator::new(MemoryJournal::new(), LogClassifier::default());
    let app = router(DashboardState::new(aggregator.handle()));

    let (status, _, _) = get(&app, "/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
