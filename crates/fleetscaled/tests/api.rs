//! HTTP API tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use fleetscale_provider::MemoryFleet;
use fleetscale_queue::MemoryBroker;
use fleetscale_state::ManualClock;
use fleetscaled::{BrokerHandle, Config, Daemon, FleetHandle};

fn daemon() -> Daemon {
    let config = Config::from_toml_str(
        r#"
        [cluster]
        label = "batch"

        [autoscale]
        idle_timeout = "30s"

        [broker]
        kind = "memory"

        [provider]
        kind = "memory"
        "#,
    )
    .unwrap();
    let clock = Arc::new(ManualClock::new(0));

    Daemon::assemble(
        &config,
        BrokerHandle::new(Arc::new(MemoryBroker::new())),
        FleetHandle::new(Arc::new(MemoryFleet::new(clock.clone()))),
        clock,
    )
    .unwrap()
}

async fn get_json(router: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn healthz_reports_label() {
    let (status, json) = get_json(daemon().router(), "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["label"], "batch");
}

#[tokio::test]
async fn liveness_is_empty_at_start() {
    let (status, json) = get_json(daemon().router(), "/api/v1/liveness").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["nodes"], serde_json::json!([]));
}

#[tokio::test]
async fn liveness_lists_records_sorted_by_address() {
    let daemon = daemon();
    daemon.tracker().mark_busy("10.0.0.9", 300).await;
    daemon.tracker().mark_busy("10.0.0.2", 120).await;

    let (status, json) = get_json(daemon.router(), "/api/v1/liveness").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["data"]["nodes"],
        serde_json::json!([
            { "address": "10.0.0.2", "last_busy": 120 },
            { "address": "10.0.0.9", "last_busy": 300 },
        ])
    );
}

#[tokio::test]
async fn api_is_read_only() {
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/liveness")
        .body(Body::empty())
        .unwrap();
    let resp = daemon().router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

    let (status, _) = get_json(daemon().router(), "/api/v1/nodes").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
