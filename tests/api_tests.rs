mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use common::{t0, vehicle, FakeRemote};
use duty_journey::cache::MemoryCache;
use duty_journey::config::EnvironmentConfig;
use duty_journey::dto::sync_dto::FinalizePayload;
use duty_journey::routes::create_app;
use duty_journey::services::{JourneyStore, ManualClock, PendingFinalize};
use duty_journey::state::AppState;
use duty_journey::utils::RemoteError;

fn create_test_state(config: EnvironmentConfig) -> (AppState, Arc<FakeRemote>, MemoryCache) {
    let remote = FakeRemote::new();
    let cache = MemoryCache::new();
    let (state, _worker) = AppState::new(
        config,
        Arc::new(cache.clone()),
        remote.clone(),
        Arc::new(ManualClock::new(t0())),
    );
    (state, remote, cache)
}

fn create_test_app() -> (Router, Arc<FakeRemote>) {
    let (state, remote, _cache) = create_test_state(EnvironmentConfig::default());
    (create_app(state), remote)
}

async fn cors_header(app: &Router) -> Option<String> {
    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header("origin", "https://unknown.example")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    response
        .headers()
        .get("access-control-allow-origin")
        .map(|value| value.to_str().unwrap().to_string())
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn prepare_ready_to_start(app: &Router) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/journey/D-1/vehicle",
        Some(json!({"id": "veh-1", "plate": "AB-123-CD", "model": "Renault Master"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["journey"]["status"], "vehicle_selection");

    let (status, _) = send(app, Method::POST, "/api/journey/D-1/inspection/start", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        app,
        Method::PUT,
        "/api/journey/D-1/inspection/items/tires",
        Some(json!({"passed": false, "note": "worn"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["kind"], "applied");

    let (status, body) = send(
        app,
        Method::POST,
        "/api/journey/D-1/inspection/complete",
        Some(json!({"has_problems": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["journey"]["status"], "ready_to_start");
}

#[tokio::test]
async fn test_health_check() {
    let (app, _remote) = create_test_app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_journey_flow_over_http() {
    let (app, remote) = create_test_app();
    prepare_ready_to_start(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/journey/D-1/start",
        Some(json!({"odometer": "1200", "location": "Depot"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["journey"]["status"], "on_journey");
    assert_eq!(body["journey"]["journey_id"], "J-1");
    assert_eq!(remote.start_count(), 1);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/journey/D-1/pause",
        Some(json!({"kind": "rest"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["journey"]["status"], "resting");

    let (_, body) = send(&app, Method::GET, "/api/journey/D-1", None).await;
    assert_eq!(body["status"], "resting");
    assert_eq!(body["has_problems"], true);

    let (status, body) = send(&app, Method::POST, "/api/journey/D-1/cancel", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["journey"]["status"], "inactive");
    assert_eq!(body["journey"]["active"], false);
}

#[tokio::test]
async fn test_ignored_command_is_not_an_error() {
    let (app, _remote) = create_test_app();
    let (status, body) = send(&app, Method::POST, "/api/journey/D-1/resume", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["outcome"]["kind"], "ignored");
}

#[tokio::test]
async fn test_invalid_odometer_returns_bad_request() {
    let (app, remote) = create_test_app();
    prepare_ready_to_start(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/journey/D-1/start",
        Some(json!({"odometer": "12a4"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(remote.start_count(), 0);
}

#[tokio::test]
async fn test_invalid_vehicle_request_returns_bad_request() {
    let (app, _remote) = create_test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/journey/D-1/vehicle",
        Some(json!({"id": "", "plate": "AB-123-CD"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_remote_unavailable_maps_to_service_unavailable() {
    let (app, remote) = create_test_app();
    prepare_ready_to_start(&app).await;
    remote.fail_starts(Some(RemoteError::Unavailable("connection refused".into())));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/journey/D-1/start",
        Some(json!({"odometer": "1200"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "REMOTE_UNAVAILABLE");

    let (_, body) = send(&app, Method::GET, "/api/journey/D-1", None).await;
    assert_eq!(body["status"], "ready_to_start");
}

#[tokio::test]
async fn test_drivers_are_independent() {
    let (app, _remote) = create_test_app();
    prepare_ready_to_start(&app).await;

    let (_, other) = send(&app, Method::GET, "/api/journey/D-2", None).await;
    assert_eq!(other["status"], "inactive");

    let (_, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(body["sessions"], 2);
}

#[tokio::test]
async fn test_cors_without_origins_outside_development_allows_none() {
    let config = EnvironmentConfig {
        environment: "production".to_string(),
        ..EnvironmentConfig::default()
    };
    let (state, _remote, _cache) = create_test_state(config);
    assert_eq!(cors_header(&create_app(state)).await, None);

    let (app, _remote) = create_test_app();
    assert_eq!(
        cors_header(&app).await.as_deref(),
        Some("https://unknown.example")
    );
}

#[tokio::test]
async fn test_idle_sessions_are_evicted() {
    let config = EnvironmentConfig::default();
    let (state, remote, cache) = create_test_state(config.clone());
    let shared_store = JourneyStore::new(Arc::new(cache), config.cache_config());

    // D-1: ociosa. D-2: jornada en curso. D-3: en uso. D-4: cierre pendiente.
    state.session("D-1").await;
    state
        .session("D-2")
        .await
        .select_vehicle(vehicle())
        .await
        .unwrap();
    let in_use = state.session("D-3").await;

    remote.fail_finalize(Some(RemoteError::Unavailable("timeout".into())));
    shared_store
        .enqueue_pending_finalize(
            "D-4",
            PendingFinalize {
                journey_id: "J-4".into(),
                payload: FinalizePayload {
                    end_location: "Depot".into(),
                    end_odometer: "100".into(),
                    checklist: Default::default(),
                },
                attempts: 1,
                queued_at: t0(),
                last_error: None,
            },
        )
        .await
        .unwrap();
    state.session("D-4").await;

    assert_eq!(state.session_count().await, 4);
    assert_eq!(state.evict_idle_sessions().await, 1);
    assert_eq!(state.session_count().await, 3);

    drop(in_use);
    assert_eq!(state.evict_idle_sessions().await, 1);
    assert_eq!(state.session_count().await, 2);
}
