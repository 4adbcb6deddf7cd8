// Read-only HTTP API

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;
use voice_relay::{create_router, AppState};

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_check() {
    let h = common::harness(common::source(""), None);
    let app = create_router(AppState::new(h.handle.clone()));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_status_reflects_supervisor() {
    let h = common::harness(common::source("https://media.example/live"), Some("111"));
    h.handle.start().await.unwrap();
    let app = create_router(AppState::new(h.handle.clone()));

    let (status, body) = get(app, "/stream/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "Streaming");
    assert_eq!(body["streaming"], true);
    assert_eq!(body["target"]["channel_id"], "111");
    assert_eq!(body["source"]["url"], "https://media.example/live");
    assert_eq!(body["source"]["cookie_set"], false);
}

#[tokio::test]
async fn test_info_counts_launches() {
    let h = common::harness(common::source("https://media.example/live"), Some("111"));
    h.handle.start().await.unwrap();
    let app = create_router(AppState::new(h.handle.clone()));

    let (status, body) = get(app, "/stream/info").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transcoder_launches"], 1);
    assert_eq!(body["respawns"], 0);
}

#[tokio::test]
async fn test_status_after_shutdown_is_unavailable() {
    let h = common::harness(common::source(""), None);
    h.handle.shutdown().await.unwrap();
    tokio::task::yield_now().await;
    let app = create_router(AppState::new(h.handle.clone()));

    let (status, body) = get(app, "/stream/status").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("not running"));
}

#[tokio::test]
async fn test_unknown_route() {
    let h = common::harness(common::source(""), None);
    let app = create_router(AppState::new(h.handle.clone()));

    let (status, _) = get(app, "/stream/start").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
