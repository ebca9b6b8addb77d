//! Integration tests for the HTTP routes

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::*;

async fn get(app: Router, uri: &str) -> (StatusCode, axum::body::Bytes) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body)
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_health_check() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, _) = create_test_app(tmp.path());

    for uri in ["/health", "/healthz", "/api/health"] {
        let (status, body) = get(app.clone(), uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body, "ok");
    }
}

#[tokio::test]
async fn test_request_id_header() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, _) = create_test_app(tmp.path());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let id = response.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert_eq!(id.len(), 36);
}

#[tokio::test]
async fn test_list_voices() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, _) = create_test_app(tmp.path());
    let (status, body) = get(app, "/voices").await;

    assert_eq!(status, StatusCode::OK);
    let voices: Vec<String> = serde_json::from_slice(&body).unwrap();
    assert_eq!(voices.len(), 15);
    assert!(voices.iter().any(|v| v == "Puck"));
}

#[tokio::test]
async fn test_speakers_reflect_warm_state() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, _) = create_test_app(tmp.path());

    let (_, body) = get(app.clone(), "/speakers").await;
    let speakers: Vec<Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(speakers.len(), 2);
    assert!(speakers.iter().all(|s| s["loaded"] == json!(false)));

    let (status, warmed) = post_json(app.clone(), "/models/warm", json!({"model": GOOD_MODEL})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(warmed, json!({"model": GOOD_MODEL, "loaded": true}));

    let (_, body) = get(app, "/api/speakers").await;
    let speakers: Vec<Value> = serde_json::from_slice(&body).unwrap();
    let good = speakers.iter().find(|s| s["id"] == json!(GOOD_MODEL)).unwrap();
    assert_eq!(good["name"], json!("Test Voice"));
    assert_eq!(good["loaded"], json!(true));
}

#[tokio::test]
async fn test_warm_broken_model() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, state) = create_test_app(tmp.path());

    let (status, body) = post_json(app, "/models/warm", json!({"model": BROKEN_MODEL})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], json!(503));
    assert!(body["error"].as_str().unwrap().contains(BROKEN_MODEL));
    assert!(!state.registry.is_loaded(BROKEN_MODEL));
}

#[tokio::test]
async fn test_warm_rejects_empty_identifier() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, _) = create_test_app(tmp.path());

    let (status, body) = post_json(app, "/models/warm", json!({"model": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!(400));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, state) = create_test_app(tmp.path());
    state.metrics.local.record_chunk(12);

    let (status, body) = get(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    let metrics: Value = serde_json::from_slice(&body).unwrap();
    assert!(metrics["system"]["uptime_seconds"].is_u64());
    assert_eq!(metrics["engines"]["local"]["chunk_count"], json!(1));
    assert_eq!(metrics["engines"]["remote"]["chunk_count"], json!(0));
    assert_eq!(metrics["model_cache"]["loaded"], json!(0));
}

#[tokio::test]
async fn test_unknown_route() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, _) = create_test_app(tmp.path());
    let (status, _) = get(app, "/tts").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
