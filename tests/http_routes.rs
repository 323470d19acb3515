//! HTTP Route Tests
//!
//! Drives the full router in-process and checks the verb-to-operation
//! mapping, status codes and JSON bodies:
//! - POST creates (201, body wrapped in `result`)
//! - GET retrieves (200 / 404, `?force=true` sees deleted records)
//! - PATCH updates, DELETE soft-deletes (204), PUT restores; PATCH and PUT
//!   on an absent record answer 200 with a `null` body
//! - GET stats
//! - GET recent, with and without a count
//! - DELETE on the channel flushes
//! - errors carry `{error, code, status}`

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use merkava::config::Config;
use merkava::http_server::{HttpServer, HttpServerConfig};
use merkava::service::build_dispatcher;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

// =============================================================================
// Test Utilities
// =============================================================================

fn create_router(temp_dir: &TempDir) -> Router {
    let dispatcher = build_dispatcher(&Config::new(temp_dir.path()));
    HttpServer::new(HttpServerConfig::default(), dispatcher).router()
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .expect("Failed to build request");

    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("Router is infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");

    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Response body is not JSON")
    };
    (status, json)
}

fn ids(body: &Value) -> Vec<u64> {
    body.as_array()
        .expect("Expected an array body")
        .iter()
        .map(|e| e["id"].as_u64().expect("Envelope without id"))
        .collect()
}

// =============================================================================
// Create / Retrieve
// =============================================================================

#[tokio::test]
async fn test_create_then_retrieve() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let router = create_router(&temp_dir);

    let (status, body) = send(&router, Method::POST, "/v1/chat", Some(json!({"text": "hi"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["result"]["id"], 1);
    assert_eq!(body["result"]["data"], json!({"text": "hi"}));

    let (status, body) = send(&router, Method::GET, "/v1/chat/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["text"], "hi");
    assert!(body["created"].is_string());
}

#[tokio::test]
async fn test_retrieve_missing_is_404() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let router = create_router(&temp_dir);

    let (status, body) = send(&router, Method::GET, "/v1/chat/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_create_with_empty_body_stores_null() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let router = create_router(&temp_dir);

    let (status, body) = send(&router, Method::POST, "/v1/chat", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["result"]["data"], Value::Null);
}

// =============================================================================
// Update / Delete / Restore
// =============================================================================

#[tokio::test]
async fn test_update_merges_payload() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let router = create_router(&temp_dir);
    send(&router, Method::POST, "/v1/chat", Some(json!({"a": 1, "b": 2}))).await;

    let (status, body) = send(&router, Method::PATCH, "/v1/chat/1", Some(json!({"b": 3}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"a": 1, "b": 3}));
    assert!(body["updated"].is_string());

}

#[tokio::test]
async fn test_update_and_restore_of_absent_record_are_noop_success() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let router = create_router(&temp_dir);

    let (status, body) = send(&router, Method::PATCH, "/v1/chat/9", Some(json!({"k": "v"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);

    let (status, body) = send(&router, Method::PUT, "/v1/chat/9", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);

    // Soft-deleted records are not updated either
    send(&router, Method::POST, "/v1/chat", Some(json!({"a": 1}))).await;
    send(&router, Method::DELETE, "/v1/chat/1", None).await;
    let (status, body) = send(&router, Method::PATCH, "/v1/chat/1", Some(json!({"a": 2}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);

    let (_, body) = send(&router, Method::GET, "/v1/chat/1?force=true", None).await;
    assert_eq!(body["data"], json!({"a": 1}));
}

#[tokio::test]
async fn test_delete_force_and_restore() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let router = create_router(&temp_dir);
    send(&router, Method::POST, "/v1/chat", Some(json!("x"))).await;

    let (status, body) = send(&router, Method::DELETE, "/v1/chat/1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&router, Method::GET, "/v1/chat/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&router, Method::GET, "/v1/chat/1?force=true", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_deleted"], true);

    let (status, body) = send(&router, Method::PUT, "/v1/chat/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["was_restored"], true);

    let (status, _) = send(&router, Method::GET, "/v1/chat/1", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_delete_missing_record_is_still_204() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let router = create_router(&temp_dir);

    let (status, _) = send(&router, Method::DELETE, "/v1/chat/7", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

// =============================================================================
// Recent
// =============================================================================

#[tokio::test]
async fn test_recent_skips_deleted_and_orders_descending() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let router = create_router(&temp_dir);
    for n in 1..=5 {
        send(&router, Method::POST, "/v1/chat", Some(json!({"n": n}))).await;
    }
    send(&router, Method::DELETE, "/v1/chat/3", None).await;

    let (status, body) = send(&router, Method::GET, "/v1/chat/recent/3", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![5, 4, 2]);

    let (_, body) = send(&router, Method::GET, "/v1/chat/recent", None).await;
    assert_eq!(ids(&body), vec![5, 4, 2, 1]);
}

#[tokio::test]
async fn test_recent_rejects_non_numeric_count() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let router = create_router(&temp_dir);

    let (status, body) = send(&router, Method::GET, "/v1/chat/recent/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MRKV_INVALID_INPUT");
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_stats_reports_entries_and_next_id() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let router = create_router(&temp_dir);
    for n in 1..=3 {
        send(&router, Method::POST, "/v1/chat", Some(json!(n))).await;
    }
    send(&router, Method::DELETE, "/v1/chat/2", None).await;

    let (status, body) = send(&router, Method::GET, "/v1/chat/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"entries": 3, "next_id": 4}));
}

// =============================================================================
// Flush
// =============================================================================

#[tokio::test]
async fn test_flush_then_channel_starts_fresh() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let router = create_router(&temp_dir);
    for n in 0..3 {
        send(&router, Method::POST, "/v1/chat", Some(json!(n))).await;
    }

    let (status, _) = send(&router, Method::DELETE, "/v1/chat", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!temp_dir.path().join("chat").exists());

    let (_, body) = send(&router, Method::GET, "/v1/chat/recent/10", None).await;
    assert_eq!(body, json!([]));

    let (status, body) = send(&router, Method::POST, "/v1/chat", Some(json!("again"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["result"]["id"], 1);
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_bad_identifier_and_body_are_400() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let router = create_router(&temp_dir);

    let (status, body) = send(&router, Method::GET, "/v1/chat/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MRKV_INVALID_ARGUMENT");
    assert!(body["error"].is_string());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/v1/chat")
        .body(Body::from("{not json"))
        .expect("Failed to build request");
    let response = router.clone().oneshot(request).await.expect("Router is infallible");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_channel_name_is_400() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let router = create_router(&temp_dir);

    let (status, body) = send(&router, Method::POST, "/v1/a%20b", Some(json!(1))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MRKV_INVALID_INPUT");
}

// =============================================================================
// Observability
// =============================================================================

#[tokio::test]
async fn test_health_and_metrics() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let router = create_router(&temp_dir);

    let (status, body) = send(&router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    send(&router, Method::POST, "/v1/chat", Some(json!(1))).await;
    send(&router, Method::GET, "/v1/chat/abc", None).await;

    let (status, body) = send(&router, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["counters"]["records_created"], 1);
    assert_eq!(body["open_channels"], json!(["chat"]));
    assert!(body["cache"]["capacity"].as_u64().unwrap() > 0);
}
