//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each admin endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use cache_aside::{create_router, AppState, Manager, MemoryStore};
use serde_json::Value;
use tower::ServiceExt;

// == Helper Functions ==

fn test_manager() -> Arc<Manager> {
    Arc::new(Manager::with_backend(
        Arc::new(MemoryStore::new(Duration::from_secs(300))),
        Duration::from_secs(300),
    ))
}

fn create_test_app() -> Router {
    create_router(AppState::new(test_manager()))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let body = match body {
        Some(json) => Body::from(json.to_string()),
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

// == SET / GET / DEL ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/set")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"key":"test_key","value":"test_value"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("test_key"));
    assert_eq!(json["ttl"], 300);
}

#[tokio::test]
async fn test_set_then_get_returns_json_value() {
    let app = create_test_app();

    let (status, _) = send(
        &app,
        "PUT",
        "/set",
        Some(r#"{"key":"user:2","value":{"id":2,"name":"Ada"},"ttl":60}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, "GET", "/get/user:2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["key"], "user:2");
    assert_eq!(json["value"]["name"], "Ada");
}

#[tokio::test]
async fn test_get_expired_key_is_not_found() {
    let app = create_test_app();

    send(&app, "PUT", "/set", Some(r#"{"key":"brief","value":1,"ttl":1}"#)).await;
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let (status, json) = send(&app, "GET", "/get/brief", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("brief"));
}

#[tokio::test]
async fn test_set_with_maximum_ttl_is_stored() {
    let app = create_test_app();

    let (status, _) = send(
        &app,
        "PUT",
        "/set",
        Some(r#"{"key":"k","value":1,"ttl":18446744073709551615}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, "GET", "/get/k", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["value"], 1);
}

#[tokio::test]
async fn test_set_empty_key_is_bad_request() {
    let app = create_test_app();

    let (status, json) = send(&app, "PUT", "/set", Some(r#"{"key":"","value":1}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_delete_endpoint() {
    let app = create_test_app();

    send(&app, "PUT", "/set", Some(r#"{"key":"gone","value":true}"#)).await;

    let (status, _) = send(&app, "DELETE", "/del/gone", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/get/gone", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Deleting again is still fine
    let (status, _) = send(&app, "DELETE", "/del/gone", None).await;
    assert_eq!(status, StatusCode::OK);
}

// == Counters ==

#[tokio::test]
async fn test_increment_and_decrement() {
    let app = create_test_app();

    for expected in 1..=3 {
        let (status, json) = send(&app, "POST", "/incr/visits", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["value"], expected);
    }

    let (_, json) = send(&app, "POST", "/decr/visits", None).await;
    assert_eq!(json["value"], 2);

    // Counters read back as plain JSON numbers
    let (_, json) = send(&app, "GET", "/get/visits", None).await;
    assert_eq!(json["value"], 2);
}

#[tokio::test]
async fn test_increment_over_non_integer_starts_from_zero() {
    let app = create_test_app();

    send(&app, "PUT", "/set", Some(r#"{"key":"name","value":"Ada"}"#)).await;
    let (status, json) = send(&app, "POST", "/incr/name", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["value"], 1);
}

// == Invalidate ==

#[tokio::test]
async fn test_invalidate_resource_pages() {
    let manager = test_manager();
    let app = create_router(AppState::new(manager.clone()));

    for key in ["users:page:1:size:20", "users:page:2:size:20", "orders:page:1:size:20"] {
        manager
            .set(key, &serde_json::json!([]), Duration::ZERO)
            .await
            .unwrap();
    }

    let (status, json) = send(&app, "DELETE", "/invalidate/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 2);
    assert!(manager.exists("orders:page:1:size:20").await.unwrap());
}

// == Stats / Health ==

#[tokio::test]
async fn test_stats_reflect_query_traffic() {
    let manager = test_manager();
    let app = create_router(AppState::new(manager.clone()));

    manager.monitor().record_hit(Duration::from_millis(1));
    manager.monitor().record_hit(Duration::from_millis(1));
    manager.monitor().record_miss(Duration::from_millis(1));

    let (status, json) = send(&app, "GET", "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["hits"], 2);
    assert_eq!(json["misses"], 1);
    assert!((json["hit_ratio"].as_f64().unwrap() - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(json["backend"]["backend"], "memory");

    let (status, _) = send(&app, "POST", "/stats/reset", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, json) = send(&app, "GET", "/stats", None).await;
    assert_eq!(json["hits"], 0);
}

#[tokio::test]
async fn test_health_endpoint() {
    let manager = test_manager();
    let app = create_router(AppState::new(manager.clone()));

    let (status, json) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");

    manager.close().await.unwrap();
    let (status, json) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status"], "unhealthy");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = create_test_app();

    let (status, _) = send(&app, "GET", "/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
