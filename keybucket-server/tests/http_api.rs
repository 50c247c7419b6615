use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use keybucket::ManualClock;
use keybucket_server::config::{BackendType, LimiterConfig};
use keybucket_server::limiter::Limiter;
use keybucket_server::transport::http::{AppState, router};
use keybucket_server::types::ConsumeResponse;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn app(backend: BackendType, capacity: u64, refill_interval_ms: u64) -> (ManualClock, Router) {
    let clock = ManualClock::new(0);
    let config = LimiterConfig {
        backend,
        capacity,
        refill_interval_ms,
        shards: None,
        eviction_interval: 0,
    };
    let limiter = Limiter::with_clock(&config, clock.clone()).unwrap();
    let state = Arc::new(AppState::new(limiter, 16));
    (clock, router(state))
}

async fn post_consume(app: &Router, body: Value) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri("/consume")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn decision(response: Response) -> ConsumeResponse {
    serde_json::from_str(&body_text(response).await).unwrap()
}

#[tokio::test]
async fn test_burst_then_429() {
    for backend in [BackendType::Sharded, BackendType::Dashmap] {
        let (clock, app) = app(backend, 2, 1500);

        for remaining in [1, 0] {
            let response = post_consume(&app, json!({"key": "10.0.0.1"})).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()["x-ratelimit-limit"], "2");
            assert!(response.headers().get(header::RETRY_AFTER).is_none());
            assert_eq!(decision(response).await.remaining, remaining);
        }

        let response = post_consume(&app, json!({"key": "10.0.0.1"})).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        // 1500ms rounds up to two seconds
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
        let body = decision(response).await;
        assert!(!body.allowed);
        assert_eq!(body.retry_after_ms, 1500);
        assert_eq!(body.reset_after_ms, 3000);

        clock.advance_millis(1500);
        let response = post_consume(&app, json!({"key": "10.0.0.1"})).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_keys_are_independent() {
    let (_clock, app) = app(BackendType::Sharded, 1, 1000);

    assert_eq!(
        post_consume(&app, json!({"key": "a"})).await.status(),
        StatusCode::OK
    );
    assert_eq!(
        post_consume(&app, json!({"key": "a"})).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(
        post_consume(&app, json!({"key": "b"})).await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_quantity() {
    let (_clock, app) = app(BackendType::Sharded, 5, 100);

    let response = post_consume(&app, json!({"key": "bulk", "quantity": 4})).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(decision(response).await.remaining, 1);

    let response = post_consume(&app, json!({"key": "bulk", "quantity": 2})).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    let body = decision(response).await;
    assert_eq!(body.remaining, 1);
    assert_eq!(body.retry_after_ms, 100);
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let (_clock, app) = app(BackendType::Sharded, 5, 100);

    let response = post_consume(&app, json!({"key": ""})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_consume(&app, json!({"key": "k".repeat(17)})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_consume(&app, json!({"key": "k", "quantity": 6})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(body["error"].as_str().unwrap().contains("capacity"));

    let response = post_consume(&app, json!({"quantity": 1})).await;
    assert!(response.status().is_client_error());

    // None of the above created a bucket
    let metrics = body_text(get(&app, "/metrics").await).await;
    assert!(metrics.contains("keybucket_tracked_keys 0\n"));
    assert!(metrics.contains("keybucket_requests_rejected 3\n"));
}

#[tokio::test]
async fn test_health() {
    let (_clock, app) = app(BackendType::Sharded, 1, 1000);

    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn test_metrics() {
    let (_clock, app) = app(BackendType::Dashmap, 1, 1000);

    post_consume(&app, json!({"key": "a"})).await;
    post_consume(&app, json!({"key": "a"})).await;
    post_consume(&app, json!({"key": "b"})).await;

    let response = get(&app, "/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );

    let metrics = body_text(response).await;
    assert!(metrics.contains("keybucket_requests_total 3\n"));
    assert!(metrics.contains("keybucket_requests_allowed 2\n"));
    assert!(metrics.contains("keybucket_requests_denied 1\n"));
    assert!(metrics.contains("keybucket_tracked_keys 2\n"));
}
