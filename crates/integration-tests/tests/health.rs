//! Integration tests for health checks and cross-cutting middleware.
//!
//! Run with: cargo test -p vanguard-integration-tests

use reqwest::StatusCode;
use serde_json::{Value, json};
use vanguard_integration_tests::{TestApp, TestOptions};
use vanguard_onboarding::config::RateLimitConfig;

#[tokio::test]
async fn test_liveness() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));
}

#[tokio::test]
async fn test_readiness_checks_supabase() {
    let app = TestApp::spawn().await;

    let (status, _) = app.get("/health/ready").await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/health", app.base_url))
        .header("x-request-id", "req-42")
        .send()
        .await
        .expect("Request failed");

    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("req-42")
    );
}

#[tokio::test]
async fn test_auth_endpoints_are_rate_limited() {
    let app = TestApp::spawn_with(TestOptions {
        rate_limit: RateLimitConfig {
            burst: 2,
            replenish_seconds: 60,
        },
        ..TestOptions::default()
    })
    .await;
    let body = json!({ "email": "", "code": "" });

    let (first, _) = app.post("/api/auth/verify", &body).await;
    let (second, _) = app.post("/api/auth/verify", &body).await;
    let (third, _) = app.post("/api/auth/verify", &body).await;

    assert_eq!(first, StatusCode::BAD_REQUEST);
    assert_eq!(second, StatusCode::BAD_REQUEST);
    assert_eq!(third, StatusCode::TOO_MANY_REQUESTS);

    // Health checks are not limited
    for _ in 0..5 {
        let (status, _) = app.get("/health").await;
        assert_eq!(status, StatusCode::OK);
    }
}
