//! Integration tests for password sign-in, session restore and sign-out.
//!
//! Run with: cargo test -p vanguard-integration-tests

use reqwest::StatusCode;
use serde_json::json;
use vanguard_integration_tests::{TestApp, TestOptions};

const EMAIL: &str = "grace@vault.net";

#[tokio::test]
async fn test_unconfirmed_email_cannot_sign_in() {
    let app = TestApp::spawn().await;
    app.supabase.add_user(EMAIL, false);

    let (status, body) = app.sign_in(EMAIL).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body,
        json!({
            "success": false,
            "error": "Please verify your email address before signing in.",
        })
    );
}

#[tokio::test]
async fn test_wrong_password() {
    let app = TestApp::spawn().await;
    app.supabase.add_user(EMAIL, true);

    let (status, body) = app
        .post(
            "/api/auth/signin",
            &json!({ "email": EMAIL, "password": "wrong" }),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
}

#[tokio::test]
async fn test_sign_in_then_restore_session() {
    let app = TestApp::spawn().await;
    let id = app.supabase.add_user(EMAIL, true);

    let (status, body) = app.sign_in(EMAIL).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], id.to_string());
    assert_eq!(body["user"]["email_confirmed"], true);

    let (status, body) = app.get("/api/auth/session").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], EMAIL);
    assert_eq!(body["profile"]["id"], id.to_string());
    assert_eq!(body["profile"]["full_name"], "Test User");
    assert_eq!(app.supabase.record().refresh_calls, 0);
}

#[tokio::test]
async fn test_expiring_session_is_refreshed() {
    let app = TestApp::spawn_with(TestOptions {
        access_ttl_secs: 30,
        ..TestOptions::default()
    })
    .await;
    app.supabase.add_user(EMAIL, true);
    app.sign_in(EMAIL).await;

    let (status, _) = app.get("/api/auth/session").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.supabase.record().refresh_calls, 1);

    // The rotated refresh token was stored; the next restore refreshes again
    let (status, _) = app.get("/api/auth/session").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.supabase.record().refresh_calls, 2);
}

#[tokio::test]
async fn test_revoked_session_is_forgotten() {
    let app = TestApp::spawn().await;
    app.supabase.add_user(EMAIL, true);
    app.sign_in(EMAIL).await;
    app.supabase.revoke_all_tokens();

    let (status, body) = app.get("/api/auth/session").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body["error"],
        "Your session has expired. Please sign in again."
    );

    let (status, body) = app.get("/api/auth/session").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Not signed in");
}

#[tokio::test]
async fn test_sign_out() {
    let app = TestApp::spawn().await;
    app.supabase.add_user(EMAIL, true);
    app.sign_in(EMAIL).await;

    let (status, body) = app.post("/api/auth/signout", &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));
    assert_eq!(app.supabase.record().logout_calls, 1);

    let (status, _) = app.get("/api/auth/session").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sign_out_without_session() {
    let app = TestApp::spawn().await;

    let (status, body) = app.post("/api/auth/signout", &json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(app.supabase.record().logout_calls, 0);
}

#[tokio::test]
async fn test_sign_up_verify_then_sign_in() {
    let app = TestApp::spawn().await;
    app.sign_up(EMAIL).await;
    let code = app.webhook.last_code_for(EMAIL).expect("code email");

    let (status, _) = app.sign_in(EMAIL).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.verify(EMAIL, &code).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.sign_in(EMAIL).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["full_name"], "Ada Lovelace");
}
