//! Integration tests for sign-up and email verification by code.
//!
//! Each test spawns the onboarding service against in-process fakes.
//!
//! Run with: cargo test -p vanguard-integration-tests

use std::cell::Cell;
use std::time::Duration;

use futures::future::join_all;
use reqwest::StatusCode;
use secrecy::SecretString;
use serde_json::{Value, json};
use vanguard_core::{CodeEntry, VerificationPrompt};
use vanguard_integration_tests::{
    TEST_ANON_KEY, TEST_SERVICE_ROLE_KEY, TestApp, TestOptions, wrong_code,
};
use vanguard_onboarding::codes::{CODES_TABLE, CONSUME_CODE_FUNCTION, MAX_FAILED_ATTEMPTS};
use vanguard_onboarding::config::{CodeStoreKind, SupabaseConfig};
use vanguard_onboarding::services::auth::CONFIRM_EMAIL_FUNCTION;
use vanguard_onboarding::supabase::{Filter, SupabaseClient};

const EMAIL: &str = "ada@vault.net";

async fn signed_up(app: &TestApp) -> String {
    let (status, body) = app.sign_up(EMAIL).await;
    assert_eq!(status, StatusCode::OK, "sign-up failed: {body}");
    app.webhook
        .last_code_for(EMAIL)
        .expect("Verification email should carry a code")
}

// ============================================================================
// Sign-up
// ============================================================================

#[tokio::test]
async fn test_signup_requires_verification() {
    let app = TestApp::spawn().await;

    let (status, body) = app.sign_up(EMAIL).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["verification_required"], true);
    assert_eq!(body["email"], EMAIL);

    // One email, addressed to the new user, naming them
    let payloads = app.webhook.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0]["to"], EMAIL);
    assert!(payloads[0]["subject"].as_str().is_some_and(|s| !s.is_empty()));
    assert!(
        payloads[0]["body"]
            .as_str()
            .is_some_and(|b| b.contains("Ada Lovelace"))
    );

    // No session until the code is entered
    let (status, body) = app.get("/api/auth/session").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert!(!app.supabase.is_confirmed(EMAIL));
}

#[tokio::test]
async fn test_signup_with_autoconfirm_signs_in() {
    let app = TestApp::spawn_with(TestOptions {
        autoconfirm: true,
        ..TestOptions::default()
    })
    .await;

    let (status, body) = app.sign_up(EMAIL).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verification_required"], false);
    assert_eq!(body["user"]["email"], EMAIL);
    assert!(app.webhook.payloads().is_empty());

    let (status, body) = app.get("/api/auth/session").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email_confirmed"], true);
}

#[tokio::test]
async fn test_duplicate_signup_shows_remote_message() {
    let app = TestApp::spawn().await;
    signed_up(&app).await;

    let (status, body) = app.sign_up(EMAIL).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body,
        json!({ "success": false, "error": "User already registered" })
    );
}

#[tokio::test]
async fn test_invalid_email_is_rejected_locally() {
    let app = TestApp::spawn().await;

    let (status, body) = app.sign_up("not-an-email").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Please enter a valid email address");
    assert!(app.supabase.record().users.is_empty());
}

// ============================================================================
// Code entry
// ============================================================================

#[tokio::test]
async fn test_wrong_code_clears_boxes_then_correct_code_confirms() {
    let app = TestApp::spawn().await;
    let code = signed_up(&app).await;

    let mut prompt = VerificationPrompt::new(app.backend(), EMAIL);
    let navigated = Cell::new(0);

    assert!(prompt.entry_mut().paste(&wrong_code(&code)));
    assert!(!prompt.submit(|| navigated.set(navigated.get() + 1)).await);
    assert_eq!(
        prompt.entry().error(),
        Some("Invalid verification code. Please try again.")
    );
    assert_eq!(prompt.entry().value(), "");
    assert_eq!(prompt.entry().focus(), 0);
    assert!(app.supabase.record().confirm_calls.is_empty());

    assert!(prompt.entry_mut().paste(&code));
    assert!(prompt.submit(|| navigated.set(navigated.get() + 1)).await);
    assert_eq!(navigated.get(), 1);
    assert_eq!(prompt.entry().error(), None);

    assert_eq!(app.supabase.record().confirm_calls, vec![EMAIL.to_string()]);
    assert!(app.supabase.is_confirmed(EMAIL));
}

#[tokio::test]
async fn test_code_is_single_use() {
    let app = TestApp::spawn().await;
    let code = signed_up(&app).await;

    let (status, body) = app.verify(EMAIL, &code).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (status, body) = app.verify(EMAIL, &code).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "No verification code found. Please request a new code."
    );
    assert_eq!(app.supabase.record().confirm_calls.len(), 1);
}

#[tokio::test]
async fn test_local_validation_never_reaches_store() {
    let app = TestApp::spawn().await;
    let code = signed_up(&app).await;

    let (status, body) = app.verify(EMAIL, "123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Please enter all 6 digits");

    let (status, body) = app.verify("", &code).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Email address is missing. Please sign up again."
    );

    // The real code is still good: nothing above counted as an attempt
    let (status, _) = app.verify(EMAIL, &code).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_incomplete_entry_is_not_submitted() {
    let app = TestApp::spawn().await;
    signed_up(&app).await;

    let mut prompt = VerificationPrompt::new(app.backend(), EMAIL);
    assert!(prompt.entry_mut().input(0, "4"));

    assert!(!prompt.submit(|| {}).await);
    assert_eq!(prompt.entry().error(), Some("Please enter all 6 digits"));
    assert_eq!(prompt.entry().value(), "4");
}

#[tokio::test]
async fn test_failed_attempts_are_limited() {
    let app = TestApp::spawn().await;
    let code = signed_up(&app).await;
    let wrong = wrong_code(&code);

    for _ in 0..4 {
        let (_, body) = app.verify(EMAIL, &wrong).await;
        assert_eq!(body["error"], "Invalid verification code. Please try again.");
    }
    let (_, body) = app.verify(EMAIL, &wrong).await;
    assert_eq!(
        body["error"],
        "Too many incorrect attempts. Please request a new code."
    );

    let (status, _) = app.verify(EMAIL, &code).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!app.supabase.is_confirmed(EMAIL));
}

// ============================================================================
// Resend
// ============================================================================

#[tokio::test]
async fn test_resend_supersedes_previous_code() {
    let app = TestApp::spawn().await;
    let first = signed_up(&app).await;

    let mut prompt =
        VerificationPrompt::with_entry(app.backend(), EMAIL, CodeEntry::with_resend_cooldown(60));
    assert!(prompt.entry_mut().input(0, "1"));
    assert!(prompt.resend().await);

    // Success shows no message, clears the boxes and starts the cooldown
    assert_eq!(prompt.entry().error(), None);
    assert_eq!(prompt.entry().value(), "");
    assert_eq!(prompt.entry().cooldown_remaining(), 60);
    assert!(!prompt.resend().await);
    assert_eq!(app.webhook.payloads().len(), 2);

    let second = app.webhook.last_code_for(EMAIL).expect("second code");
    if second != first {
        let (status, _) = app.verify(EMAIL, &first).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    let (status, _) = app.verify(EMAIL, &second).await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// Table-backed codes
// ============================================================================

#[tokio::test]
async fn test_codes_table_round_trip() {
    let app = TestApp::spawn_with(TestOptions {
        code_store: CodeStoreKind::Supabase,
        ..TestOptions::default()
    })
    .await;
    let code = signed_up(&app).await;

    assert_eq!(app.supabase.stored_code(EMAIL), Some(code.clone()));

    let (status, _) = app.verify(EMAIL, &wrong_code(&code)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.supabase.record().codes[EMAIL]["attempts"], 1);

    let (status, _) = app.verify(EMAIL, &code).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.supabase.stored_code(EMAIL), None);
    assert!(app.supabase.is_confirmed(EMAIL));

    let record = app.supabase.record();
    assert_eq!(record.consume_calls, 2);
    assert_eq!(record.denied_calls, 0);
}

#[tokio::test]
async fn test_anon_key_cannot_touch_codes_or_confirm() {
    let app = TestApp::spawn_with(TestOptions {
        code_store: CodeStoreKind::Supabase,
        ..TestOptions::default()
    })
    .await;
    let code = signed_up(&app).await;

    // What a browser holding the public anon key could send
    let anon = SupabaseClient::new(
        &SupabaseConfig {
            url: app.supabase.url.clone(),
            anon_key: SecretString::from(TEST_ANON_KEY),
            service_role_key: Some(SecretString::from(TEST_SERVICE_ROLE_KEY)),
        },
        Duration::from_secs(5),
    )
    .expect("client");

    let err = anon
        .select::<Value>(CODES_TABLE, &[Filter::eq("email", EMAIL)], None)
        .await
        .expect_err("anon read of the code table");
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.code(), Some("42501"));

    let err = anon
        .rpc(
            CONSUME_CODE_FUNCTION,
            &json!({ "p_email": EMAIL, "p_code": code, "p_max_attempts": MAX_FAILED_ATTEMPTS }),
        )
        .await
        .expect_err("anon consume");
    assert_eq!(err.status(), Some(401));

    let err = anon
        .rpc(CONFIRM_EMAIL_FUNCTION, &json!({ "user_email": EMAIL }))
        .await
        .expect_err("anon confirm");
    assert_eq!(err.status(), Some(401));

    assert_eq!(app.supabase.record().denied_calls, 3);
    assert_eq!(app.supabase.stored_code(EMAIL), Some(code.clone()));
    assert!(!app.supabase.is_confirmed(EMAIL));

    // The same calls through the service-role view go through
    let admin = anon.service_role().expect("service role view");
    let rows = admin
        .select::<Value>(CODES_TABLE, &[Filter::eq("email", EMAIL)], None)
        .await
        .expect("service role read");
    assert_eq!(rows.len(), 1);

    let (status, _) = app.verify(EMAIL, &code).await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.supabase.is_confirmed(EMAIL));
    assert_eq!(app.supabase.record().denied_calls, 3);
}

// ============================================================================
// Concurrent code entry
// ============================================================================

const CONCURRENT_GUESSES: usize = 8;

async fn spawn_with_store(code_store: CodeStoreKind) -> TestApp {
    TestApp::spawn_with(TestOptions {
        code_store,
        ..TestOptions::default()
    })
    .await
}

async fn verify_concurrently(app: &TestApp, code: &str) -> Vec<(StatusCode, Value)> {
    join_all((0..CONCURRENT_GUESSES).map(|_| app.verify(EMAIL, code))).await
}

fn count_errors(results: &[(StatusCode, Value)], message: &str) -> usize {
    results.iter().filter(|(_, body)| body["error"] == message).count()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_correct_code_confirms_once() {
    for store in [CodeStoreKind::Supabase, CodeStoreKind::Memory] {
        let app = spawn_with_store(store).await;
        let code = signed_up(&app).await;

        let results = verify_concurrently(&app, &code).await;

        let accepted = results
            .iter()
            .filter(|(status, _)| *status == StatusCode::OK)
            .count();
        assert_eq!(accepted, 1, "{store:?}: {results:?}");
        assert_eq!(
            count_errors(
                &results,
                "No verification code found. Please request a new code."
            ),
            CONCURRENT_GUESSES - 1,
            "{store:?}"
        );
        assert_eq!(
            app.supabase.record().confirm_calls,
            vec![EMAIL.to_string()],
            "{store:?}"
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_wrong_codes_are_all_counted() {
    for store in [CodeStoreKind::Supabase, CodeStoreKind::Memory] {
        let app = spawn_with_store(store).await;
        let code = signed_up(&app).await;

        let results = verify_concurrently(&app, &wrong_code(&code)).await;

        let limit = usize::try_from(MAX_FAILED_ATTEMPTS).expect("small constant");
        assert_eq!(
            count_errors(&results, "Invalid verification code. Please try again."),
            limit - 1,
            "{store:?}: {results:?}"
        );
        assert_eq!(
            count_errors(
                &results,
                "Too many incorrect attempts. Please request a new code."
            ),
            1,
            "{store:?}"
        );
        assert_eq!(
            count_errors(
                &results,
                "No verification code found. Please request a new code."
            ),
            CONCURRENT_GUESSES - limit,
            "{store:?}"
        );

        // The correct code died with the last counted guess
        let (status, _) = app.verify(EMAIL, &code).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!app.supabase.is_confirmed(EMAIL));
        assert!(app.supabase.record().confirm_calls.is_empty());
    }
}
