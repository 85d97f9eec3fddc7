//! Integration tests for the Voice Vanguard Vault onboarding service.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p vanguard-integration-tests
//! ```
//!
//! Nothing external is needed: each test spawns the onboarding router on
//! `127.0.0.1:0` next to in-process fakes of Supabase (auth, `PostgREST`
//! tables, the `consume_verification_code` and `confirm_user_email`
//! functions) and the email webhook. The fakes record what they receive so
//! tests can assert on side effects. Like a real project, the fake Supabase
//! refuses the code table and both functions unless the caller presents
//! [`TEST_SERVICE_ROLE_KEY`].
//!
//! # Test Categories
//!
//! - `signup_verification` - Sign-up, code entry, resend
//! - `signin_session` - Password sign-in, session restore, sign-out
//! - `email_delivery` - Webhook reply interpretation
//! - `health` - Liveness and readiness

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use secrecy::SecretString;
use serde_json::{Value, json};
use uuid::Uuid;
use vanguard_core::{OperationResult, VerificationBackend, VerificationCode};
use vanguard_onboarding::config::{
    CodeConfig, CodeStoreKind, EmailConfig, EmailTransport, OnboardingConfig, RateLimitConfig,
    SupabaseConfig,
};
use vanguard_onboarding::routes;
use vanguard_onboarding::state::AppState;

/// Password accepted by every fake account created through [`TestApp`].
pub const TEST_PASSWORD: &str = "correct horse battery";

/// Anon key the service under test is configured with.
pub const TEST_ANON_KEY: &str = "test-anon-key";

/// Service-role key the fake Supabase accepts for privileged calls.
pub const TEST_SERVICE_ROLE_KEY: &str = "test-service-role-key";

const MAX_FAILED_ATTEMPTS: u32 = 5;

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");

    tokio::spawn(async move {
        let _ = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await;
    });

    addr
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// ============================================================================
// Fake Supabase
// ============================================================================

/// Account held by the fake auth server.
#[derive(Debug, Clone)]
pub struct FakeUser {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub confirmed_at: Option<String>,
}

impl FakeUser {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "aud": "authenticated",
            "role": "authenticated",
            "email": self.email,
            "email_confirmed_at": self.confirmed_at,
            "user_metadata": { "full_name": self.full_name },
        })
    }
}

/// Everything the fake Supabase knows and has been asked.
#[derive(Debug)]
pub struct SupabaseRecord {
    /// Sign-up answers with a session instead of a bare user.
    pub autoconfirm: bool,
    /// `expires_in` of issued access tokens.
    pub access_ttl_secs: i64,
    pub users: Vec<FakeUser>,
    access_tokens: HashMap<String, Uuid>,
    refresh_tokens: HashMap<String, Uuid>,
    /// `email_verification_codes` rows keyed by email.
    pub codes: HashMap<String, Value>,
    /// `user_email` argument of each `confirm_user_email` call.
    pub confirm_calls: Vec<String>,
    /// Number of `consume_verification_code` calls.
    pub consume_calls: usize,
    /// Privileged calls refused for lack of the service-role key.
    pub denied_calls: usize,
    pub refresh_calls: usize,
    pub logout_calls: usize,
}

impl Default for SupabaseRecord {
    fn default() -> Self {
        Self {
            autoconfirm: false,
            access_ttl_secs: 3600,
            users: Vec::new(),
            access_tokens: HashMap::new(),
            refresh_tokens: HashMap::new(),
            codes: HashMap::new(),
            confirm_calls: Vec::new(),
            consume_calls: 0,
            denied_calls: 0,
            refresh_calls: 0,
            logout_calls: 0,
        }
    }
}

impl SupabaseRecord {
    fn user_by_email(&self, email: &str) -> Option<&FakeUser> {
        self.users.iter().find(|u| u.email == email)
    }

    fn user_by_id(&self, id: Uuid) -> Option<&FakeUser> {
        self.users.iter().find(|u| u.id == id)
    }

    fn user_for_token(&self, headers: &HeaderMap) -> Option<&FakeUser> {
        let token = bearer(headers)?;
        let id = *self.access_tokens.get(token)?;
        self.user_by_id(id)
    }

    fn issue_tokens(&mut self, user_id: Uuid) -> Value {
        let access_token = format!("access-{}", Uuid::new_v4());
        let refresh_token = format!("refresh-{}", Uuid::new_v4());
        self.access_tokens.insert(access_token.clone(), user_id);
        self.refresh_tokens.insert(refresh_token.clone(), user_id);

        let user = self.user_by_id(user_id).map(FakeUser::to_json);
        json!({
            "access_token": access_token,
            "refresh_token": refresh_token,
            "token_type": "bearer",
            "expires_in": self.access_ttl_secs,
            "expires_at": Utc::now().timestamp() + self.access_ttl_secs,
            "user": user,
        })
    }
}

/// In-process stand-in for a Supabase project.
#[derive(Clone)]
pub struct FakeSupabase {
    pub url: String,
    record: Arc<Mutex<SupabaseRecord>>,
}

impl FakeSupabase {
    /// Start the fake on an ephemeral port.
    pub async fn start() -> Self {
        let record = Arc::new(Mutex::new(SupabaseRecord::default()));
        let router = Router::new()
            .route("/auth/v1/signup", post(fake_signup))
            .route("/auth/v1/token", post(fake_token))
            .route("/auth/v1/user", get(fake_user))
            .route("/auth/v1/logout", post(fake_logout))
            .route("/auth/v1/settings", get(fake_settings))
            .route("/rest/v1/rpc/{function}", post(fake_rpc))
            .route("/rest/v1/{table}", get(fake_select).post(fake_insert))
            .with_state(Arc::clone(&record));

        let addr = serve(router).await;
        Self {
            url: format!("http://{addr}"),
            record,
        }
    }

    /// Inspect or change the fake's state.
    pub fn record(&self) -> MutexGuard<'_, SupabaseRecord> {
        lock(&self.record)
    }

    /// Create an account directly, as if it had signed up earlier.
    pub fn add_user(&self, email: &str, confirmed: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.record().users.push(FakeUser {
            id,
            email: email.to_string(),
            password: TEST_PASSWORD.to_string(),
            full_name: Some("Test User".to_string()),
            confirmed_at: confirmed.then(|| Utc::now().to_rfc3339()),
        });
        id
    }

    /// Whether the account's email has been confirmed.
    pub fn is_confirmed(&self, email: &str) -> bool {
        self.record()
            .user_by_email(email)
            .is_some_and(|u| u.confirmed_at.is_some())
    }

    /// Pending code in the `email_verification_codes` table.
    pub fn stored_code(&self, email: &str) -> Option<String> {
        self.record()
            .codes
            .get(email)
            .and_then(|row| row.get("code"))
            .and_then(Value::as_str)
            .map(String::from)
    }

    /// Invalidate every issued token, as a server-side logout would.
    pub fn revoke_all_tokens(&self) {
        let mut record = self.record();
        record.access_tokens.clear();
        record.refresh_tokens.clear();
    }
}

type SupabaseState = State<Arc<Mutex<SupabaseRecord>>>;

fn gotrue_error(status: StatusCode, error_code: &str, msg: &str) -> Response {
    (
        status,
        Json(json!({ "code": status.as_u16(), "error_code": error_code, "msg": msg })),
    )
        .into_response()
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn is_service_role(headers: &HeaderMap) -> bool {
    let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
    apikey == Some(TEST_SERVICE_ROLE_KEY) && bearer(headers) == Some(TEST_SERVICE_ROLE_KEY)
}

/// `PostgREST`'s answer when the role lacks a grant.
fn permission_denied(record: &mut SupabaseRecord, object: &str) -> Response {
    record.denied_calls += 1;
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "code": "42501",
            "message": format!("permission denied for {object}"),
        })),
    )
        .into_response()
}

fn eq_filter<'a>(query: &'a HashMap<String, String>, column: &str) -> Option<&'a str> {
    query.get(column).and_then(|v| v.strip_prefix("eq."))
}

async fn fake_signup(State(record): SupabaseState, Json(body): Json<Value>) -> Response {
    let mut record = lock(&record);
    let email = body["email"].as_str().unwrap_or_default().to_string();
    if record.user_by_email(&email).is_some() {
        return gotrue_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "user_already_exists",
            "User already registered",
        );
    }

    let id = Uuid::new_v4();
    let autoconfirm = record.autoconfirm;
    let user = FakeUser {
        id,
        email,
        password: body["password"].as_str().unwrap_or_default().to_string(),
        full_name: body["data"]["full_name"]
            .as_str()
            .filter(|n| !n.is_empty())
            .map(String::from),
        confirmed_at: autoconfirm.then(|| Utc::now().to_rfc3339()),
    };
    let user_json = user.to_json();
    record.users.push(user);

    if autoconfirm {
        Json(record.issue_tokens(id)).into_response()
    } else {
        Json(user_json).into_response()
    }
}

async fn fake_token(
    State(record): SupabaseState,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let mut record = lock(&record);
    match query.get("grant_type").map(String::as_str) {
        Some("password") => {
            let email = body["email"].as_str().unwrap_or_default();
            let password = body["password"].as_str().unwrap_or_default();
            let Some(user) = record
                .user_by_email(email)
                .filter(|u| u.password == password)
                .cloned()
            else {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "invalid_grant",
                        "error_description": "Invalid login credentials",
                        "error_code": "invalid_credentials",
                    })),
                )
                    .into_response();
            };
            if user.confirmed_at.is_none() {
                return gotrue_error(
                    StatusCode::BAD_REQUEST,
                    "email_not_confirmed",
                    "Email not confirmed",
                );
            }
            Json(record.issue_tokens(user.id)).into_response()
        }
        Some("refresh_token") => {
            record.refresh_calls += 1;
            let token = body["refresh_token"].as_str().unwrap_or_default();
            match record.refresh_tokens.remove(token) {
                Some(user_id) => Json(record.issue_tokens(user_id)).into_response(),
                None => gotrue_error(
                    StatusCode::BAD_REQUEST,
                    "refresh_token_not_found",
                    "Invalid Refresh Token: Refresh Token Not Found",
                ),
            }
        }
        _ => gotrue_error(
            StatusCode::BAD_REQUEST,
            "validation_failed",
            "unsupported_grant_type",
        ),
    }
}

async fn fake_user(State(record): SupabaseState, headers: HeaderMap) -> Response {
    let record = lock(&record);
    record.user_for_token(&headers).map_or_else(
        || gotrue_error(StatusCode::UNAUTHORIZED, "bad_jwt", "invalid JWT"),
        |user| Json(user.to_json()).into_response(),
    )
}

async fn fake_logout(State(record): SupabaseState, headers: HeaderMap) -> StatusCode {
    let mut record = lock(&record);
    record.logout_calls += 1;
    if let Some(token) = bearer(&headers) {
        record.access_tokens.remove(token);
    }
    StatusCode::NO_CONTENT
}

async fn fake_settings(State(record): SupabaseState) -> Json<Value> {
    let record = lock(&record);
    Json(json!({
        "external": { "email": true, "google": false },
        "disable_signup": false,
        "mailer_autoconfirm": record.autoconfirm,
    }))
}

async fn fake_rpc(
    State(record): SupabaseState,
    Path(function): Path<String>,
    headers: HeaderMap,
    Json(args): Json<Value>,
) -> Response {
    let mut record = lock(&record);
    if !matches!(
        function.as_str(),
        "confirm_user_email" | "consume_verification_code"
    ) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({
                "code": "PGRST202",
                "message": format!("Could not find the function public.{function}"),
            })),
        )
            .into_response();
    }
    if !is_service_role(&headers) {
        return permission_denied(&mut record, &format!("function {function}"));
    }

    if function == "consume_verification_code" {
        record.consume_calls += 1;
        let email = args["p_email"].as_str().unwrap_or_default();
        let guess = args["p_code"].as_str().unwrap_or_default();
        let max_attempts = args["p_max_attempts"]
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(MAX_FAILED_ATTEMPTS);
        return Json(consume_code(&mut record, email, guess, max_attempts)).into_response();
    }

    let email = args["user_email"].as_str().unwrap_or_default().to_string();
    let now = Utc::now().to_rfc3339();
    if let Some(user) = record.users.iter_mut().find(|u| u.email == email) {
        user.confirmed_at = Some(now);
    }
    record.confirm_calls.push(email);
    StatusCode::NO_CONTENT.into_response()
}

/// The code check as the database function runs it, under the record lock.
fn consume_code(
    record: &mut SupabaseRecord,
    email: &str,
    guess: &str,
    max_attempts: u32,
) -> Value {
    let Some(row) = record.codes.get_mut(email) else {
        return json!({ "outcome": "not_found" });
    };

    let expired = row["expires_at"]
        .as_str()
        .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
        .is_none_or(|t| t <= Utc::now());
    let attempts = row["attempts"]
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
        + 1;

    let outcome = if expired {
        json!({ "outcome": "expired" })
    } else if row["code"] == guess {
        json!({ "outcome": "accepted" })
    } else if attempts >= max_attempts {
        json!({ "outcome": "exhausted" })
    } else {
        row["attempts"] = json!(attempts);
        return json!({ "outcome": "mismatch", "attempts": attempts });
    };
    record.codes.remove(email);
    outcome
}

fn unknown_table(table: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "code": "42P01",
            "message": format!("relation \"public.{table}\" does not exist"),
        })),
    )
        .into_response()
}

async fn fake_select(
    State(record): SupabaseState,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let mut record = lock(&record);
    match table.as_str() {
        "email_verification_codes" => {
            if !is_service_role(&headers) {
                return permission_denied(&mut record, &format!("table {table}"));
            }
            let rows: Vec<Value> = eq_filter(&query, "email")
                .and_then(|email| record.codes.get(email))
                .cloned()
                .into_iter()
                .collect();
            Json(rows).into_response()
        }
        "profiles" => {
            // Row-level security: only the owner sees their row
            let rows: Vec<Value> = record
                .user_for_token(&headers)
                .filter(|u| eq_filter(&query, "id") == Some(u.id.to_string().as_str()))
                .map(|u| json!({ "id": u.id, "full_name": u.full_name }))
                .into_iter()
                .collect();
            Json(rows).into_response()
        }
        "mock_interviews" => Json(Vec::<Value>::new()).into_response(),
        other => unknown_table(other),
    }
}

async fn fake_insert(
    State(record): SupabaseState,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(rows): Json<Value>,
) -> Response {
    if table != "email_verification_codes" {
        return unknown_table(&table);
    }
    let mut record = lock(&record);
    if !is_service_role(&headers) {
        return permission_denied(&mut record, &format!("table {table}"));
    }
    let rows = match rows {
        Value::Array(rows) => rows,
        row => vec![row],
    };
    for row in rows {
        let email = row["email"].as_str().unwrap_or_default().to_string();
        record.codes.insert(email, row);
    }
    StatusCode::CREATED.into_response()
}

// ============================================================================
// Fake email webhook
// ============================================================================

#[derive(Debug)]
struct WebhookRecord {
    payloads: Vec<Value>,
    reply_status: StatusCode,
    reply_body: String,
}

/// In-process stand-in for the email workflow.
#[derive(Clone)]
pub struct FakeWebhook {
    pub url: String,
    record: Arc<Mutex<WebhookRecord>>,
}

impl FakeWebhook {
    /// Start the fake on an ephemeral port. It answers 200 with
    /// `{"success": true}` until told otherwise.
    pub async fn start() -> Self {
        let record = Arc::new(Mutex::new(WebhookRecord {
            payloads: Vec::new(),
            reply_status: StatusCode::OK,
            reply_body: json!({ "success": true }).to_string(),
        }));
        let router = Router::new()
            .route("/webhook/send-email", post(fake_webhook))
            .with_state(Arc::clone(&record));

        let addr = serve(router).await;
        Self {
            url: format!("http://{addr}/webhook/send-email"),
            record,
        }
    }

    /// Answer every following request with `status` and `body`.
    pub fn reply_with(&self, status: u16, body: &str) {
        let mut record = lock(&self.record);
        record.reply_status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
        record.reply_body = body.to_string();
    }

    /// Every payload received so far.
    pub fn payloads(&self) -> Vec<Value> {
        lock(&self.record).payloads.clone()
    }

    /// Code in the most recent email sent to `to`.
    pub fn last_code_for(&self, to: &str) -> Option<String> {
        self.payloads()
            .iter()
            .rev()
            .find(|p| p["to"] == to)
            .and_then(|p| p["body"].as_str())
            .and_then(code_in_html)
    }
}

async fn fake_webhook(
    State(record): State<Arc<Mutex<WebhookRecord>>>,
    Json(payload): Json<Value>,
) -> Response {
    let mut record = lock(&record);
    record.payloads.push(payload);
    (record.reply_status, record.reply_body.clone()).into_response()
}

/// Find the six-digit code in a rendered verification email.
#[must_use]
pub fn code_in_html(html: &str) -> Option<String> {
    html.match_indices('>').find_map(|(i, _)| {
        let rest = html.get(i + 1..)?;
        let candidate = rest.get(..6)?;
        let closes = rest.get(6..)?.starts_with('<');
        (closes && candidate.bytes().all(|b| b.is_ascii_digit())).then(|| candidate.to_string())
    })
}

/// A code guaranteed to differ from `code` in its first digit.
#[must_use]
pub fn wrong_code(code: &str) -> String {
    code.chars()
        .enumerate()
        .map(|(i, c)| match (i, c.to_digit(10)) {
            (0, Some(d)) => char::from_digit((d + 1) % 10, 10).unwrap_or('0'),
            _ => c,
        })
        .collect()
}

// ============================================================================
// Test application
// ============================================================================

/// Options for [`TestApp::spawn_with`].
#[derive(Debug, Clone)]
pub struct TestOptions {
    pub code_store: CodeStoreKind,
    pub code_ttl: Duration,
    pub autoconfirm: bool,
    pub access_ttl_secs: i64,
    pub rate_limit: RateLimitConfig,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            code_store: CodeStoreKind::Memory,
            code_ttl: Duration::from_secs(15 * 60),
            autoconfirm: false,
            access_ttl_secs: 3600,
            rate_limit: RateLimitConfig {
                burst: 1000,
                replenish_seconds: 1,
            },
        }
    }
}

/// The onboarding service wired to fresh fakes.
pub struct TestApp {
    pub base_url: String,
    /// Client with a cookie store, so the session survives across calls.
    pub client: reqwest::Client,
    pub supabase: FakeSupabase,
    pub webhook: FakeWebhook,
}

impl TestApp {
    /// Spawn with in-memory codes and email confirmation on.
    pub async fn spawn() -> Self {
        Self::spawn_with(TestOptions::default()).await
    }

    /// Spawn with custom options.
    pub async fn spawn_with(options: TestOptions) -> Self {
        let supabase = FakeSupabase::start().await;
        {
            let mut record = supabase.record();
            record.autoconfirm = options.autoconfirm;
            record.access_ttl_secs = options.access_ttl_secs;
        }
        let webhook = FakeWebhook::start().await;

        let config = OnboardingConfig {
            host: Ipv4Addr::LOCALHOST.into(),
            port: 0,
            base_url: "http://127.0.0.1".to_string(),
            supabase: SupabaseConfig {
                url: supabase.url.clone(),
                anon_key: SecretString::from(TEST_ANON_KEY),
                service_role_key: Some(SecretString::from(TEST_SERVICE_ROLE_KEY)),
            },
            email: EmailConfig {
                transport: EmailTransport::Webhook,
                webhook_url: Some(webhook.url.clone()),
                smtp: None,
            },
            codes: CodeConfig {
                ttl: options.code_ttl,
                store: options.code_store,
            },
            rate_limit: options.rate_limit,
            http_timeout: Duration::from_secs(5),
            sentry_dsn: None,
            sentry_environment: None,
        };

        let state = AppState::new(config).expect("Failed to build application state");
        let addr = serve(routes::app(state)).await;

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: format!("http://{addr}"),
            client,
            supabase,
            webhook,
        }
    }

    /// POST JSON to `path` and return status and body.
    pub async fn post(&self, path: &str, body: &Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .expect("Request failed");
        Self::read(response).await
    }

    /// GET `path` and return status and body.
    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .expect("Request failed");
        Self::read(response).await
    }

    async fn read(response: reqwest::Response) -> (StatusCode, Value) {
        let status = StatusCode::from_u16(response.status().as_u16())
            .expect("Response status out of range");
        let text = response.text().await.expect("Failed to read body");
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        (status, body)
    }

    /// Verification backend that talks to this app over HTTP.
    #[must_use]
    pub fn backend(&self) -> ApiBackend {
        ApiBackend {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
        }
    }

    /// Sign up `email` with [`TEST_PASSWORD`].
    pub async fn sign_up(&self, email: &str) -> (StatusCode, Value) {
        self.post(
            "/api/auth/signup",
            &json!({ "email": email, "password": TEST_PASSWORD, "full_name": "Ada Lovelace" }),
        )
        .await
    }

    /// Submit a code for `email`.
    pub async fn verify(&self, email: &str, code: &str) -> (StatusCode, Value) {
        self.post("/api/auth/verify", &json!({ "email": email, "code": code }))
            .await
    }

    /// Sign in `email` with [`TEST_PASSWORD`].
    pub async fn sign_in(&self, email: &str) -> (StatusCode, Value) {
        self.post(
            "/api/auth/signin",
            &json!({ "email": email, "password": TEST_PASSWORD }),
        )
        .await
    }
}

/// [`VerificationBackend`] over the onboarding JSON API.
#[derive(Clone)]
pub struct ApiBackend {
    client: reqwest::Client,
    base_url: String,
}

impl ApiBackend {
    async fn call(&self, path: &str, body: Value) -> OperationResult {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(&body)
            .send()
            .await;
        match response {
            Ok(response) => response
                .json::<OperationResult>()
                .await
                .unwrap_or_else(|e| OperationResult::failure(e.to_string())),
            Err(e) => OperationResult::failure(e.to_string()),
        }
    }
}

impl VerificationBackend for ApiBackend {
    async fn verify_email_with_code(&self, email: &str, code: &VerificationCode) -> OperationResult {
        self.call(
            "/api/auth/verify",
            json!({ "email": email, "code": code.as_str() }),
        )
        .await
    }

    async fn resend_verification_code(&self, email: &str) -> OperationResult {
        self.call("/api/auth/resend", json!({ "email": email })).await
    }
}
