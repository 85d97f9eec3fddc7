//! Authentication API handlers.
//!
//! Every handler answers with `{"success": bool, ...}`. Failures go through
//! [`AppError`], which picks the status code and the user-facing message.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_sessions::Session;
use vanguard_core::OperationResult;

use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalSession, RequireSession, clear_auth_session, set_auth_session};
use crate::models::UserSummary;
use crate::services::auth::{AuthError, SignUpOutcome};
use crate::state::AppState;
use crate::supabase::{AuthSession, Filter};

/// Table holding one profile row per user, keyed by `id`.
const PROFILES_TABLE: &str = "profiles";

// =============================================================================
// Request / Response Types
// =============================================================================

/// Sign-up request body.
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub full_name: Option<String>,
}

/// Sign-up response body.
#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub success: bool,
    /// True when the client should show the code entry screen.
    pub verification_required: bool,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

/// Sign-in request body.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Response carrying the signed-in user.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: UserSummary,
}

/// Code verification request body.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub code: String,
}

/// Resend request body.
#[derive(Debug, Deserialize)]
pub struct ResendRequest {
    #[serde(default)]
    pub email: String,
}

/// Session restore response body.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub user: UserSummary,
    /// The user's `profiles` row, or null when it could not be read.
    pub profile: Option<Value>,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/auth/signup
///
/// # Errors
///
/// Returns the validation, Supabase or delivery failure.
pub async fn sign_up(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<SignUpRequest>,
) -> Result<Json<SignUpResponse>> {
    add_breadcrumb("auth", "Sign-up attempt");

    let outcome = state
        .auth()
        .sign_up(&req.email, &req.password, req.full_name.as_deref())
        .await?;

    let email = req.email.trim().to_lowercase();
    let response = match outcome {
        SignUpOutcome::SignedIn(auth) => {
            store_session(&session, &auth).await?;
            set_sentry_user(&auth.user.id, auth.user.email.as_deref());
            SignUpResponse {
                success: true,
                verification_required: false,
                email,
                user: Some(UserSummary::from(&auth.user)),
            }
        }
        SignUpOutcome::VerificationRequired { .. } => SignUpResponse {
            success: true,
            verification_required: true,
            email,
            user: None,
        },
    };

    Ok(Json(response))
}

/// POST /api/auth/signin
///
/// # Errors
///
/// Returns 401 for bad credentials and 403 for an unconfirmed email.
pub async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<SignInRequest>,
) -> Result<Json<UserResponse>> {
    add_breadcrumb("auth", "Sign-in attempt");

    let auth = state.auth().sign_in(&req.email, &req.password).await?;
    store_session(&session, &auth).await?;
    set_sentry_user(&auth.user.id, auth.user.email.as_deref());

    Ok(Json(UserResponse {
        success: true,
        user: UserSummary::from(&auth.user),
    }))
}

/// POST /api/auth/verify
///
/// # Errors
///
/// Returns why the code was rejected.
pub async fn verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<OperationResult>> {
    add_breadcrumb("auth", "Verification code submitted");

    state
        .auth()
        .verify_email_with_code(&req.email, &req.code)
        .await?;

    Ok(Json(OperationResult::ok()))
}

/// POST /api/auth/resend
///
/// # Errors
///
/// Returns error if the new code cannot be stored or delivered.
pub async fn resend(
    State(state): State<AppState>,
    Json(req): Json<ResendRequest>,
) -> Result<Json<OperationResult>> {
    add_breadcrumb("auth", "Verification code resend");

    state.auth().resend_verification_code(&req.email).await?;

    Ok(Json(OperationResult::ok()))
}

/// GET /api/auth/session
///
/// Refreshes or re-validates the stored tokens and loads the profile row.
///
/// # Errors
///
/// Returns 401 and forgets the session when it can no longer be restored.
pub async fn session(
    State(state): State<AppState>,
    RequireSession { auth, session }: RequireSession,
) -> Result<Json<SessionResponse>> {
    let restored = match state.auth().restore_session(&auth).await {
        Ok(restored) => restored,
        Err(AuthError::SessionExpired) => {
            if let Err(e) = clear_auth_session(&session).await {
                tracing::error!(error = %e, "Failed to clear expired session");
            }
            clear_sentry_user();
            return Err(AuthError::SessionExpired.into());
        }
        Err(e) => return Err(e.into()),
    };

    if restored != auth {
        session
            .insert(crate::models::keys::AUTH_SESSION, &restored)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to update session: {e}")))?;
    }

    let profile = load_profile(&state, &restored).await;

    Ok(Json(SessionResponse {
        success: true,
        user: UserSummary::from(&restored.user),
        profile,
    }))
}

/// POST /api/auth/signout
///
/// # Errors
///
/// Returns error if the session cannot be cleared.
pub async fn sign_out(
    State(state): State<AppState>,
    OptionalSession { auth, session }: OptionalSession,
) -> Result<Json<OperationResult>> {
    if let Some(auth) = &auth {
        state.auth().sign_out(auth).await;
    }
    if let Some(session) = &session {
        clear_auth_session(session)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to clear session: {e}")))?;
    }
    clear_sentry_user();

    Ok(Json(OperationResult::ok()))
}

// =============================================================================
// Helpers
// =============================================================================

async fn store_session(session: &Session, auth: &AuthSession) -> Result<()> {
    set_auth_session(session, auth)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to store session: {e}")))
}

/// Read the user's profile with their own token. Failures are not fatal.
async fn load_profile(state: &AppState, auth: &AuthSession) -> Option<Value> {
    let filters = [Filter::eq("id", auth.user.id), Filter::limit(1)];
    match state
        .supabase()
        .select::<Value>(PROFILES_TABLE, &filters, Some(&auth.access_token))
        .await
    {
        Ok(rows) => rows.into_iter().next(),
        Err(e) => {
            tracing::warn!(user_id = %auth.user.id, error = %e, "Failed to load profile");
            None
        }
    }
}
