//! Unified error handling with Sentry integration.
//!
//! Every failure leaves the API as `{"success": false, "error": "..."}`.
//! Server-side failures are captured to Sentry before responding.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use vanguard_core::OperationResult;

use crate::services::auth::{AuthError, GENERIC_ERROR_MESSAGE};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::SessionExpired => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::EmailNotConfirmed => StatusCode::FORBIDDEN,
                AuthError::InvalidEmail(_)
                | AuthError::MissingEmail
                | AuthError::Validation(_)
                | AuthError::InvalidCode(_)
                | AuthError::Code(_) => StatusCode::BAD_REQUEST,
                AuthError::Supabase(e) => e
                    .status()
                    .and_then(|s| StatusCode::from_u16(s).ok())
                    .filter(StatusCode::is_client_error)
                    .unwrap_or(StatusCode::BAD_GATEWAY),
                AuthError::Mailer(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }

    const fn is_server_error(&self) -> bool {
        match self {
            Self::Internal(_) => true,
            Self::Auth(err) => err.is_server_error(),
            Self::Unauthorized(_) | Self::BadRequest(_) => false,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Internal(_) => GENERIC_ERROR_MESSAGE.to_string(),
            Self::Auth(err) => err.user_message(),
            Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        (self.status(), Json(OperationResult::failure(self.message()))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
pub fn add_breadcrumb(category: &str, message: &str) {
    sentry::add_breadcrumb(sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use vanguard_core::VerificationCodeError;

    use super::*;
    use crate::codes::CodeError;
    use crate::mailer::MailerError;
    use crate::supabase::SupabaseError;

    async fn respond(err: AppError) -> (StatusCode, OperationResult) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_local_validation_is_bad_request() {
        let (status, body) =
            respond(AuthError::InvalidCode(VerificationCodeError::WrongLength).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.is_success());
        assert_eq!(body.error(), Some("Please enter all 6 digits"));
    }

    #[tokio::test]
    async fn test_code_rejection() {
        let (status, body) = respond(AuthError::Code(CodeError::Expired).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body.error(),
            Some("This code has expired. Please request a new code.")
        );
    }

    #[tokio::test]
    async fn test_supabase_client_error_keeps_status_and_message() {
        let err = AuthError::Supabase(SupabaseError::Api {
            status: 422,
            message: "User already registered".to_string(),
            code: Some("user_already_exists".to_string()),
        });
        let (status, body) = respond(err.into()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.error(), Some("User already registered"));
    }

    #[tokio::test]
    async fn test_upstream_failures_are_bad_gateway() {
        let err = AuthError::Mailer(MailerError::Rejected {
            status: 500,
            message: "Email service returned status 500".to_string(),
        });
        let (status, body) = respond(err.into()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.error(), Some("Email service returned status 500"));

        let (status, body) = respond(AppError::Internal("boom".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error(), Some(GENERIC_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let (status, body) = respond(AppError::Unauthorized("Not signed in".to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.error(), Some("Not signed in"));
    }
}
