//! Session extractors for the auth API.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use vanguard_core::OperationResult;

use crate::models::keys;
use crate::supabase::AuthSession;

/// Extractor that requires a signed-in user.
///
/// Yields the stored session together with the session handle so the
/// handler can replace or clear it.
pub struct RequireSession {
    pub auth: AuthSession,
    pub session: Session,
}

/// Rejection when no user is signed in.
pub struct NotSignedIn;

impl IntoResponse for NotSignedIn {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(OperationResult::failure("Not signed in")),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = NotSignedIn;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(NotSignedIn)?;

        let auth: AuthSession = session
            .get(keys::AUTH_SESSION)
            .await
            .ok()
            .flatten()
            .ok_or(NotSignedIn)?;

        Ok(Self { auth, session })
    }
}

/// Extractor that optionally gets the stored session.
pub struct OptionalSession {
    pub auth: Option<AuthSession>,
    pub session: Option<Session>,
}

impl<S> FromRequestParts<S> for OptionalSession
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts.extensions.get::<Session>().cloned();
        let auth = match &session {
            Some(session) => session
                .get::<AuthSession>(keys::AUTH_SESSION)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self { auth, session })
    }
}

/// Store the signed-in user's tokens, rotating the session ID.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_auth_session(
    session: &Session,
    auth: &AuthSession,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::AUTH_SESSION, auth).await
}

/// Forget the signed-in user (sign-out).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_auth_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
