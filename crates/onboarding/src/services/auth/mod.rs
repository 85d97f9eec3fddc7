//! Authentication service.
//!
//! Sign-up, sign-in, email verification by six-digit code, session
//! restoration and sign-out, on top of Supabase auth. Email confirmation is
//! done with our own codes: sign-up without a session issues a code and mails
//! it, and a correct code confirms the address through the
//! `confirm_user_email` database function.

mod error;

pub use error::{AuthError, GENERIC_ERROR_MESSAGE};

use chrono::Utc;
use serde_json::json;
use vanguard_core::{Email, VerificationCode};

use crate::codes::CodeStore;
use crate::mailer::Mailer;
use crate::supabase::{AuthSession, AuthUser, SignUpResponse, SupabaseClient, SupabaseError};

/// Database function that marks a user's email as confirmed.
///
/// Callable by the service role only:
///
/// ```sql
/// revoke execute on function confirm_user_email(text) from public, anon, authenticated;
/// grant execute on function confirm_user_email(text) to service_role;
/// ```
pub const CONFIRM_EMAIL_FUNCTION: &str = "confirm_user_email";

/// Sessions expiring within this window are refreshed instead of validated.
const REFRESH_MARGIN_SECONDS: i64 = 60;

/// Outcome of a sign-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// Email confirmation is off; the user is signed in.
    SignedIn(AuthSession),
    /// A code was emailed; the user has no session until it is entered.
    VerificationRequired { user: AuthUser },
}

/// Authentication service.
pub struct AuthService<'a> {
    supabase: &'a SupabaseClient,
    /// Service-role view, for [`CONFIRM_EMAIL_FUNCTION`].
    admin: &'a SupabaseClient,
    mailer: &'a Mailer,
    codes: &'a CodeStore,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        supabase: &'a SupabaseClient,
        admin: &'a SupabaseClient,
        mailer: &'a Mailer,
        codes: &'a CodeStore,
    ) -> Self {
        Self {
            supabase,
            admin,
            mailer,
            codes,
        }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`/`Validation` before any network call,
    /// the Supabase message (e.g. "User already registered") verbatim, or a
    /// delivery error if the code email could not be sent.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<SignUpOutcome, AuthError> {
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(AuthError::Validation("Password is required".to_string()));
        }
        let full_name = full_name.map(str::trim).filter(|n| !n.is_empty());

        match self
            .supabase
            .sign_up(email.as_str(), password, full_name)
            .await?
        {
            SignUpResponse::Session(session) => {
                tracing::info!(user_id = %session.user.id, "Sign-up completed with session");
                Ok(SignUpOutcome::SignedIn(session))
            }
            SignUpResponse::User(user) => {
                tracing::info!(user_id = %user.id, "Sign-up requires email verification");
                self.send_code(&email, full_name).await?;
                Ok(SignUpOutcome::VerificationRequired { user })
            }
        }
    }

    /// Password sign-in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::EmailNotConfirmed` for unverified users,
    /// `AuthError::InvalidCredentials` for a wrong email/password, or the
    /// Supabase error.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(AuthError::Validation("Password is required".to_string()));
        }

        let session = self
            .supabase
            .sign_in_with_password(email.as_str(), password)
            .await
            .map_err(map_sign_in_error)?;

        tracing::info!(user_id = %session.user.id, "User signed in");
        Ok(session)
    }

    /// Check a code and confirm the email.
    ///
    /// Local validation (email present, six digits) happens before anything
    /// is looked up. The code is consumed before the confirmation call.
    ///
    /// # Errors
    ///
    /// Returns why the code was rejected, or the confirmation error.
    pub async fn verify_email_with_code(&self, email: &str, code: &str) -> Result<(), AuthError> {
        if email.trim().is_empty() {
            return Err(AuthError::MissingEmail);
        }
        let email = Email::parse(email)?;
        let code = VerificationCode::parse(code)?;

        self.codes.consume(&email, &code).await?;

        self.admin
            .rpc(CONFIRM_EMAIL_FUNCTION, &json!({ "user_email": email.as_str() }))
            .await?;

        tracing::info!(email = %email, "Email confirmed");
        Ok(())
    }

    /// Issue and email a fresh code, invalidating the previous one.
    ///
    /// # Errors
    ///
    /// Returns error if the code cannot be stored or delivered.
    pub async fn resend_verification_code(&self, email: &str) -> Result<(), AuthError> {
        if email.trim().is_empty() {
            return Err(AuthError::MissingEmail);
        }
        let email = Email::parse(email)?;
        self.send_code(&email, None).await
    }

    /// Bring a stored session up to date.
    ///
    /// Refreshes when the access token has expired or is about to; otherwise
    /// re-reads the user with the current token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SessionExpired` when Supabase no longer accepts the
    /// tokens.
    pub async fn restore_session(&self, stored: &AuthSession) -> Result<AuthSession, AuthError> {
        let margin = chrono::Duration::seconds(REFRESH_MARGIN_SECONDS);

        if stored.expires_within(margin, Utc::now()) {
            tracing::debug!(user_id = %stored.user.id, "Refreshing session");
            return self
                .supabase
                .refresh_session(&stored.refresh_token)
                .await
                .map_err(map_session_error);
        }

        let user = self
            .supabase
            .get_user(&stored.access_token)
            .await
            .map_err(map_session_error)?;

        Ok(AuthSession {
            user,
            ..stored.clone()
        })
    }

    /// Revoke the session. Failures are logged and ignored.
    pub async fn sign_out(&self, session: &AuthSession) {
        if let Err(e) = self.supabase.sign_out(&session.access_token).await {
            tracing::warn!(user_id = %session.user.id, error = %e, "Remote sign-out failed");
        } else {
            tracing::info!(user_id = %session.user.id, "User signed out");
        }
    }

    async fn send_code(&self, email: &Email, full_name: Option<&str>) -> Result<(), AuthError> {
        let issued = self.codes.issue(email).await?;
        let minutes = self.codes.ttl().as_secs().div_ceil(60);
        self.mailer
            .send_verification_code(email, &issued.code, full_name, minutes)
            .await?;
        Ok(())
    }
}

fn map_sign_in_error(err: SupabaseError) -> AuthError {
    let code = err.code().unwrap_or_default();
    let message = err.api_message().unwrap_or_default().to_lowercase();

    if code == "email_not_confirmed" || message.contains("email not confirmed") {
        AuthError::EmailNotConfirmed
    } else if code == "invalid_credentials" || message.contains("invalid login credentials") {
        AuthError::InvalidCredentials
    } else {
        AuthError::Supabase(err)
    }
}

fn map_session_error(err: SupabaseError) -> AuthError {
    match err.status() {
        Some(400 | 401 | 403) => AuthError::SessionExpired,
        _ => AuthError::Supabase(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, message: &str, code: Option<&str>) -> SupabaseError {
        SupabaseError::Api {
            status,
            message: message.to_string(),
            code: code.map(str::to_string),
        }
    }

    #[test]
    fn test_sign_in_error_mapping() {
        assert!(matches!(
            map_sign_in_error(api(400, "Email not confirmed", None)),
            AuthError::EmailNotConfirmed
        ));
        assert!(matches!(
            map_sign_in_error(api(400, "whatever", Some("email_not_confirmed"))),
            AuthError::EmailNotConfirmed
        ));
        assert!(matches!(
            map_sign_in_error(api(400, "Invalid login credentials", None)),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            map_sign_in_error(api(429, "Too many requests", None)),
            AuthError::Supabase(_)
        ));
    }

    #[test]
    fn test_session_error_mapping() {
        assert!(matches!(
            map_session_error(api(401, "invalid JWT", None)),
            AuthError::SessionExpired
        ));
        assert!(matches!(
            map_session_error(api(400, "Invalid Refresh Token: Already Used", None)),
            AuthError::SessionExpired
        ));
        assert!(matches!(
            map_session_error(api(503, "unavailable", None)),
            AuthError::Supabase(_)
        ));
    }
}
