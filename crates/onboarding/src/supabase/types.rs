//! GoTrue request and response types.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vanguard_core::UserId;

use super::SupabaseError;

/// Metadata supplied at sign-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// A Supabase auth user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl AuthUser {
    /// Whether the email address has been confirmed.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        self.email_confirmed_at.is_some()
    }
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl AuthSession {
    /// Whether the access token is expired or expires within `margin`.
    #[must_use]
    pub fn expires_within(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        self.expires_at <= now + margin
    }
}

/// Token endpoint payload as GoTrue sends it.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl TokenResponse {
    pub(crate) fn into_session(self, now: DateTime<Utc>) -> AuthSession {
        let expires_at = self
            .expires_at
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .or_else(|| self.expires_in.map(|secs| now + Duration::seconds(secs)))
            .unwrap_or(now);

        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expires_at,
            user: self.user,
        }
    }
}

/// Result of `POST /auth/v1/signup`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpResponse {
    /// Email confirmation is off; the user is signed in.
    Session(AuthSession),
    /// The user exists but has no session until the email is confirmed.
    User(AuthUser),
}

impl SignUpResponse {
    /// Interpret a sign-up body.
    ///
    /// GoTrue returns a token payload when autoconfirm is on, and either the
    /// bare user or `{user, session: null}` otherwise.
    pub(crate) fn parse(body: &str, now: DateTime<Utc>) -> Result<Self, SupabaseError> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| SupabaseError::Parse(e.to_string()))?;

        if value.get("access_token").is_some() {
            let token: TokenResponse =
                serde_json::from_value(value).map_err(|e| SupabaseError::Parse(e.to_string()))?;
            return Ok(Self::Session(token.into_session(now)));
        }

        if let Some(session) = value.get("session").filter(|s| !s.is_null()) {
            let token: TokenResponse = serde_json::from_value(session.clone())
                .map_err(|e| SupabaseError::Parse(e.to_string()))?;
            return Ok(Self::Session(token.into_session(now)));
        }

        let user = value.get("user").cloned().unwrap_or(value);
        serde_json::from_value(user)
            .map(Self::User)
            .map_err(|e| SupabaseError::Parse(e.to_string()))
    }

    /// The user, in either case.
    #[must_use]
    pub const fn user(&self) -> &AuthUser {
        match self {
            Self::Session(session) => &session.user,
            Self::User(user) => user,
        }
    }
}

/// Public project settings from `GET /auth/v1/settings`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub disable_signup: bool,
    /// `true` when new users are confirmed without an email round-trip.
    #[serde(default)]
    pub mailer_autoconfirm: bool,
    /// Enabled providers (`email`, `google`, ...).
    #[serde(default)]
    pub external: serde_json::Map<String, Value>,
}

impl AuthSettings {
    /// Whether sign-up leaves users without a session until they confirm.
    #[must_use]
    pub const fn email_confirmation_required(&self) -> bool {
        !self.mailer_autoconfirm
    }

    /// Names of enabled providers.
    #[must_use]
    pub fn enabled_providers(&self) -> Vec<&str> {
        self.external
            .iter()
            .filter(|(_, enabled)| enabled.as_bool() == Some(true))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
