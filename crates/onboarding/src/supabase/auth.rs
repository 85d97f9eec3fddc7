//! GoTrue endpoints.

use chrono::Utc;
use reqwest::Method;
use serde_json::json;

use super::types::TokenResponse;
use super::{AuthSession, AuthSettings, AuthUser, SignUpResponse, SupabaseClient, SupabaseError};

impl SupabaseClient {
    /// Register a user with email and password.
    ///
    /// # Errors
    ///
    /// Returns the GoTrue error (e.g. "User already registered") or a
    /// transport error.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<SignUpResponse, SupabaseError> {
        let body = json!({
            "email": email,
            "password": password,
            "data": { "full_name": full_name.unwrap_or_default() },
        });

        let response = self
            .request(Method::POST, self.endpoint("/auth/v1/signup"), None)
            .json(&body)
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        SignUpResponse::parse(&body, Utc::now())
    }

    /// Password sign-in.
    ///
    /// # Errors
    ///
    /// Returns the GoTrue error ("Invalid login credentials", "Email not
    /// confirmed") or a transport error.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, SupabaseError> {
        self.token(
            "password",
            &json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Exchange a refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns the GoTrue error (e.g. "Invalid Refresh Token") or a transport
    /// error.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, SupabaseError> {
        self.token("refresh_token", &json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn token(
        &self,
        grant_type: &str,
        body: &serde_json::Value,
    ) -> Result<AuthSession, SupabaseError> {
        let mut url = url::Url::parse(&self.endpoint("/auth/v1/token"))
            .map_err(|e| SupabaseError::Parse(e.to_string()))?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let response = self
            .request(Method::POST, url, None)
            .json(body)
            .send()
            .await?;

        let token: TokenResponse = Self::read_json(response).await?;
        Ok(token.into_session(Utc::now()))
    }

    /// Fetch the user behind `access_token`.
    ///
    /// # Errors
    ///
    /// Returns a 401 API error when the token is invalid or expired.
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, SupabaseError> {
        let response = self
            .request(
                Method::GET,
                self.endpoint("/auth/v1/user"),
                Some(access_token),
            )
            .send()
            .await?;

        Self::read_json(response).await
    }

    /// Revoke the session behind `access_token`.
    ///
    /// # Errors
    ///
    /// Returns the GoTrue error or a transport error.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), SupabaseError> {
        let response = self
            .request(
                Method::POST,
                self.endpoint("/auth/v1/logout"),
                Some(access_token),
            )
            .send()
            .await?;

        Self::read_body(response).await.map(|_| ())
    }

    /// Public auth settings of the project.
    ///
    /// # Errors
    ///
    /// Returns error if the project is unreachable or the key is rejected.
    pub async fn settings(&self) -> Result<AuthSettings, SupabaseError> {
        let response = self
            .request(Method::GET, self.endpoint("/auth/v1/settings"), None)
            .send()
            .await?;

        Self::read_json(response).await
    }
}
