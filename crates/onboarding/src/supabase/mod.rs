//! Supabase API client.
//!
//! Thin wrapper over the two Supabase HTTP surfaces the service uses:
//!
//! - GoTrue (`/auth/v1/*`): sign-up, password sign-in, token refresh, user
//!   lookup, logout, project settings
//! - PostgREST (`/rest/v1/*`): table reads/writes and database functions
//!
//! Every request carries the project's anon key in the `apikey` header. The
//! `Authorization` bearer is the anon key unless a user access token is given.
//! [`SupabaseClient::service_role`] returns a view that sends the service-role
//! key in both places instead; only that view can reach the verification code
//! table and the privileged database functions. Nothing is cached and nothing
//! is retried.

mod auth;
mod error;
mod rest;
mod types;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

pub use error::{SupabaseError, error_message};
pub use rest::Filter;
pub use types::{AuthSession, AuthSettings, AuthUser, SignUpResponse, UserMetadata};

use crate::config::SupabaseConfig;

/// Supabase API client.
///
/// Cheaply cloneable; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
    service_role: bool,
}

#[derive(Debug)]
struct SupabaseClientInner {
    client: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
    service_role_key: Option<SecretString>,
}

impl SupabaseClient {
    /// Create a new Supabase client.
    ///
    /// `timeout` bounds every request; a hung call fails with
    /// [`SupabaseError::Http`].
    ///
    /// # Errors
    ///
    /// Returns error if a key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &SupabaseConfig, timeout: Duration) -> Result<Self, SupabaseError> {
        HeaderValue::from_str(config.anon_key.expose_secret())
            .map_err(|e| SupabaseError::Parse(format!("Invalid anon key format: {e}")))?;
        if let Some(key) = &config.service_role_key {
            HeaderValue::from_str(key.expose_secret()).map_err(|e| {
                SupabaseError::Parse(format!("Invalid service role key format: {e}"))
            })?;
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                client,
                base_url: config.url.trim_end_matches('/').to_string(),
                anon_key: config.anon_key.clone(),
                service_role_key: config.service_role_key.clone(),
            }),
            service_role: false,
        })
    }

    /// The same client authenticated with the service-role key.
    ///
    /// # Errors
    ///
    /// Returns [`SupabaseError::MissingServiceRoleKey`] when the client was
    /// built without one.
    pub fn service_role(&self) -> Result<Self, SupabaseError> {
        if self.inner.service_role_key.is_none() {
            return Err(SupabaseError::MissingServiceRoleKey);
        }
        Ok(Self {
            inner: Arc::clone(&self.inner),
            service_role: true,
        })
    }

    /// Project URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    fn api_key(&self) -> &str {
        match &self.inner.service_role_key {
            Some(key) if self.service_role => key.expose_secret(),
            _ => self.inner.anon_key.expose_secret(),
        }
    }

    /// `Authorization` value for `access_token`, or this client's key.
    fn bearer(&self, access_token: Option<&str>) -> String {
        format!("Bearer {}", access_token.unwrap_or_else(|| self.api_key()))
    }

    /// Start a request carrying `apikey` and the `Authorization` bearer.
    fn request(
        &self,
        method: reqwest::Method,
        url: impl reqwest::IntoUrl,
        access_token: Option<&str>,
    ) -> reqwest::RequestBuilder {
        self.inner
            .client
            .request(method, url)
            .header("apikey", self.api_key())
            .header(AUTHORIZATION, self.bearer(access_token))
    }

    /// Return the body of a 2xx response, or the extracted API error.
    async fn read_body(response: reqwest::Response) -> Result<String, SupabaseError> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(SupabaseError::from_response(status, &body))
        }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, SupabaseError> {
        let body = Self::read_body(response).await?;
        serde_json::from_str(&body).map_err(|e| SupabaseError::Parse(e.to_string()))
    }
}
