//! Onboarding service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SUPABASE_URL` - Supabase project URL (falls back to `VITE_SUPABASE_URL`)
//! - `SUPABASE_ANON_KEY` - Supabase anon key (falls back to `VITE_SUPABASE_ANON_KEY`)
//! - `SUPABASE_SERVICE_ROLE_KEY` - Service-role key for the verification code
//!   table and the `consume_verification_code`/`confirm_user_email` functions.
//!   Server-side only; never falls back to a `VITE_` variable.
//!
//! ## Email delivery (at least one transport)
//! - `N8N_WEBHOOK_URL` - Email webhook URL (falls back to `VITE_N8N_WEBHOOK_URL`)
//! - `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM_EMAIL` - Direct SMTP sender
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `SMTP_FROM_NAME` - Sender display name (default: Voice Vanguard Vault)
//! - `EMAIL_TRANSPORT` - `webhook` or `smtp` (default: webhook when a URL is set)
//!
//! ## Optional
//! - `ONBOARDING_HOST` - Bind address (default: 127.0.0.1)
//! - `ONBOARDING_PORT` - Listen port (default: 3000)
//! - `ONBOARDING_BASE_URL` - Public URL of the front-end (default: `http://<host>:<port>`)
//! - `VERIFICATION_CODE_TTL_MINUTES` - Code lifetime (default: 15)
//! - `VERIFICATION_CODE_STORE` - `supabase` or `memory` (default: supabase)
//! - `HTTP_TIMEOUT_SECONDS` - Outbound request timeout (default: 15)
//! - `AUTH_RATE_LIMIT_BURST` - Auth requests allowed in a burst per IP (default: 5)
//! - `AUTH_RATE_LIMIT_REPLENISH_SECONDS` - Seconds to regain one request (default: 6)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_FROM_NAME: &str = "Voice Vanguard Vault";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "your_",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Source of configuration values, keyed by variable name.
type Lookup<'a> = dyn Fn(&str) -> Option<String> + 'a;

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Load `.env` if present.
pub fn load_dotenv() {
    // Missing .env is fine
    let _ = dotenvy::dotenv();
}

/// Onboarding service configuration.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the front-end (CORS origin, cookie security)
    pub base_url: String,
    pub supabase: SupabaseConfig,
    pub email: EmailConfig,
    pub codes: CodeConfig,
    pub rate_limit: RateLimitConfig,
    /// Timeout applied to every outbound HTTP request
    pub http_timeout: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

/// Supabase project configuration.
///
/// Implements `Debug` manually to redact the keys.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project URL without trailing slash (e.g. `https://abc.supabase.co`)
    pub url: String,
    /// Public anon key
    pub anon_key: SecretString,
    /// Privileged key; the service requires it, diagnostics do not
    pub service_role_key: Option<SecretString>,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .field(
                "service_role_key",
                &self.service_role_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Which sender delivers verification emails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailTransport {
    Webhook,
    Smtp,
}

/// Email delivery configuration.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub transport: EmailTransport,
    pub webhook_url: Option<String>,
    pub smtp: Option<SmtpConfig>,
}

/// Direct SMTP sender configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_name: String,
    pub from_email: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from_name", &self.from_name)
            .field("from_email", &self.from_email)
            .finish()
    }
}

impl SmtpConfig {
    /// `Name <address>` mailbox for the From header.
    #[must_use]
    pub fn from_mailbox(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }
}

/// Where verification codes are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeStoreKind {
    /// `email_verification_codes` table via PostgREST
    Supabase,
    /// Process-local cache; codes are lost on restart
    Memory,
}

/// Verification code settings.
#[derive(Debug, Clone)]
pub struct CodeConfig {
    pub ttl: Duration,
    pub store: CodeStoreKind,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(15 * 60),
            store: CodeStoreKind::Supabase,
        }
    }
}

/// Per-IP limits on the auth endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed back to back.
    pub burst: u32,
    /// Seconds to regain one request.
    pub replenish_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            burst: 5,
            replenish_seconds: 6,
        }
    }
}

impl RateLimitConfig {
    fn from_lookup(env: &Lookup<'_>) -> Result<Self, ConfigError> {
        let burst: u32 = parse_env(env, "AUTH_RATE_LIMIT_BURST", "5")?;
        let replenish_seconds: u64 = parse_env(env, "AUTH_RATE_LIMIT_REPLENISH_SECONDS", "6")?;
        if burst == 0 || replenish_seconds == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "AUTH_RATE_LIMIT_BURST".to_string(),
                "burst and replenish interval must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            burst,
            replenish_seconds,
        })
    }
}

impl OnboardingConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the anon key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(&process_env)
    }

    fn from_lookup(env: &Lookup<'_>) -> Result<Self, ConfigError> {
        let host = parse_env(env, "ONBOARDING_HOST", "127.0.0.1")?;
        let port = parse_env(env, "ONBOARDING_PORT", "3000")?;
        let base_url = env("ONBOARDING_BASE_URL")
            .map_or_else(|| format!("http://{host}:{port}"), |u| trim_url(&u));
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("ONBOARDING_BASE_URL".to_string(), e.to_string())
        })?;

        let timeout_secs: u64 = parse_env(env, "HTTP_TIMEOUT_SECONDS", "15")?;

        let supabase = SupabaseConfig::from_lookup(env)?;
        if supabase.service_role_key.is_none() {
            return Err(ConfigError::MissingEnvVar(
                "SUPABASE_SERVICE_ROLE_KEY".to_string(),
            ));
        }

        Ok(Self {
            host,
            port,
            base_url,
            supabase,
            email: EmailConfig::from_lookup(env)?,
            codes: CodeConfig::from_lookup(env)?,
            rate_limit: RateLimitConfig::from_lookup(env)?,
            http_timeout: Duration::from_secs(timeout_secs),
            sentry_dsn: env("SENTRY_DSN"),
            sentry_environment: env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the front-end is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl SupabaseConfig {
    /// Load only the Supabase settings (used by diagnostics).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL or key is missing or the key looks
    /// like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(&process_env)
    }

    fn from_lookup(env: &Lookup<'_>) -> Result<Self, ConfigError> {
        let url = get_required_with_fallback(env, "SUPABASE_URL", "VITE_SUPABASE_URL")?;
        url::Url::parse(&url)
            .map_err(|e| ConfigError::InvalidEnvVar("SUPABASE_URL".to_string(), e.to_string()))?;

        let anon_key =
            get_required_with_fallback(env, "SUPABASE_ANON_KEY", "VITE_SUPABASE_ANON_KEY")?;
        validate_secret_strength(&anon_key, "SUPABASE_ANON_KEY")?;

        let service_role_key = env("SUPABASE_SERVICE_ROLE_KEY");
        if let Some(key) = &service_role_key {
            validate_secret_strength(key, "SUPABASE_SERVICE_ROLE_KEY")?;
            if *key == anon_key {
                return Err(ConfigError::InsecureSecret(
                    "SUPABASE_SERVICE_ROLE_KEY".to_string(),
                    "must differ from the anon key".to_string(),
                ));
            }
        }

        Ok(Self {
            url: trim_url(&url),
            anon_key: SecretString::from(anon_key),
            service_role_key: service_role_key.map(SecretString::from),
        })
    }
}

impl EmailConfig {
    /// Load only the email settings (used by diagnostics).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if no transport is configured or the selected
    /// one is incomplete.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(&process_env)
    }

    fn from_lookup(env: &Lookup<'_>) -> Result<Self, ConfigError> {
        let webhook_url = get_optional_with_fallback(env, "N8N_WEBHOOK_URL", "VITE_N8N_WEBHOOK_URL");
        if let Some(url) = &webhook_url {
            url::Url::parse(url).map_err(|e| {
                ConfigError::InvalidEnvVar("N8N_WEBHOOK_URL".to_string(), e.to_string())
            })?;
        }

        let smtp = if env("SMTP_HOST").is_some() {
            Some(SmtpConfig::from_lookup(env)?)
        } else {
            None
        };

        let transport = match env("EMAIL_TRANSPORT").as_deref() {
            Some("webhook") => EmailTransport::Webhook,
            Some("smtp") => EmailTransport::Smtp,
            Some(other) => {
                return Err(ConfigError::InvalidEnvVar(
                    "EMAIL_TRANSPORT".to_string(),
                    format!("expected 'webhook' or 'smtp', got '{other}'"),
                ));
            }
            None if webhook_url.is_none() && smtp.is_some() => EmailTransport::Smtp,
            None => EmailTransport::Webhook,
        };

        match transport {
            EmailTransport::Webhook if webhook_url.is_none() => {
                Err(ConfigError::MissingEnvVar("N8N_WEBHOOK_URL".to_string()))
            }
            EmailTransport::Smtp if smtp.is_none() => {
                Err(ConfigError::MissingEnvVar("SMTP_HOST".to_string()))
            }
            _ => Ok(Self {
                transport,
                webhook_url,
                smtp,
            }),
        }
    }
}

impl SmtpConfig {
    fn from_lookup(env: &Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            host: get_required_env(env, "SMTP_HOST")?,
            port: parse_env(env, "SMTP_PORT", "587")?,
            username: get_required_env(env, "SMTP_USERNAME")?,
            password: SecretString::from(get_required_env(env, "SMTP_PASSWORD")?),
            from_name: get_env_or_default(env, "SMTP_FROM_NAME", DEFAULT_FROM_NAME),
            from_email: get_required_env(env, "SMTP_FROM_EMAIL")?,
        })
    }
}

impl CodeConfig {
    fn from_lookup(env: &Lookup<'_>) -> Result<Self, ConfigError> {
        let minutes: u64 = parse_env(env, "VERIFICATION_CODE_TTL_MINUTES", "15")?;
        if minutes == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "VERIFICATION_CODE_TTL_MINUTES".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let store = match get_env_or_default(env, "VERIFICATION_CODE_STORE", "supabase").as_str()
        {
            "supabase" => CodeStoreKind::Supabase,
            "memory" => CodeStoreKind::Memory,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "VERIFICATION_CODE_STORE".to_string(),
                    format!("expected 'supabase' or 'memory', got '{other}'"),
                ));
            }
        };

        Ok(Self {
            ttl: Duration::from_secs(minutes * 60),
            store,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn trim_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Get a required environment variable.
fn get_required_env(env: &Lookup<'_>, key: &str) -> Result<String, ConfigError> {
    env(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(env: &Lookup<'_>, key: &str, default: &str) -> String {
    env(key).unwrap_or_else(|| default.to_string())
}

/// Try `primary` first, then the front-end build variable `fallback`.
fn get_optional_with_fallback(env: &Lookup<'_>, primary: &str, fallback: &str) -> Option<String> {
    env(primary).or_else(|| env(fallback))
}

/// Like [`get_optional_with_fallback`], reporting `primary` when both are missing.
fn get_required_with_fallback(
    env: &Lookup<'_>,
    primary: &str,
    fallback: &str,
) -> Result<String, ConfigError> {
    get_optional_with_fallback(env, primary, fallback)
        .ok_or_else(|| ConfigError::MissingEnvVar(primary.to_string()))
}

/// Parse an environment variable, using `default` when unset.
fn parse_env<T>(env: &Lookup<'_>, key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(env, key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a key is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Copy the key from the Supabase dashboard."
            ),
        ));
    }

    Ok(())
}
