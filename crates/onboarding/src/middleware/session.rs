//! Session middleware configuration.
//!
//! Sessions hold the Supabase tokens of the signed-in user; they live in
//! process memory and are lost on restart (users sign in again).

use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::OnboardingConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "vv_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &OnboardingConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
