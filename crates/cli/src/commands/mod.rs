//! Command implementations.

pub mod smtp;
pub mod supabase;
pub mod webhook;

use std::time::Duration;

use thiserror::Error;
use vanguard_core::EmailError;
use vanguard_onboarding::config::ConfigError;
use vanguard_onboarding::mailer::MailerError;
use vanguard_onboarding::supabase::SupabaseError;

/// Client-side timeout for every diagnostic request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Minutes quoted in diagnostic verification emails.
const SAMPLE_EXPIRY_MINUTES: u64 = 15;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Environment is incomplete or invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Invalid recipient or account email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Email could not be delivered.
    #[error("Email delivery failed: {0}")]
    Mailer(#[from] MailerError),

    /// Supabase call failed.
    #[error("Supabase error: {0}")]
    Supabase(#[from] SupabaseError),

    /// A required setting is absent.
    #[error("Not configured: {0}")]
    NotConfigured(&'static str),
}
