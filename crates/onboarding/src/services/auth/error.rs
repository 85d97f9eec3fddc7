//! Authentication error types.

use thiserror::Error;
use vanguard_core::{EmailError, VerificationCodeError};

use crate::codes::CodeError;
use crate::mailer::MailerError;
use crate::supabase::SupabaseError;

/// Shown for transport failures and anything else the user cannot act on.
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// The address the code was sent to is unknown.
    #[error("email address is missing")]
    MissingEmail,

    /// Request failed local validation.
    #[error("{0}")]
    Validation(String),

    /// Code is not six digits.
    #[error("invalid code: {0}")]
    InvalidCode(#[from] VerificationCodeError),

    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Sign-in attempted before confirming the email.
    #[error("email not confirmed")]
    EmailNotConfirmed,

    /// Stored session can no longer be refreshed.
    #[error("session expired")]
    SessionExpired,

    /// Verification code rejected or store failure.
    #[error("verification code error: {0}")]
    Code(#[from] CodeError),

    /// Supabase call failed.
    #[error("supabase error: {0}")]
    Supabase(#[from] SupabaseError),

    /// Email could not be delivered.
    #[error("email delivery error: {0}")]
    Mailer(#[from] MailerError),
}

impl AuthError {
    /// Message for the `{success: false, error}` response.
    ///
    /// Local validation messages and remote messages are passed through;
    /// transport and internal failures collapse to [`GENERIC_ERROR_MESSAGE`].
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(EmailError::Empty) => "Email is required".to_string(),
            Self::InvalidEmail(_) => "Please enter a valid email address".to_string(),
            Self::MissingEmail => "Email address is missing. Please sign up again.".to_string(),
            Self::Validation(message) => message.clone(),
            Self::InvalidCode(e) => e.to_string(),
            Self::InvalidCredentials => "Invalid email or password".to_string(),
            Self::EmailNotConfirmed => {
                "Please verify your email address before signing in.".to_string()
            }
            Self::SessionExpired => "Your session has expired. Please sign in again.".to_string(),
            Self::Code(e) => e.user_message().to_string(),
            Self::Supabase(SupabaseError::Api { message, .. })
            | Self::Mailer(MailerError::Rejected { message, .. }) => message.clone(),
            Self::Supabase(_) | Self::Mailer(_) => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }

    /// Whether this is our fault (or an upstream's) rather than the caller's.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Supabase(SupabaseError::Api { status, .. }) => *status >= 500,
            Self::Code(CodeError::Store(_)) | Self::Supabase(_) | Self::Mailer(_) => true,
            _ => false,
        }
    }
}
