//! Verification code lifecycle.
//!
//! A code is bound to one email, expires after the configured TTL, is
//! consumed by its first successful check, and is discarded after
//! [`MAX_FAILED_ATTEMPTS`] wrong guesses. Issuing a new code for an email
//! replaces the previous one. Each store checks and updates a code as one
//! atomic step, so concurrent guesses cannot both succeed or go uncounted.

mod memory;
mod supabase;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vanguard_core::{Email, VerificationCode};

pub use memory::MemoryCodeStore;
pub use supabase::{CODES_TABLE, CONSUME_CODE_FUNCTION, SupabaseCodeStore};

use crate::supabase::SupabaseError;

/// Wrong guesses allowed before a code is discarded.
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

/// Errors from issuing or checking a code.
#[derive(Debug, Error)]
pub enum CodeError {
    #[error("no verification code is pending for this email")]
    NotFound,

    #[error("verification code has expired")]
    Expired,

    #[error("verification code does not match ({remaining} attempts left)")]
    Mismatch { remaining: u32 },

    #[error("too many incorrect attempts")]
    TooManyAttempts,

    #[error("code store error: {0}")]
    Store(#[from] SupabaseError),
}

impl CodeError {
    /// Message shown to the person entering the code.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound => "No verification code found. Please request a new code.",
            Self::Expired => "This code has expired. Please request a new code.",
            Self::Mismatch { .. } => "Invalid verification code. Please try again.",
            Self::TooManyAttempts => {
                "Too many incorrect attempts. Please request a new code."
            }
            Self::Store(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// A freshly issued code.
#[derive(Debug, Clone)]
pub struct IssuedCode {
    pub code: VerificationCode,
    pub expires_at: DateTime<Utc>,
}

/// A pending code as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCode {
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: u32,
}

/// Outcome of comparing a guess with a stored code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Check {
    /// Correct; remove the code.
    Accept,
    /// Expired; remove the code.
    Expired,
    /// Wrong; store the new attempt count.
    Retry { attempts: u32 },
    /// Wrong and out of attempts; remove the code.
    Exhausted,
}

impl StoredCode {
    fn new(email: &Email, code: &VerificationCode, expires_at: DateTime<Utc>) -> Self {
        Self {
            email: email.as_str().to_string(),
            code: code.as_str().to_string(),
            expires_at,
            attempts: 0,
        }
    }

    fn check(&self, guess: &VerificationCode, now: DateTime<Utc>) -> Check {
        if now >= self.expires_at {
            return Check::Expired;
        }
        let stored = VerificationCode::parse(&self.code);
        if stored.is_ok_and(|stored| guess.matches(&stored)) {
            return Check::Accept;
        }
        let attempts = self.attempts + 1;
        if attempts >= MAX_FAILED_ATTEMPTS {
            Check::Exhausted
        } else {
            Check::Retry { attempts }
        }
    }
}

impl Check {
    fn into_result(self) -> Result<(), CodeError> {
        match self {
            Self::Accept => Ok(()),
            Self::Expired => Err(CodeError::Expired),
            Self::Retry { attempts } => Err(CodeError::Mismatch {
                remaining: MAX_FAILED_ATTEMPTS - attempts,
            }),
            Self::Exhausted => Err(CodeError::TooManyAttempts),
        }
    }
}

/// Generate a random 6-digit verification code.
#[must_use]
pub fn generate_code() -> VerificationCode {
    use rand::Rng;
    let mut rng = rand::rng();
    let digits: [u8; 6] = std::array::from_fn(|_| rng.random_range(0..10));
    // Every element is 0..=9, so this always succeeds
    VerificationCode::from_digits(digits).unwrap_or_else(generate_code)
}

/// Verification code storage.
#[derive(Clone)]
pub enum CodeStore {
    Memory(MemoryCodeStore),
    Supabase(SupabaseCodeStore),
}

impl CodeStore {
    /// Code lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        match self {
            Self::Memory(store) => store.ttl(),
            Self::Supabase(store) => store.ttl(),
        }
    }

    /// Issue a new code for `email`, replacing any pending one.
    ///
    /// # Errors
    ///
    /// Returns [`CodeError::Store`] if the backing table is unreachable.
    pub async fn issue(&self, email: &Email) -> Result<IssuedCode, CodeError> {
        let issued = match self {
            Self::Memory(store) => store.issue(email).await,
            Self::Supabase(store) => store.issue(email).await?,
        };
        tracing::info!(email = %email, expires_at = %issued.expires_at, "Verification code issued");
        Ok(issued)
    }

    /// Check `code` for `email`, consuming it on success.
    ///
    /// # Errors
    ///
    /// Returns why the code was rejected.
    pub async fn consume(&self, email: &Email, code: &VerificationCode) -> Result<(), CodeError> {
        let result = match self {
            Self::Memory(store) => store.consume(email, code).await,
            Self::Supabase(store) => store.consume(email, code).await,
        };
        match &result {
            Ok(()) => tracing::info!(email = %email, "Verification code accepted"),
            Err(e) => tracing::warn!(email = %email, error = %e, "Verification code rejected"),
        }
        result
    }
}

fn expiry_from(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::minutes(15))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn stored(code: &str, attempts: u32) -> StoredCode {
        StoredCode {
            email: "ada@vault.net".to_string(),
            code: code.to_string(),
            expires_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 15, 0).unwrap(),
            attempts,
        }
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, minute, 0).unwrap()
    }

    fn code(s: &str) -> VerificationCode {
        VerificationCode::parse(s).unwrap()
    }

    #[test]
    fn test_generate_code_format() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.as_str().len(), 6);
            assert!(code.as_str().chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_check_accepts_matching_code() {
        assert_eq!(stored("123456", 0).check(&code("123456"), at(0)), Check::Accept);
    }

    #[test]
    fn test_check_rejects_expired_code_even_if_correct() {
        assert_eq!(stored("123456", 0).check(&code("123456"), at(15)), Check::Expired);
    }

    #[test]
    fn test_check_counts_attempts() {
        assert_eq!(
            stored("123456", 0).check(&code("000000"), at(1)),
            Check::Retry { attempts: 1 }
        );
        assert_eq!(
            stored("123456", 3).check(&code("000000"), at(1)),
            Check::Retry { attempts: 4 }
        );
        assert_eq!(
            stored("123456", 4).check(&code("000000"), at(1)),
            Check::Exhausted
        );
    }

    #[test]
    fn test_mismatch_reports_remaining_attempts() {
        let err = Check::Retry { attempts: 1 }.into_result().unwrap_err();
        assert!(matches!(err, CodeError::Mismatch { remaining: 4 }));
        assert_eq!(err.user_message(), "Invalid verification code. Please try again.");
    }
}
