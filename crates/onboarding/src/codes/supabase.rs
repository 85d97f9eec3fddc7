use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use vanguard_core::{Email, VerificationCode};

use super::{
    Check, CodeError, IssuedCode, MAX_FAILED_ATTEMPTS, StoredCode, expiry_from, generate_code,
};
use crate::supabase::{SupabaseClient, SupabaseError};

/// Table holding pending codes, one row per email.
///
/// Only the service role may touch it; the anon and authenticated roles get
/// no grants and row-level security has no policies for them.
///
/// ```sql
/// create table email_verification_codes (
///     email      text primary key,
///     code       text not null,
///     expires_at timestamptz not null,
///     attempts   integer not null default 0
/// );
///
/// alter table email_verification_codes enable row level security;
/// revoke all on email_verification_codes from anon, authenticated;
/// grant select, insert, update, delete on email_verification_codes to service_role;
/// ```
pub const CODES_TABLE: &str = "email_verification_codes";

/// Database function that checks a guess and updates the row in one
/// transaction.
///
/// The row is locked for the duration of the call, so concurrent guesses for
/// one email are serialized: a code is accepted at most once and every wrong
/// guess is counted.
///
/// ```sql
/// create function consume_verification_code(
///     p_email text,
///     p_code text,
///     p_max_attempts integer
/// ) returns jsonb
/// language plpgsql
/// security definer
/// set search_path = public
/// as $$
/// declare
///     pending email_verification_codes%rowtype;
/// begin
///     select * into pending
///     from email_verification_codes
///     where email = p_email
///     for update;
///
///     if not found then
///         return jsonb_build_object('outcome', 'not_found');
///     end if;
///
///     if pending.expires_at <= now() then
///         delete from email_verification_codes where email = p_email;
///         return jsonb_build_object('outcome', 'expired');
///     end if;
///
///     if pending.code = p_code then
///         delete from email_verification_codes where email = p_email;
///         return jsonb_build_object('outcome', 'accepted');
///     end if;
///
///     if pending.attempts + 1 >= p_max_attempts then
///         delete from email_verification_codes where email = p_email;
///         return jsonb_build_object('outcome', 'exhausted');
///     end if;
///
///     update email_verification_codes
///     set attempts = attempts + 1
///     where email = p_email;
///     return jsonb_build_object('outcome', 'mismatch', 'attempts', pending.attempts + 1);
/// end;
/// $$;
///
/// revoke execute on function consume_verification_code(text, text, integer)
///     from public, anon, authenticated;
/// grant execute on function consume_verification_code(text, text, integer)
///     to service_role;
/// ```
pub const CONSUME_CODE_FUNCTION: &str = "consume_verification_code";

/// Result of [`CONSUME_CODE_FUNCTION`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum Consumed {
    Accepted,
    Expired,
    Mismatch { attempts: u32 },
    Exhausted,
    NotFound,
}

impl Consumed {
    fn into_result(self) -> Result<(), CodeError> {
        let check = match self {
            Self::NotFound => return Err(CodeError::NotFound),
            Self::Accepted => Check::Accept,
            Self::Expired => Check::Expired,
            Self::Mismatch { attempts } => Check::Retry {
                attempts: attempts.min(MAX_FAILED_ATTEMPTS - 1),
            },
            Self::Exhausted => Check::Exhausted,
        };
        check.into_result()
    }
}

/// Code store backed by a PostgREST table.
///
/// The client must be a service-role view
/// ([`SupabaseClient::service_role`]).
#[derive(Clone)]
pub struct SupabaseCodeStore {
    client: SupabaseClient,
    ttl: Duration,
}

impl SupabaseCodeStore {
    #[must_use]
    pub const fn new(client: SupabaseClient, ttl: Duration) -> Self {
        Self { client, ttl }
    }

    pub(crate) const fn ttl(&self) -> Duration {
        self.ttl
    }

    pub(crate) async fn issue(&self, email: &Email) -> Result<IssuedCode, SupabaseError> {
        let code = generate_code();
        let expires_at = expiry_from(Utc::now(), self.ttl);
        let row = StoredCode::new(email, &code, expires_at);

        // Upsert on the primary key replaces the previous code and resets attempts
        self.client
            .insert(CODES_TABLE, &[row], Some("email"))
            .await?;

        Ok(IssuedCode { code, expires_at })
    }

    pub(crate) async fn consume(
        &self,
        email: &Email,
        guess: &VerificationCode,
    ) -> Result<(), CodeError> {
        let value = self
            .client
            .rpc(
                CONSUME_CODE_FUNCTION,
                &json!({
                    "p_email": email.as_str(),
                    "p_code": guess.as_str(),
                    "p_max_attempts": MAX_FAILED_ATTEMPTS,
                }),
            )
            .await?;

        let consumed: Consumed = serde_json::from_value(value)
            .map_err(|e| SupabaseError::Parse(format!("{CONSUME_CODE_FUNCTION}: {e}")))?;
        consumed.into_result()
    }
}
