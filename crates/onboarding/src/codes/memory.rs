use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use moka::ops::compute::Op;
use vanguard_core::{Email, VerificationCode};

use super::{Check, CodeError, IssuedCode, StoredCode, expiry_from, generate_code};

/// Entries outlive their code by this much so late attempts report `Expired`.
const EVICTION_GRACE: Duration = Duration::from_secs(60);

const MAX_PENDING_CODES: u64 = 10_000;

/// Process-local code store.
///
/// Codes do not survive a restart and are not shared between instances.
#[derive(Clone)]
pub struct MemoryCodeStore {
    codes: Cache<String, StoredCode>,
    ttl: Duration,
}

impl MemoryCodeStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let codes = Cache::builder()
            .max_capacity(MAX_PENDING_CODES)
            .time_to_live(ttl + EVICTION_GRACE)
            .build();
        Self { codes, ttl }
    }

    pub(crate) const fn ttl(&self) -> Duration {
        self.ttl
    }

    pub(crate) async fn issue(&self, email: &Email) -> IssuedCode {
        let code = generate_code();
        let expires_at = expiry_from(Utc::now(), self.ttl);

        self.codes
            .insert(
                email.as_str().to_string(),
                StoredCode::new(email, &code, expires_at),
            )
            .await;

        IssuedCode { code, expires_at }
    }

    pub(crate) async fn consume(
        &self,
        email: &Email,
        guess: &VerificationCode,
    ) -> Result<(), CodeError> {
        let mut outcome = None;

        self.codes
            .entry(email.as_str().to_string())
            .and_compute_with(|entry| {
                let op = match entry {
                    None => Op::Nop,
                    Some(entry) => {
                        let mut stored = entry.into_value();
                        let check = stored.check(guess, Utc::now());
                        outcome = Some(check);
                        match check {
                            Check::Retry { attempts } => {
                                stored.attempts = attempts;
                                Op::Put(stored)
                            }
                            Check::Accept | Check::Expired | Check::Exhausted => Op::Remove,
                        }
                    }
                };
                std::future::ready(op)
            })
            .await;

        outcome.ok_or(CodeError::NotFound)?.into_result()
    }
}
