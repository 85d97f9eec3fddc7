//! Application state shared across handlers.

use std::sync::Arc;

use crate::codes::{CodeStore, MemoryCodeStore, SupabaseCodeStore};
use crate::config::{CodeStoreKind, OnboardingConfig};
use crate::mailer::{Mailer, MailerError};
use crate::services::auth::AuthService;
use crate::supabase::{SupabaseClient, SupabaseError};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("supabase client: {0}")]
    Supabase(#[from] SupabaseError),
    #[error("mailer: {0}")]
    Mailer(#[from] MailerError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Every outbound client is
/// created here once and handed to the handlers; nothing is global.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: OnboardingConfig,
    supabase: SupabaseClient,
    admin: SupabaseClient,
    mailer: Mailer,
    codes: CodeStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if an outbound client cannot be configured, including
    /// a missing service-role key.
    pub fn new(config: OnboardingConfig) -> Result<Self, StateError> {
        let supabase = SupabaseClient::new(&config.supabase, config.http_timeout)?;
        let admin = supabase.service_role()?;
        let mailer = Mailer::from_config(&config.email, config.http_timeout)?;
        let codes = match config.codes.store {
            CodeStoreKind::Memory => CodeStore::Memory(MemoryCodeStore::new(config.codes.ttl)),
            CodeStoreKind::Supabase => {
                CodeStore::Supabase(SupabaseCodeStore::new(admin.clone(), config.codes.ttl))
            }
        };

        tracing::info!(
            email_transport = mailer.transport(),
            code_store = ?config.codes.store,
            "Application state initialized"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                supabase,
                admin,
                mailer,
                codes,
            }),
        })
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &OnboardingConfig {
        &self.inner.config
    }

    /// Get a reference to the Supabase client.
    #[must_use]
    pub fn supabase(&self) -> &SupabaseClient {
        &self.inner.supabase
    }

    /// Service-role client for privileged tables and functions.
    #[must_use]
    pub fn admin(&self) -> &SupabaseClient {
        &self.inner.admin
    }

    /// Get a reference to the email sender.
    #[must_use]
    pub fn mailer(&self) -> &Mailer {
        &self.inner.mailer
    }

    /// Get a reference to the verification code store.
    #[must_use]
    pub fn codes(&self) -> &CodeStore {
        &self.inner.codes
    }

    /// Authentication service over this state's clients.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.supabase(), self.admin(), self.mailer(), self.codes())
    }
}
