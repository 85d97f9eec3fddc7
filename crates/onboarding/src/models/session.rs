//! Session-related types.

use serde::{Deserialize, Serialize};
use vanguard_core::UserId;

use crate::supabase::AuthUser;

/// Public view of a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub email_confirmed: bool,
}

impl From<&AuthUser> for UserSummary {
    fn from(user: &AuthUser) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.user_metadata.full_name.clone(),
            email_confirmed: user.is_confirmed(),
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for the Supabase session (`AuthSession`) of the signed-in user.
    pub const AUTH_SESSION: &str = "auth_session";
}
