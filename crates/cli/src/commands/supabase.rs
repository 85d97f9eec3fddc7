//! Supabase diagnostics.
//!
//! # Environment Variables
//!
//! - `SUPABASE_URL` (or `VITE_SUPABASE_URL`)
//! - `SUPABASE_ANON_KEY` (or `VITE_SUPABASE_ANON_KEY`)
//! - `SUPABASE_SERVICE_ROLE_KEY` (optional; enables the service-role check)

use serde_json::Value;
use vanguard_core::Email;
use vanguard_onboarding::codes::CODES_TABLE;
use vanguard_onboarding::config::SupabaseConfig;
use vanguard_onboarding::supabase::{Filter, SignUpResponse, SupabaseClient};

use super::{CommandError, REQUEST_TIMEOUT};

/// Tables the app reads right after sign-in.
const APP_TABLES: [&str; 2] = ["profiles", "mock_interviews"];

fn client() -> Result<SupabaseClient, CommandError> {
    let config = SupabaseConfig::from_env()?;
    Ok(SupabaseClient::new(&config, REQUEST_TIMEOUT)?)
}

/// Report auth settings, whether the app tables are readable, and whether the
/// verification code table is closed to the anon key.
///
/// # Errors
///
/// Returns error if the settings endpoint cannot be read. Table read
/// failures are printed, not returned.
pub async fn check() -> Result<(), CommandError> {
    let client = client()?;
    tracing::info!("Checking {}", client.base_url());

    let settings = client.settings().await?;
    println!(
        "Email confirmation required: {}",
        settings.email_confirmation_required()
    );
    println!("Sign-up disabled: {}", settings.disable_signup);
    println!("Providers: {}", settings.enabled_providers().join(", "));

    for table in APP_TABLES {
        match client
            .select::<Value>(table, &[Filter::limit(1)], None)
            .await
        {
            Ok(rows) => println!("Table {table}: reachable ({} row(s) visible)", rows.len()),
            Err(e) => println!("Table {table}: {e}"),
        }
    }

    let codes = [Filter::select("email"), Filter::limit(1)];
    match client.select::<Value>(CODES_TABLE, &codes, None).await {
        Ok(_) => println!(
            "Table {CODES_TABLE}: WARNING readable with the anon key; revoke anon and authenticated grants"
        ),
        Err(e) if matches!(e.status(), Some(401 | 403)) => {
            println!("Table {CODES_TABLE}: closed to the anon key");
        }
        Err(e) => println!("Table {CODES_TABLE}: {e}"),
    }
    match client.service_role() {
        Ok(admin) => match admin.select::<Value>(CODES_TABLE, &codes, None).await {
            Ok(_) => println!("Table {CODES_TABLE}: reachable with the service role key"),
            Err(e) => println!("Table {CODES_TABLE} (service role): {e}"),
        },
        Err(_) => println!("Service role key: not set, skipped"),
    }
    Ok(())
}

/// Sign up a real user and report what came back.
///
/// # Errors
///
/// Returns error if the email is invalid or Supabase refuses the sign-up.
pub async fn signup(
    email: &str,
    password: &str,
    full_name: Option<&str>,
) -> Result<(), CommandError> {
    let email = Email::parse(email)?;
    let client = client()?;

    let response = client.sign_up(email.as_str(), password, full_name).await?;
    let user = response.user();
    println!("User id: {}", user.id);
    println!("Email confirmed: {}", user.is_confirmed());

    let access_token = match &response {
        SignUpResponse::Session(session) => {
            println!("Session returned: yes");
            Some(session.access_token.as_str())
        }
        SignUpResponse::User(_) => {
            println!("Session returned: no (email confirmation required)");
            None
        }
    };

    let filters = [Filter::eq("id", user.id), Filter::limit(1)];
    match client
        .select::<Value>("profiles", &filters, access_token)
        .await
    {
        Ok(rows) => match rows.first() {
            Some(row) => println!("Profile row: {row}"),
            None => println!("Profile row: not visible"),
        },
        Err(e) => println!("Profile row: {e}"),
    }
    Ok(())
}
