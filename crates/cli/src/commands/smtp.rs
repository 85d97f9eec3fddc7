//! Direct SMTP diagnostics.
//!
//! # Environment Variables
//!
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`
//! - `SMTP_FROM_EMAIL`, `SMTP_FROM_NAME`

use vanguard_core::{Email, OperationResult};
use vanguard_onboarding::codes::generate_code;
use vanguard_onboarding::config::EmailConfig;
use vanguard_onboarding::mailer::{OutgoingEmail, SmtpMailer};

use super::{CommandError, SAMPLE_EXPIRY_MINUTES};

/// Send one verification-style email over SMTP.
///
/// # Errors
///
/// Returns error if SMTP is not configured or the relay refuses the message.
pub async fn send(to: &str) -> Result<(), CommandError> {
    let to = Email::parse(to)?;
    let config = EmailConfig::from_env()?;
    let smtp = config
        .smtp
        .as_ref()
        .ok_or(CommandError::NotConfigured("SMTP_HOST"))?;

    tracing::info!("Sending through {}:{} as {}", smtp.host, smtp.port, smtp.from_mailbox());
    let mailer = SmtpMailer::new(smtp)?;

    let code = generate_code();
    let email = OutgoingEmail::verification_code(&to, &code, None, SAMPLE_EXPIRY_MINUTES)?;
    let result = mailer.send(&email).await;

    let reported = match &result {
        Ok(()) => OperationResult::ok(),
        Err(e) => OperationResult::failure(e.to_string()),
    };
    println!("{}", serde_json::to_string(&reported).unwrap_or_default());

    result?;
    tracing::info!("Sent code {} to {}", code.as_str(), to);
    Ok(())
}
