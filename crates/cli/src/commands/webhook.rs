//! Email webhook diagnostics.
//!
//! # Environment Variables
//!
//! - `N8N_WEBHOOK_URL` (or `VITE_N8N_WEBHOOK_URL`) - workflow endpoint

use serde_json::{Value, json};
use vanguard_core::{Email, OperationResult};
use vanguard_onboarding::codes::generate_code;
use vanguard_onboarding::config::EmailConfig;
use vanguard_onboarding::mailer::{OutgoingEmail, WebhookMailer};

use super::{CommandError, REQUEST_TIMEOUT, SAMPLE_EXPIRY_MINUTES};

const SHAPE_SUBJECT: &str = "Voice Vanguard Vault webhook payload check";
const SHAPE_BODY: &str = "<p>If you can read this, the payload shape works.</p>";

/// Every payload shape the workflow might expect, labelled.
#[must_use]
pub fn shape_payloads(to: &str) -> Vec<(&'static str, Value)> {
    let message = json!({ "to": to, "subject": SHAPE_SUBJECT, "body": SHAPE_BODY });
    vec![
        ("to/subject/body", message.clone()),
        (
            "to/subject/html",
            json!({ "to": to, "subject": SHAPE_SUBJECT, "html": SHAPE_BODY }),
        ),
        (
            "to/subject/text",
            json!({ "to": to, "subject": SHAPE_SUBJECT, "text": "If you can read this, the payload shape works." }),
        ),
        ("email wrapper", json!({ "email": message })),
        ("data wrapper", json!({ "data": message })),
        ("array", json!([message])),
    ]
}

/// POST each payload shape and print status and raw body.
///
/// Informational only: a rejected shape is not a failure.
///
/// # Errors
///
/// Returns error if no URL is available or the client cannot be built.
pub async fn shapes(to: &str, url: Option<&str>) -> Result<(), CommandError> {
    let url = match url {
        Some(url) => url.to_string(),
        None => EmailConfig::from_env()?
            .webhook_url
            .ok_or(CommandError::NotConfigured("N8N_WEBHOOK_URL"))?,
    };
    let mailer = WebhookMailer::new(&url, REQUEST_TIMEOUT)?;

    tracing::info!("Probing {}", mailer.url());
    for (label, payload) in shape_payloads(to) {
        match mailer.post_json(&payload).await {
            Ok(reply) => {
                println!("[{label}] status {}", reply.status);
                println!("[{label}] body: {}", reply.body);
            }
            Err(e) => println!("[{label}] request failed: {e}"),
        }
    }
    Ok(())
}

/// Send one verification-style email through the configured webhook.
///
/// # Errors
///
/// Returns error if the webhook is not configured or rejects the message.
pub async fn send(to: &str) -> Result<(), CommandError> {
    let to = Email::parse(to)?;
    let url = EmailConfig::from_env()?
        .webhook_url
        .ok_or(CommandError::NotConfigured("N8N_WEBHOOK_URL"))?;
    let mailer = WebhookMailer::new(&url, REQUEST_TIMEOUT)?;

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
