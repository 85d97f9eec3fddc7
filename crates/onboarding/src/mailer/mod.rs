//! Transactional email delivery.
//!
//! Two senders share one message shape:
//!
//! - [`WebhookMailer`]: POSTs `{to, subject, body}` to the n8n workflow
//! - [`SmtpMailer`]: direct STARTTLS relay via lettre
//!
//! Bodies are rendered from Askama templates. Failed sends are reported,
//! never retried.

mod smtp;
mod webhook;

use askama::Template;
use thiserror::Error;
use vanguard_core::{Email, VerificationCode};

pub use smtp::SmtpMailer;
pub use webhook::{WebhookMailer, WebhookReply};

use crate::config::{EmailConfig, EmailTransport};

/// Product name used in email copy.
pub const PRODUCT_NAME: &str = "Voice Vanguard Vault";

const VERIFICATION_SUBJECT: &str = "Your Voice Vanguard Vault verification code";

/// HTML template for verification code email.
#[derive(Template)]
#[template(path = "email/verification_code.html")]
struct VerificationCodeEmailHtml<'a> {
    code: &'a str,
    full_name: Option<&'a str>,
    product_name: &'a str,
    expires_in_minutes: u64,
}

/// Plain text template for verification code email.
#[derive(Template)]
#[template(path = "email/verification_code.txt")]
struct VerificationCodeEmailText<'a> {
    code: &'a str,
    full_name: Option<&'a str>,
    product_name: &'a str,
    expires_in_minutes: u64,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum MailerError {
    /// HTTP request to the webhook failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The webhook answered but did not accept the message.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Transport selected but not configured.
    #[error("Email transport not configured: {0}")]
    NotConfigured(&'static str),
}

/// A rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl OutgoingEmail {
    /// Render the verification code email.
    ///
    /// # Errors
    ///
    /// Returns error if a template fails to render.
    pub fn verification_code(
        to: &Email,
        code: &VerificationCode,
        full_name: Option<&str>,
        expires_in_minutes: u64,
    ) -> Result<Self, MailerError> {
        let full_name = full_name.map(str::trim).filter(|n| !n.is_empty());
        let html = VerificationCodeEmailHtml {
            code: code.as_str(),
            full_name,
            product_name: PRODUCT_NAME,
            expires_in_minutes,
        }
        .render()?;
        let text = VerificationCodeEmailText {
            code: code.as_str(),
            full_name,
            product_name: PRODUCT_NAME,
            expires_in_minutes,
        }
        .render()?;

        Ok(Self {
            to: to.as_str().to_string(),
            subject: VERIFICATION_SUBJECT.to_string(),
            html,
            text,
        })
    }
}

/// The configured email sender.
#[derive(Clone)]
pub enum Mailer {
    Webhook(WebhookMailer),
    Smtp(SmtpMailer),
}

impl Mailer {
    /// Build the sender selected by `EMAIL_TRANSPORT`.
    ///
    /// # Errors
    ///
    /// Returns error if the selected transport is incomplete or its client
    /// fails to build.
    pub fn from_config(
        config: &EmailConfig,
        timeout: std::time::Duration,
    ) -> Result<Self, MailerError> {
        match config.transport {
            EmailTransport::Webhook => {
                let url = config
                    .webhook_url
                    .as_deref()
                    .ok_or(MailerError::NotConfigured("N8N_WEBHOOK_URL"))?;
                Ok(Self::Webhook(WebhookMailer::new(url, timeout)?))
            }
            EmailTransport::Smtp => {
                let smtp = config
                    .smtp
                    .as_ref()
                    .ok_or(MailerError::NotConfigured("SMTP_HOST"))?;
                Ok(Self::Smtp(SmtpMailer::new(smtp)?))
            }
        }
    }

    /// Transport name, for logs.
    #[must_use]
    pub const fn transport(&self) -> &'static str {
        match self {
            Self::Webhook(_) => "webhook",
            Self::Smtp(_) => "smtp",
        }
    }

    /// Deliver a rendered message.
    ///
    /// # Errors
    ///
    /// Returns error if the sender rejects the message or is unreachable.
    pub async fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError> {
        let result = match self {
            Self::Webhook(mailer) => mailer.send(email).await,
            Self::Smtp(mailer) => mailer.send(email).await,
        };

        match &result {
            Ok(()) => tracing::info!(
                to = %email.to,
                subject = %email.subject,
                transport = self.transport(),
                "Email sent successfully"
            ),
            Err(e) => tracing::error!(
                to = %email.to,
                transport = self.transport(),
                error = %e,
                "Email delivery failed"
            ),
        }
        result
    }

    /// Render and send a verification code.
    ///
    /// # Errors
    ///
    /// Returns error if rendering or delivery fails.
    pub async fn send_verification_code(
        &self,
        to: &Email,
        code: &VerificationCode,
        full_name: Option<&str>,
        expires_in_minutes: u64,
    ) -> Result<(), MailerError> {
        let email = OutgoingEmail::verification_code(to, code, full_name, expires_in_minutes)?;
        self.send(&email).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_email_contains_code() {
        let to = Email::parse("ada@vault.net").unwrap();
        let code = VerificationCode::parse("048213").unwrap();
        let email = OutgoingEmail::verification_code(&to, &code, Some("Ada"), 15).unwrap();

        assert_eq!(email.to, "ada@vault.net");
        assert_eq!(email.subject, VERIFICATION_SUBJECT);
        assert!(email.html.contains("048213"));
        assert!(email.text.contains("Your verification code is: 048213"));
        assert!(email.text.starts_with("Hi Ada,"));
        assert!(email.text.contains("expires in 15 minutes"));
    }

    #[test]
    fn test_verification_email_without_name() {
        let to = Email::parse("ada@vault.net").unwrap();
        let code = VerificationCode::parse("111111").unwrap();
        let email = OutgoingEmail::verification_code(&to, &code, Some("  "), 10).unwrap();

        assert!(email.text.starts_with("Thanks for signing up"));
        assert!(email.html.contains("Thanks for signing up"));
    }

    #[test]
    fn test_html_escapes_name() {
        let to = Email::parse("ada@vault.net").unwrap();
        let code = VerificationCode::parse("111111").unwrap();
        let email =
            OutgoingEmail::verification_code(&to, &code, Some("<script>"), 15).unwrap();

        assert!(!email.html.contains("<script>"));
        assert!(email.text.contains("<script>"));
    }
}
