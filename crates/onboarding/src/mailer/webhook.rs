use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use super::{MailerError, OutgoingEmail};

/// Raw webhook answer, as logged by the diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookReply {
    pub status: u16,
    pub body: String,
}

impl WebhookReply {
    /// Whether the workflow accepted the message.
    ///
    /// A 2xx with plain text, an empty body, or JSON without `success: false`
    /// counts as delivered. Anything else is rejected, carrying the workflow's
    /// `error` string unchanged when it sent one.
    ///
    /// # Errors
    ///
    /// Returns [`MailerError::Rejected`].
    pub fn into_result(self) -> Result<(), MailerError> {
        let json: Option<Value> = serde_json::from_str(&self.body).ok();
        let included_error = json
            .as_ref()
            .and_then(|v| v.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string);

        if !(200..300).contains(&self.status) {
            return Err(MailerError::Rejected {
                status: self.status,
                message: included_error
                    .unwrap_or_else(|| format!("Email service returned status {}", self.status)),
            });
        }

        let declined = json
            .as_ref()
            .and_then(|v| v.get("success"))
            .and_then(Value::as_bool)
            == Some(false);
        if declined {
            return Err(MailerError::Rejected {
                status: self.status,
                message: included_error.unwrap_or_else(|| "Failed to send email".to_string()),
            });
        }

        Ok(())
    }
}

/// Sends email through the n8n workflow webhook.
#[derive(Clone)]
pub struct WebhookMailer {
    inner: Arc<WebhookMailerInner>,
}

struct WebhookMailerInner {
    client: reqwest::Client,
    url: String,
}

impl WebhookMailer {
    /// Create a webhook sender.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, MailerError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            inner: Arc::new(WebhookMailerInner {
                client,
                url: url.to_string(),
            }),
        })
    }

    /// Webhook URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// POST an arbitrary JSON payload and return the raw answer.
    ///
    /// # Errors
    ///
    /// Returns [`MailerError::Http`] if the request cannot be sent.
    pub async fn post_json(&self, payload: &Value) -> Result<WebhookReply, MailerError> {
        let response = self
            .inner
            .client
            .post(&self.inner.url)
            .json(payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        tracing::debug!(status, body = %body, "Webhook responded");

        Ok(WebhookReply { status, body })
    }

    /// Send `email` as `{to, subject, body}` with the HTML body.
    ///
    /// # Errors
    ///
    /// Returns error if the webhook is unreachable or rejects the message.
    pub async fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError> {
        let payload = json!({
            "to": email.to,
            "subject": email.subject,
            "body": email.html,
        });
        self.post_json(&payload).await?.into_result()
    }
}
