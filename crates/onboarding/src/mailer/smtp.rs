use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use secrecy::ExposeSecret;

use super::{MailerError, OutgoingEmail};
use crate::config::SmtpConfig;

/// Direct SMTP sender.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Create an SMTP sender using a STARTTLS relay.
    ///
    /// # Errors
    ///
    /// Returns error if the relay cannot be configured or the sender address
    /// is invalid.
    pub fn new(config: &SmtpConfig) -> Result<Self, MailerError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        let from = parse_mailbox(&config.from_mailbox())?;

        Ok(Self { transport, from })
    }

    /// Send a multipart email with both plain text and HTML versions.
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be built or the relay rejects it.
    pub async fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError> {
        let message = build_message(self.from.clone(), email)?;
        self.transport.send(message).await?;
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailerError> {
    address
        .parse()
        .map_err(|_| MailerError::InvalidAddress(address.to_string()))
}

fn build_message(from: Mailbox, email: &OutgoingEmail) -> Result<Message, MailerError> {
    Ok(Message::builder()
        .from(from)
        .to(parse_mailbox(&email.to)?)
        .subject(&email.subject)
        .multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(email.text.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(email.html.clone()),
                ),
        )?)
}
