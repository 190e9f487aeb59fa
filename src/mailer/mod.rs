//! Outbound email over SMTP.
//!
//! Both messages this service sends carry a single-use link, so the
//! bodies are built inline rather than through a template engine.

use anyhow::{Context, Result};
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl Mailer {
    /// Build an SMTP transport using STARTTLS.
    ///
    /// # Errors
    /// Returns an error when the relay host is invalid.
    pub fn new(
        host: &str,
        port: u16,
        username: String,
        password: SecretString,
        from: String,
    ) -> Result<Self> {
        let credentials = Credentials::new(username, password.expose_secret().to_string());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .context("Invalid SMTP relay host")?
            .port(port)
            .credentials(credentials)
            .build();

        Ok(Self { transport, from })
    }

    /// Send the account-verification link.
    pub async fn send_verification(&self, to: &str, verify_url: &str) -> Result<()> {
        let text = format!("Verify your account by opening this link:\n\n{verify_url}\n");
        let html = format!(
            "<p>Verify your account by clicking the link below.</p>\
             <p><a href=\"{verify_url}\">Verify my account</a></p>"
        );
        self.send(to, "Verify your account", &text, &html).await
    }

    /// Send the password-reset link.
    pub async fn send_reset(&self, to: &str, reset_url: &str) -> Result<()> {
        let text = format!(
            "A password reset was requested for your account.\n\n\
             Open this link to choose a new password:\n\n{reset_url}\n\n\
             If you did not ask for this, ignore this message.\n"
        );
        let html = format!(
            "<p>A password reset was requested for your account.</p>\
             <p><a href=\"{reset_url}\">Choose a new password</a></p>\
             <p>If you did not ask for this, ignore this message.</p>"
        );
        self.send(to, "Reset your password", &text, &html).await
    }

    async fn send(&self, to: &str, subject: &str, text: &str, html: &str) -> Result<()> {
        let message = build_message(&self.from, to, subject, text, html)?;

        self.transport
            .send(message)
            .await
            .context("SMTP delivery failed")?;

        info!(%to, subject, "email sent");

        Ok(())
    }
}

fn build_message(
    from: &str,
    to: &str,
    subject: &str,
    text: &str,
    html: &str,
) -> Result<Message> {
    Message::builder()
        .from(from.parse().context("Invalid from address")?)
        .to(to.parse().context("Invalid recipient address")?)
        .subject(subject)
        .multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(text.to_string()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(html.to_string()),
                ),
        )
        .context("Failed to build message")
}
