pub mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use templates::{InvitationEmail, PasswordResetEmail, WelcomeEmail};

/// Delivers a fully built message. SMTP in production, a recorder in tests.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, message: Message) -> Result<(), String>;
}

#[async_trait]
impl MailTransport for AsyncSmtpTransport<Tokio1Executor> {
    async fn deliver(&self, message: Message) -> Result<(), String> {
        self.send(message)
            .await
            .map(|_| ())
            .map_err(|e| format!("Failed to send email: {e}"))
    }
}

/// Sends the product's notification emails from the configured system address.
pub struct SystemMailer {
    transport: Arc<dyn MailTransport>,
    from: Mailbox,
}

impl SystemMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, String> {
        let creds = Credentials::new(config.user.clone(), config.pass.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| format!("System SMTP error: {e}"))?
            .port(config.port)
            .credentials(creds)
            .build();

        Self::with_transport(Arc::new(transport), &config.from)
    }

    pub fn with_transport(transport: Arc<dyn MailTransport>, from: &str) -> Result<Self, String> {
        let from = from
            .parse()
            .map_err(|e| format!("Invalid from address: {e}"))?;
        Ok(Self { transport, from })
    }

    pub async fn send_welcome(&self, to_email: &str, to_name: &str, login_url: &str) -> Result<(), String> {
        let email = WelcomeEmail {
            name: to_name,
            login_url,
        };
        self.send(
            to_email,
            "Welcome to EduSphere! 🚀",
            "Welcome to EduSphere!".to_string(),
            email.render_html()?,
        )
        .await
    }

    pub async fn send_invitation(&self, to_email: &str, invite: &InvitationEmail<'_>) -> Result<(), String> {
        self.send(
            to_email,
            &format!(
                "You're invited to join {} on EduSphere",
                invite.organization_name
            ),
            invite.render_text()?,
            invite.render_html()?,
        )
        .await
    }

    pub async fn send_password_reset(
        &self,
        to_email: &str,
        reset: &PasswordResetEmail<'_>,
    ) -> Result<(), String> {
        self.send(
            to_email,
            "Password Reset - EduSphere",
            format!("Reset your EduSphere password: {}", reset.reset_url),
            reset.render_html()?,
        )
        .await
    }

    async fn send(&self, to: &str, subject: &str, plain: String, html: String) -> Result<(), String> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse().map_err(|e| format!("Invalid to address: {e}"))?)
            .subject(subject)
            .multipart(MultiPart::alternative_plain_html(plain, html))
            .map_err(|e| format!("Failed to build email: {e}"))?;

        self.transport.deliver(message).await
    }
}
