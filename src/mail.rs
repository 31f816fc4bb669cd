use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::debug;

use crate::config::SmtpConfig;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let from = cfg.from.parse::<Mailbox>().context("parse SMTP_FROM")?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
            .context("smtp relay")?
            .port(cfg.port)
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .build();
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse::<Mailbox>().context("parse recipient")?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
            .context("build message")?;
        self.transport.send(message).await.context("smtp send")?;
        debug!(%to, %subject, "email sent");
        Ok(())
    }
}

/// The notification bodies the core sends. Plain inline-styled HTML, one
/// function per template.
pub mod templates {
    fn wrap(inner: &str) -> String {
        format!(
            "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\
             <h2 style=\"color: #2c5530;\">Student Cooperative</h2>{inner}\
             <p><strong>The Student Cooperative Team</strong></p></div>"
        )
    }

    pub fn registration_received(name: &str) -> (String, String) {
        let body = format!(
            "<h3>Application Received</h3>\
             <p>Hello {name},</p>\
             <p>Thank you for applying for membership of the Student Cooperative.</p>\
             <p>Your application has been received and is being reviewed by our staff. \
             We will email you once the review is complete.</p>"
        );
        ("Application Received - Awaiting Review".into(), wrap(&body))
    }

    pub fn approved(name: &str) -> (String, String) {
        let body = format!(
            "<h3 style=\"color: #28a745;\">Application Approved</h3>\
             <p>Hello {name},</p>\
             <p>Your membership application has been <strong>APPROVED</strong>.</p>\
             <p>You can now log in and use all member services. Welcome aboard!</p>"
        );
        ("Congratulations! Your Application Was Approved".into(), wrap(&body))
    }

    pub fn rejected(name: &str, reason: &str) -> (String, String) {
        let body = format!(
            "<h3 style=\"color: #dc3545;\">Application Not Approved</h3>\
             <p>Hello {name},</p>\
             <p>We are sorry, but your membership application could not be approved.</p>\
             <p><strong>Reason:</strong> {reason}</p>\
             <p>You may apply again once the requirements are met. \
             If you have questions, please contact us.</p>"
        );
        ("Your Application Status".into(), wrap(&body))
    }

    pub fn reset_password(name: &str, reset_url: &str) -> (String, String) {
        let body = format!(
            "<h3>Reset Password</h3>\
             <p>Hello {name},</p>\
             <p>You asked to reset the password of your Student Cooperative account.</p>\
             <div style=\"text-align: center;\">\
             <a href=\"{reset_url}\" style=\"background-color: #2c5530; color: white; \
             padding: 12px 24px; text-decoration: none; border-radius: 5px; \
             display: inline-block;\">Reset Password</a></div>\
             <p>This link is valid for 10 minutes. If you did not request a reset, \
             ignore this email.</p>"
        );
        ("Reset Your Password".into(), wrap(&body))
    }

    pub fn login_code(name: &str, code: &str) -> (String, String) {
        let body = format!(
            "<h3>One-Time Login Code</h3>\
             <p>Hello {name},</p>\
             <p>Here is your one-time login code. It is valid for 5 minutes.</p>\
             <div style=\"font-size: 28px; font-weight: bold; letter-spacing: 4px; \
             padding: 12px 20px; background: #f3f4f6; display: inline-block; \
             border-radius: 8px;\">{code}</div>\
             <p style=\"margin-top: 16px;\">Enter this code on the code-login page.</p>"
        );
        ("Your One-Time Login Code".into(), wrap(&body))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn templates_embed_their_inputs() {
            let (subject, html) = registration_received("Alice");
            assert!(subject.contains("Received"));
            assert!(html.contains("Hello Alice,"));

            let (_, html) = approved("Bob");
            assert!(html.contains("APPROVED"));
            assert!(html.contains("Hello Bob,"));

            let (_, html) = rejected("Carol", "Incomplete documents");
            assert!(html.contains("Incomplete documents"));

            let (_, html) = reset_password("Dave", "https://coop.example/#/reset?token=abc123");
            assert!(html.contains("https://coop.example/#/reset?token=abc123"));
            assert!(html.contains("10 minutes"));

            let (_, html) = login_code("Erin", "493021");
            assert!(html.contains("493021"));
            assert!(html.contains("5 minutes"));
        }
    }
}
