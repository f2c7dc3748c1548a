use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::SmtpConfig;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let creds = Credentials::new(config.user.clone(), config.pass.clone());
        // Port 465 is implicit TLS; anything else goes through STARTTLS.
        let transport = if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
                .port(config.port)
                .credentials(creds)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
                .port(config.port)
                .credentials(creds)
                .build()
        };
        let from: Mailbox = format!("DevForge Team <{}>", config.from)
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid SMTP_FROM address: {e}"))?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse()
                .map_err(|e| anyhow::anyhow!("invalid recipient {to}: {e}"))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;
        self.transport.send(message).await?;
        info!(%to, %subject, "email sent");
        Ok(())
    }
}

pub fn credentials_email(name: &str, username: &str, password: &str) -> (String, String) {
    let subject = "Your DevForge account credentials".to_string();
    let body = format!(
        "Hi {name},\n\n\
         Welcome to DevForge! Your member account is ready.\n\n\
         Username: {username}\n\
         Password: {password}\n\n\
         Please sign in and change your password from your profile page.\n\n\
         — The DevForge Team"
    );
    (subject, body)
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkSendResult {
    pub email: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Send the same message to every recipient, one at a time with a fixed
/// delay in between so the SMTP provider's rate limit is respected.
/// Failures are independent; one bounce never aborts the rest of the run.
pub async fn send_bulk(
    mailer: &dyn Mailer,
    recipients: &[String],
    subject: &str,
    body: &str,
    delay: Duration,
) -> Vec<BulkSendResult> {
    let mut results = Vec::with_capacity(recipients.len());
    for (i, email) in recipients.iter().enumerate() {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            continue;
        }
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match mailer.send(email, subject, body).await {
            Ok(()) => results.push(BulkSendResult {
                email: email.to_string(),
                success: true,
                error: None,
            }),
            Err(e) => {
                warn!(%email, error = %e, "bulk email send failed");
                results.push(BulkSendResult {
                    email: email.to_string(),
                    success: false,
                    error: Some(e.to_string()),
                });
            }
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FlakyMailer {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Mailer for FlakyMailer {
        async fn send(&self, to: &str, _subject: &str, _body: &str) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(to.to_string());
            if to.starts_with("bounce") {
                anyhow::bail!("mailbox unavailable");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn bulk_send_is_independent_per_recipient() {
        let mailer = FlakyMailer {
            sent: Mutex::new(Vec::new()),
        };
        let recipients = vec![
            "a@example.com".to_string(),
            "bounce@example.com".to_string(),
            "c@example.com".to_string(),
        ];
        let results = send_bulk(&mailer, &recipients, "hi", "body", Duration::ZERO).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[1].error.is_some());
        assert!(results[2].success);
        assert_eq!(mailer.sent.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn bulk_send_skips_invalid_addresses() {
        let mailer = FlakyMailer {
            sent: Mutex::new(Vec::new()),
        };
        let recipients = vec![
            "".to_string(),
            "not-an-address".to_string(),
            "ok@example.com".to_string(),
        ];
        let results = send_bulk(&mailer, &recipients, "hi", "body", Duration::ZERO).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].email, "ok@example.com");
    }

    #[test]
    fn credentials_email_contains_both_credentials() {
        let (subject, body) = credentials_email("Asha", "asharao", "S3cret!pw");
        assert!(subject.contains("credentials"));
        assert!(body.contains("asharao"));
        assert!(body.contains("S3cret!pw"));
    }
}
