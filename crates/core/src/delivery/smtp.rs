use anyhow::Context;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

use crate::config::Settings;
use crate::delivery::Mailer;
use crate::error::{BriefingError, Result};
use crate::render::RenderedReport;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: Mailbox,
    pub to: Mailbox,
    pub timeout: Duration,
}

impl SmtpConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let username = settings.require_email_user()?.to_string();
        let password = settings.require_email_password()?.to_string();
        let from = parse_mailbox("EMAIL_USER", &username)?;
        let to = parse_mailbox("EMAIL_TO", settings.recipient()?)?;

        Ok(Self {
            host: settings.smtp_host().to_string(),
            port: settings.smtp_port()?,
            username,
            password,
            from,
            to,
            timeout: settings.smtp_timeout()?,
        })
    }
}

fn parse_mailbox(name: &str, raw: &str) -> Result<Mailbox> {
    raw.trim()
        .parse::<Mailbox>()
        .map_err(|e| BriefingError::config(format!("{name} is not a valid address ({raw:?}): {e}")))
}

/// STARTTLS submission. Every `deliver` builds its own transport, so each
/// attempt is a fresh connect/login/send/quit session.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(SmtpConfig::from_settings(settings)?))
    }

    pub fn message(&self, report: &RenderedReport) -> anyhow::Result<Message> {
        Message::builder()
            .from(self.config.from.clone())
            .to(self.config.to.clone())
            .subject(report.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(report.html.clone())
            .context("failed to build email message")
    }

    fn transport(&self) -> anyhow::Result<AsyncSmtpTransport<Tokio1Executor>> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
            .with_context(|| format!("invalid SMTP relay {}", self.config.host))?
            .port(self.config.port)
            .credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ))
            .timeout(Some(self.config.timeout))
            .build();
        Ok(transport)
    }
}

#[async_trait::async_trait]
impl Mailer for SmtpMailer {
    async fn deliver(&self, report: &RenderedReport) -> anyhow::Result<()> {
        let message = self.message(report)?;
        let transport = self.transport()?;
        tracing::debug!(host = %self.config.host, port = self.config.port, "opening SMTP session");
        transport
            .send(message)
            .await
            .with_context(|| format!("SMTP send via {}:{} failed", self.config.host, self.config.port))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            email_user: Some("me@example.com".to_string()),
            email_password: Some("app-password".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn config_defaults_to_gmail_submission_and_sender_as_recipient() {
        let cfg = SmtpConfig::from_settings(&settings()).unwrap();
        assert_eq!(cfg.host, "smtp.gmail.com");
        assert_eq!(cfg.port, 587);
        assert_eq!(cfg.to.email.to_string(), "me@example.com");
        assert_eq!(cfg.timeout, Duration::from_secs(30));
    }

    #[test]
    fn missing_password_is_a_configuration_error() {
        let s = Settings {
            email_password: None,
            ..settings()
        };
        let err = SmtpConfig::from_settings(&s).unwrap_err();
        assert!(err.to_string().contains("GMAIL_APP_PASSWORD"));
    }

    #[test]
    fn invalid_recipient_is_a_configuration_error() {
        let s = Settings {
            email_to: Some("not an address".to_string()),
            ..settings()
        };
        let err = SmtpConfig::from_settings(&s).unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }

    #[test]
    fn message_is_html_addressed_to_recipient() {
        let s = Settings {
            email_to: Some("desk@example.com".to_string()),
            ..settings()
        };
        let mailer = SmtpMailer::from_settings(&s).unwrap();
        let report = RenderedReport {
            subject: "Daily Market Briefing".to_string(),
            html: "<p>$182.72</p>".to_string(),
        };
        let raw = String::from_utf8(mailer.message(&report).unwrap().formatted()).unwrap();
        assert!(raw.contains("From: me@example.com"));
        assert!(raw.contains("To: desk@example.com"));
        assert!(raw.contains("Subject: Daily Market Briefing"));
        assert!(raw.contains("Content-Type: text/html; charset=utf-8"));
    }
}
