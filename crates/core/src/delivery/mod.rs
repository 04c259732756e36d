pub mod retry;
pub mod smtp;

use std::sync::Arc;

use crate::config::Settings;
use crate::error::{BriefingError, Result};
use crate::render::RenderedReport;
use retry::{retry, RetryPolicy, Sleeper, TokioSleeper};
use smtp::SmtpMailer;

/// One complete transport session: connect, authenticate, transmit, close.
/// Implementations must not reuse a session across calls.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn deliver(&self, report: &RenderedReport) -> anyhow::Result<()>;
}

/// Receipt for a delivered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub attempts: u32,
}

pub struct DeliveryChannel {
    mailer: Arc<dyn Mailer>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl DeliveryChannel {
    pub fn new(mailer: Arc<dyn Mailer>, sleeper: Arc<dyn Sleeper>, policy: RetryPolicy) -> Self {
        Self {
            mailer,
            sleeper,
            policy,
        }
    }

    /// SMTP delivery with the default policy (5 attempts, 1s doubling).
    pub fn smtp_from_settings(settings: &Settings) -> Result<Self> {
        let mailer = SmtpMailer::from_settings(settings)?;
        Ok(Self::new(
            Arc::new(mailer),
            Arc::new(TokioSleeper),
            RetryPolicy::default(),
        ))
    }

    pub async fn send(&self, report: &RenderedReport) -> Result<DeliveryOutcome> {
        let mailer = &self.mailer;
        let result = retry(
            &self.policy,
            self.sleeper.as_ref(),
            "email_delivery",
            |_| mailer.deliver(report),
        )
        .await;

        match result {
            Ok(((), attempts)) => {
                tracing::info!(attempts, subject = %report.subject, "email sent successfully");
                Ok(DeliveryOutcome { attempts })
            }
            Err(exhausted) => {
                tracing::error!(
                    attempts = exhausted.attempts,
                    error = %exhausted.last_error,
                    "email delivery failed after retries"
                );
                Err(BriefingError::DeliveryExhausted {
                    attempts: exhausted.attempts,
                    source: exhausted.last_error.into(),
                })
            }
        }
    }
}
