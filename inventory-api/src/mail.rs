//! Outbound mail for warranty notices, sent through SES.

use async_trait::async_trait;
use aws_sdk_sesv2 as ses;
use inventory_core::{ConfigError, UpstreamError};
use ses::config::Region;
use ses::types::{Body, Content, Destination, EmailContent, Message};

/// Sender, recipient and SES region.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub sender: String,
    pub receiver: String,
    pub region: String,
}

impl MailConfig {
    /// Load from `SENDER_EMAIL`, `RECEIVER_EMAIL` and `MAIL_REGION` (default us-east-1).
    pub fn from_env() -> Result<Self, ConfigError> {
        let required = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingRequired {
                    field: key.to_string(),
                })
        };
        Ok(Self {
            sender: required("SENDER_EMAIL")?,
            receiver: required("RECEIVER_EMAIL")?,
            region: std::env::var("MAIL_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        })
    }
}

/// Plain-text mail delivery.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(
        &self,
        from: &str,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), UpstreamError>;
}

#[derive(Clone, Debug)]
pub struct SesMailTransport {
    inner: ses::Client,
}

impl SesMailTransport {
    pub fn new(inner: ses::Client) -> Self {
        Self { inner }
    }

    /// Build a client for `config.region` using the default credential chain.
    pub async fn from_config(config: &MailConfig) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;
        Self::new(ses::Client::new(&sdk_config))
    }
}

fn mail_err(err: impl std::fmt::Display) -> UpstreamError {
    UpstreamError::Mail {
        reason: err.to_string(),
    }
}

#[async_trait]
impl MailTransport for SesMailTransport {
    #[tracing::instrument(skip(self, subject, body))]
    async fn send(
        &self,
        from: &str,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), UpstreamError> {
        let destination = Destination::builder().to_addresses(to).build();

        let subject_content = Content::builder()
            .data(subject)
            .charset("UTF-8")
            .build()
            .map_err(mail_err)?;

        let body_content = Content::builder()
            .data(body)
            .charset("UTF-8")
            .build()
            .map_err(mail_err)?;

        let message = Message::builder()
            .subject(subject_content)
            .body(Body::builder().text(body_content).build())
            .build();

        self.inner
            .send_email()
            .from_email_address(from)
            .destination(destination)
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .map_err(|e| mail_err(ses::error::DisplayErrorContext(e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_env::{EnvVarGuard, ENV_LOCK};

    #[test]
    fn test_mail_config_from_env() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _sender = EnvVarGuard::set("SENDER_EMAIL", Some("inventory@example.com"));
        let _receiver = EnvVarGuard::set("RECEIVER_EMAIL", Some("it@example.com"));
        let _region = EnvVarGuard::set("MAIL_REGION", None);

        let config = MailConfig::from_env().unwrap();
        assert_eq!(config.sender, "inventory@example.com");
        assert_eq!(config.region, "us-east-1");
    }

    #[test]
    fn test_mail_config_requires_receiver() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _sender = EnvVarGuard::set("SENDER_EMAIL", Some("inventory@example.com"));
        let _receiver = EnvVarGuard::set("RECEIVER_EMAIL", None);
        assert!(MailConfig::from_env().is_err());
    }
}
