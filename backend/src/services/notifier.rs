use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::cfg;

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("Invalid mail relay url: {0}")]
    InvalidRelayUrl(#[from] url::ParseError),

    #[error("Mail relay request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Mail relay rejected the message: {0}")]
    Rejected(String),
}

/// Everything needed to deliver one password reset message
#[derive(Clone)]
pub struct ResetEmail {
    pub to_address: String,
    pub recipient_name: String,
    pub tenant_name: Option<String>,
    pub link: String,
}

impl std::fmt::Debug for ResetEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetEmail")
            .field("to_address", &self.to_address)
            .field("recipient_name", &self.recipient_name)
            .field("tenant_name", &self.tenant_name)
            .field("link", &"<redacted>")
            .finish()
    }
}

impl ResetEmail {
    fn subject(&self) -> String {
        match &self.tenant_name {
            Some(tenant) => format!("Reset your {tenant} password"),
            None => "Reset your password".to_string(),
        }
    }

    fn body(&self) -> String {
        format!(
            "Hello {},\n\nA password reset was requested for your account. \
             Open the link below within the next hour to choose a new password:\n\n{}\n\n\
             If you did not request this, you can ignore this message.",
            self.recipient_name, self.link
        )
    }
}

/// Outbound delivery of reset links
#[async_trait]
pub trait EmailNotifier: Send + Sync {
    async fn send_reset_email(&self, email: &ResetEmail) -> Result<(), NotifierError>;
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: String,
    text: String,
}

/// Posts messages as JSON to an HTTP mail relay
pub struct HttpEmailNotifier {
    client: reqwest::Client,
    relay_url: url::Url,
    from_address: String,
    timeout: Duration,
}

impl HttpEmailNotifier {
    pub fn new(client: reqwest::Client, settings: &cfg::MailSettings) -> Result<Self, NotifierError> {
        Ok(Self {
            client,
            relay_url: url::Url::parse(&settings.relay_url)?,
            from_address: settings.from_address.clone(),
            timeout: settings.timeout(),
        })
    }
}

#[async_trait]
impl EmailNotifier for HttpEmailNotifier {
    async fn send_reset_email(&self, email: &ResetEmail) -> Result<(), NotifierError> {
        let message = RelayMessage {
            from: &self.from_address,
            to: &email.to_address,
            subject: email.subject(),
            text: email.body(),
        };

        let response = self
            .client
            .post(self.relay_url.clone())
            .timeout(self.timeout)
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifierError::Rejected(format!("{status}: {body}")));
        }

        tracing::info!(to = %email.to_address, "Reset email handed to mail relay");
        Ok(())
    }
}

/// Stand-in used when no relay is configured. Logs the dispatch, never the link.
pub struct LogEmailNotifier;

#[async_trait]
impl EmailNotifier for LogEmailNotifier {
    async fn send_reset_email(&self, email: &ResetEmail) -> Result<(), NotifierError> {
        tracing::info!(
            to = %email.to_address,
            tenant = ?email.tenant_name,
            subject = %email.subject(),
            "No mail relay configured, reset email not delivered"
        );
        Ok(())
    }
}

/// Picks the HTTP relay when one is configured, otherwise the logging notifier
pub fn notifier_from_settings(
    client: reqwest::Client,
    settings: &cfg::MailSettings,
) -> Result<Arc<dyn EmailNotifier>, NotifierError> {
    if settings.relay_url.trim().is_empty() {
        tracing::warn!("mail.relay_url is empty, reset emails will only be logged");
        return Ok(Arc::new(LogEmailNotifier));
    }
    Ok(Arc::new(HttpEmailNotifier::new(client, settings)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_email() -> ResetEmail {
        ResetEmail {
            to_address: "a@acme.com".to_string(),
            recipient_name: "Ada Admin".to_string(),
            tenant_name: Some("Acme".to_string()),
            link: "http://localhost:3000/reset-password?token=abc".to_string(),
        }
    }

    #[test]
    fn test_subject_mentions_tenant() {
        assert_eq!(sample_email().subject(), "Reset your Acme password");
        let email = ResetEmail {
            tenant_name: None,
            ..sample_email()
        };
        assert_eq!(email.subject(), "Reset your password");
    }

    #[test]
    fn test_body_contains_link() {
        let email = sample_email();
        assert!(email.body().contains(&email.link));
        assert!(email.body().starts_with("Hello Ada Admin"));
    }

    #[test]
    fn test_debug_redacts_link() {
        let debug = format!("{:?}", sample_email());
        assert!(!debug.contains("token=abc"));
    }

    #[test]
    fn test_empty_relay_falls_back_to_log_notifier() {
        let settings = cfg::MailSettings::default();
        assert!(notifier_from_settings(reqwest::Client::new(), &settings).is_ok());
    }

    #[test]
    fn test_invalid_relay_url_is_rejected() {
        let settings = cfg::MailSettings {
            relay_url: "not a url".to_string(),
            ..Default::default()
        };
        let result = notifier_from_settings(reqwest::Client::new(), &settings);
        assert!(matches!(result, Err(NotifierError::InvalidRelayUrl(_))));
    }

    #[tokio::test]
    async fn test_unreachable_relay_reports_failure() {
        let settings = cfg::MailSettings {
            relay_url: "http://127.0.0.1:9/send".to_string(),
            timeout_secs: 2,
            ..Default::default()
        };
        let notifier = HttpEmailNotifier::new(reqwest::Client::new(), &settings).unwrap();
        let result = notifier.send_reset_email(&sample_email()).await;
        assert!(matches!(result, Err(NotifierError::RequestFailed(_))));
    }
}
