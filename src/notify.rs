//! Outbound delivery of raised warnings.
//!
//! The payload contract is just the message text. The webhook notifier posts
//! `{"text": message}`, which Slack-style incoming webhooks accept directly.

use std::time::Duration;

use crate::model::NotifyError;

/// Delivers a warning message. Failures are logged by the caller and never
/// abort a pipeline run.
pub trait Notifier: Send + Sync {
    fn send(&self, message: &str) -> Result<(), NotifyError>;
}

/// Writes warnings to the log. Always succeeds.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, message: &str) -> Result<(), NotifyError> {
        tracing::warn!(target: "aqmon_service::warning", "{}", message);
        Ok(())
    }
}

/// Posts warnings to an HTTP webhook.
pub struct WebhookNotifier {
    client: reqwest::blocking::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::Webhook(format!("Failed to build client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Notifier for WebhookNotifier {
    fn send(&self, message: &str) -> Result<(), NotifyError> {
        let payload = serde_json::json!({ "text": message });

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .map_err(|e| NotifyError::Webhook(format!("Failed to send webhook: {}", e)))?;

        if !response.status().is_success() {
            return Err(NotifyError::Webhook(format!(
                "Webhook returned status {}",
                response.status()
            )));
        }

        tracing::debug!(url = %self.url, "Webhook notification sent");
        Ok(())
    }
}

/// Sends to every inner notifier, even after one fails.
pub struct FanoutNotifier {
    targets: Vec<Box<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(targets: Vec<Box<dyn Notifier>>) -> Self {
        Self { targets }
    }
}

impl Notifier for FanoutNotifier {
    fn send(&self, message: &str) -> Result<(), NotifyError> {
        let errors: Vec<NotifyError> = self
            .targets
            .iter()
            .filter_map(|target| target.send(message).err())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(NotifyError::Multiple(errors))
        }
    }
}
