//! Webhook notifier
//!
//! POSTs the notification as JSON to a chat/incident webhook.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{Notification, Notifier, NotifyError};

pub struct WebhookNotifier {
    url: String,
    http: Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout_ms: u64) -> Result<Self, NotifyError> {
        let url = url.into();
        debug!(%url, timeout_ms, "WebhookNotifier::new: called");
        let http = Client::builder().timeout(Duration::from_millis(timeout_ms)).build()?;
        Ok(Self { url, http })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        debug!(url = %self.url, severity = %notification.severity, "WebhookNotifier::send: called");
        let response = self.http.post(&self.url).json(notification).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            debug!(%status, "WebhookNotifier::send: rejected");
            return Err(NotifyError::Rejected { status, message });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Severity;

    #[tokio::test]
    async fn test_unreachable_webhook_is_network_error() {
        let notifier = WebhookNotifier::new("http://127.0.0.1:1/hook", 2_000).unwrap();
        let result = notifier
            .send(&Notification::new("lakehouse-etl", "Pipeline started", Severity::Info))
            .await;
        assert!(matches!(result, Err(NotifyError::Network(_))));
    }
}
