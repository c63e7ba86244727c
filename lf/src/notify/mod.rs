//! Pipeline notifications
//!
//! Notifications are a side channel: a failed send is logged and dropped so
//! it can never replace the pipeline's own outcome.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

mod log;
mod webhook;

pub use self::log::LogNotifier;
pub use self::webhook::WebhookNotifier;

use crate::config::NotifyConfig;

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Structured notification payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    #[serde(rename = "status")]
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub pipeline: String,
}

impl Notification {
    pub fn new(pipeline: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
            timestamp: Utc::now(),
            pipeline: pipeline.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Webhook returned {status}: {message}")]
    Rejected { status: u16, message: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Sends to every inner notifier; the first error is reported after all have been tried
pub struct MultiNotifier {
    inner: Vec<Arc<dyn Notifier>>,
}

impl MultiNotifier {
    pub fn new(inner: Vec<Arc<dyn Notifier>>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Notifier for MultiNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        debug!(count = self.inner.len(), "MultiNotifier::send: called");
        let mut first_error = None;
        for notifier in &self.inner {
            if let Err(e) = notifier.send(notification).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Log notifier, plus a webhook when one is configured
pub fn create_notifier(config: &NotifyConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    let mut inner: Vec<Arc<dyn Notifier>> = vec![Arc::new(LogNotifier)];
    if let Some(url) = config.resolve_webhook_url() {
        debug!(%url, "create_notifier: webhook configured");
        inner.push(Arc::new(WebhookNotifier::new(url, config.timeout_ms)?));
    }
    Ok(Arc::new(MultiNotifier::new(inner)))
}

/// Send without letting a transport failure escape
pub async fn send_guarded(notifier: &dyn Notifier, notification: &Notification) {
    debug!(severity = %notification.severity, "send_guarded: called");
    if let Err(e) = notifier.send(notification).await {
        warn!(error = %e, severity = %notification.severity, "Failed to send notification");
    }
}
