//! Notifier that writes to the tracing log

use async_trait::async_trait;
use tracing::{error, info};

use super::{Notification, Notifier, NotifyError, Severity};

pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, n: &Notification) -> Result<(), NotifyError> {
        match n.severity {
            Severity::Info | Severity::Success => {
                info!(pipeline = %n.pipeline, status = %n.severity, "Notification: {}", n.message)
            }
            Severity::Error => error!(pipeline = %n.pipeline, status = %n.severity, "Notification: {}", n.message),
        }
        Ok(())
    }
}
