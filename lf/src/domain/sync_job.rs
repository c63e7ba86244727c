//! SyncJob domain type
//!
//! Tracks one triggered ingestion sync from trigger until a terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sync job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncJobStatus {
    /// Triggered, still being polled
    Started,
    /// Ingestion service reported success
    Succeeded,
    /// Ingestion service reported failure/cancellation, or polling gave up
    Failed,
    /// Per-job deadline elapsed before a terminal status was observed
    TimedOut,
}

impl SyncJobStatus {
    /// Whether no further transition can occur
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Started)
    }
}

impl std::fmt::Display for SyncJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// One ingestion sync, created once the ingestion service has assigned a job id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncJob {
    /// Connection identifier on the ingestion service
    pub source_id: String,

    /// Job identifier assigned by the ingestion service at trigger time
    pub job_id: String,

    /// Current status
    pub status: SyncJobStatus,

    /// Trigger timestamp
    pub started_at: DateTime<Utc>,

    /// Set exactly when `status` is terminal
    pub completed_at: Option<DateTime<Utc>>,

    /// Reason for a Failed/TimedOut outcome
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncJob {
    /// Record a freshly triggered job
    pub fn started(source_id: impl Into<String>, job_id: impl Into<String>) -> Self {
        let source_id = source_id.into();
        let job_id = job_id.into();
        debug!(%source_id, %job_id, "SyncJob::started: called");
        Self {
            source_id,
            job_id,
            status: SyncJobStatus::Started,
            started_at: Utc::now(),
            completed_at: None,
            error: None,
        }
    }

    pub fn succeed(&mut self) {
        debug!(%self.source_id, %self.job_id, "SyncJob::succeed: called");
        self.finish(SyncJobStatus::Succeeded, None);
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        debug!(%self.source_id, %self.job_id, %reason, "SyncJob::fail: called");
        self.finish(SyncJobStatus::Failed, Some(reason));
    }

    pub fn time_out(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        debug!(%self.source_id, %self.job_id, %reason, "SyncJob::time_out: called");
        self.finish(SyncJobStatus::TimedOut, Some(reason));
    }

    /// Terminal states are sticky: a second transition is ignored
    fn finish(&mut self, status: SyncJobStatus, error: Option<String>) {
        if self.status.is_terminal() {
            debug!(current = %self.status, requested = %status, "SyncJob::finish: already terminal, ignoring");
            return;
        }
        self.status = status;
        self.error = error;
        self.completed_at = Some(Utc::now());
    }

    pub fn is_succeeded(&self) -> bool {
        self.status == SyncJobStatus::Succeeded
    }

    /// Wall-clock time from trigger to terminal state
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|end| end - self.started_at)
    }
}
