//! PipelineRun domain type
//!
//! One end-to-end execution. A run starts in `Running` and makes exactly one
//! transition, to `Succeeded` or `Failed`. The finishing methods consume the
//! run so a finished run cannot be driven again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::id::generate_id;
use super::{StepResult, SyncJob};

/// Pipeline run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineRunStatus {
    #[default]
    Running,
    Succeeded,
    Failed,
}

impl std::fmt::Display for PipelineRunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Which entry point produced the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    /// Full ingestion plus the complete transform sequence
    Daily,
    /// Ingestion plus best-effort state-modified transforms
    Incremental,
}

impl PipelineKind {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Daily => "daily etl",
            Self::Incremental => "hourly incremental sync",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: String,
    pub kind: PipelineKind,
    pub status: PipelineRunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Jobs that reached Succeeded, in source order
    pub ingestion_results: Vec<SyncJob>,

    /// Jobs that were triggered but failed or timed out
    #[serde(default)]
    pub failed_sources: Vec<SyncJob>,

    /// Sources whose trigger call failed (no job id was ever assigned)
    #[serde(default)]
    pub skipped_sources: Vec<String>,

    /// Transform step outcomes, in execution order
    pub transformation_results: Vec<StepResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineRun {
    pub fn start(kind: PipelineKind) -> Self {
        debug!(?kind, "PipelineRun::start: called");
        Self {
            id: generate_id("run", kind.title()),
            kind,
            status: PipelineRunStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            ingestion_results: Vec::new(),
            failed_sources: Vec::new(),
            skipped_sources: Vec::new(),
            transformation_results: Vec::new(),
            error: None,
        }
    }

    pub fn finish_success(mut self) -> Self {
        debug!(%self.id, "PipelineRun::finish_success: called");
        self.status = PipelineRunStatus::Succeeded;
        self.completed_at = Some(Utc::now());
        self
    }

    pub fn finish_failure(mut self, error: impl Into<String>) -> Self {
        let error = error.into();
        debug!(%self.id, %error, "PipelineRun::finish_failure: called");
        self.status = PipelineRunStatus::Failed;
        self.error = Some(error);
        self.completed_at = Some(Utc::now());
        self
    }

    /// Elapsed time, up to now while still running
    pub fn duration(&self) -> chrono::Duration {
        self.completed_at.unwrap_or_else(Utc::now) - self.started_at
    }

    pub fn failed_step_count(&self) -> usize {
        self.transformation_results.iter().filter(|r| !r.is_succeeded()).count()
    }
}

/// Render a duration as `1h02m03s` / `2m03s` / `3.120s`
pub(crate) fn format_duration(duration: chrono::Duration) -> String {
    let millis = duration.num_milliseconds().max(0);
    let secs = millis / 1000;
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h{:02}m{:02}s", h, m, s)
    } else if m > 0 {
        format!("{}m{:02}s", m, s)
    } else {
        format!("{}.{:03}s", s, millis % 1000)
    }
}
