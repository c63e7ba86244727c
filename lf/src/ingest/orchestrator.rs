//! Ingestion orchestrator
//!
//! Health-gates the ingestion backend, triggers one sync per source, then
//! polls every triggered job to a terminal state. A failing source never
//! affects its siblings; only an unhealthy backend or cancellation aborts the
//! phase.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::{CancellationToken, HealthProbe, IngestError, Ingestor, JobStatus, PollTimer, Tick};
use crate::config::IngestionConfig;
use crate::domain::SyncJob;

/// Polling behaviour for one ingestion phase
#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub poll_interval: Duration,
    pub job_timeout: Duration,
    pub max_unknown_polls: u32,
    pub max_poll_errors: u32,
    pub parallel_polling: bool,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self::from(&IngestionConfig::default())
    }
}

impl From<&IngestionConfig> for IngestionOptions {
    fn from(config: &IngestionConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            job_timeout: config.job_timeout(),
            max_unknown_polls: config.max_unknown_polls,
            max_poll_errors: config.max_poll_errors,
            parallel_polling: config.parallel_polling,
        }
    }
}

/// Outcome of one ingestion phase
#[derive(Debug, Clone, Default)]
pub struct IngestionReport {
    /// Jobs that reached Succeeded, in source order
    pub succeeded: Vec<SyncJob>,
    /// Jobs that failed or timed out, in source order
    pub failed: Vec<SyncJob>,
    /// Sources whose trigger call failed
    pub skipped: Vec<String>,
}

impl IngestionReport {
    pub fn succeeded_sources(&self) -> Vec<&str> {
        self.succeeded.iter().map(|j| j.source_id.as_str()).collect()
    }

    pub fn timed_out_count(&self) -> usize {
        self.failed
            .iter()
            .filter(|j| j.status == crate::domain::SyncJobStatus::TimedOut)
            .count()
    }
}

pub struct IngestionOrchestrator {
    probe: Arc<dyn HealthProbe>,
    ingestor: Arc<dyn Ingestor>,
    options: IngestionOptions,
    cancel: CancellationToken,
}

impl IngestionOrchestrator {
    pub fn new(probe: Arc<dyn HealthProbe>, ingestor: Arc<dyn Ingestor>, options: IngestionOptions) -> Self {
        debug!(?options, "IngestionOrchestrator::new: called");
        Self {
            probe,
            ingestor,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops any in-flight polling when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the phase over `sources`
    pub async fn run(&self, sources: &[String]) -> Result<IngestionReport, IngestError> {
        debug!(?sources, "IngestionOrchestrator::run: called");
        info!(source_count = sources.len(), "Starting ingestion");

        self.ensure_healthy().await?;

        let mut report = IngestionReport::default();
        let mut jobs = Vec::new();
        for source_id in sources {
            if self.cancel.is_cancelled() {
                debug!("IngestionOrchestrator::run: cancelled during trigger fan-out");
                return Err(IngestError::Cancelled);
            }
            match self.ingestor.trigger(source_id).await {
                Ok(job_id) => {
                    info!(%source_id, %job_id, "Sync triggered");
                    jobs.push(SyncJob::started(source_id.clone(), job_id));
                }
                Err(e) => {
                    error!(%source_id, error = %e, "Failed to trigger sync, skipping source");
                    report.skipped.push(source_id.clone());
                }
            }
        }

        let finished = if self.options.parallel_polling {
            debug!(job_count = jobs.len(), "IngestionOrchestrator::run: polling concurrently");
            join_all(jobs.into_iter().map(|job| self.wait_for_job(job)))
                .await
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?
        } else {
            let mut finished = Vec::with_capacity(jobs.len());
            for job in jobs {
                finished.push(self.wait_for_job(job).await?);
            }
            finished
        };

        for job in finished {
            if job.is_succeeded() {
                report.succeeded.push(job);
            } else {
                report.failed.push(job);
            }
        }

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            timed_out = report.timed_out_count(),
            skipped = report.skipped.len(),
            "Ingestion finished: {} successful syncs {:?}",
            report.succeeded.len(),
            report.succeeded_sources()
        );
        Ok(report)
    }

    async fn ensure_healthy(&self) -> Result<(), IngestError> {
        debug!("IngestionOrchestrator::ensure_healthy: called");
        match self.probe.check().await {
            Ok(true) => {
                info!("Ingestion backend is healthy");
                Ok(())
            }
            Ok(false) => {
                warn!("Ingestion backend reported unavailable, aborting");
                Err(IngestError::Unhealthy("backend reported unavailable".to_string()))
            }
            Err(e) => {
                error!(error = %e, "Health check failed, aborting");
                Err(IngestError::Unhealthy(e.to_string()))
            }
        }
    }

    /// Poll one job until terminal; only cancellation is returned as an error
    async fn wait_for_job(&self, mut job: SyncJob) -> Result<SyncJob, IngestError> {
        debug!(%job.source_id, %job.job_id, "IngestionOrchestrator::wait_for_job: called");
        info!(source_id = %job.source_id, job_id = %job.job_id, "Waiting for sync to complete");

        let timer = PollTimer::new(self.options.poll_interval, self.options.job_timeout, self.cancel.clone());
        let mut unknown_streak = 0u32;
        let mut error_streak = 0u32;

        loop {
            match self.ingestor.poll_status(&job.job_id).await {
                Ok(status) => {
                    error_streak = 0;
                    debug!(source_id = %job.source_id, %status, "Sync status");
                    match status {
                        JobStatus::Succeeded => {
                            job.succeed();
                            info!(source_id = %job.source_id, duration = ?job.duration(), "Sync completed successfully");
                            return Ok(job);
                        }
                        JobStatus::Failed | JobStatus::Cancelled => {
                            error!(source_id = %job.source_id, %status, "Sync failed");
                            job.fail(format!("sync finished with status {}", status));
                            return Ok(job);
                        }
                        JobStatus::Running => {
                            unknown_streak = 0;
                        }
                        JobStatus::Unknown(ref raw) => {
                            unknown_streak += 1;
                            warn!(source_id = %job.source_id, %raw, unknown_streak, "Unrecognised sync status");
                            if unknown_streak >= self.options.max_unknown_polls {
                                error!(source_id = %job.source_id, %raw, "Too many unrecognised statuses");
                                job.fail(format!(
                                    "unrecognised status '{}' reported {} times in a row",
                                    raw, unknown_streak
                                ));
                                return Ok(job);
                            }
                        }
                    }
                }
                Err(e) => {
                    error_streak += 1;
                    warn!(source_id = %job.source_id, error = %e, error_streak, "Failed to poll sync status");
                    if !e.is_retryable() {
                        error!(source_id = %job.source_id, error = %e, "Poll error is not retryable, giving up on sync");
                        job.fail(format!("status polling failed: {}", e));
                        return Ok(job);
                    }
                    if error_streak >= self.options.max_poll_errors {
                        error!(source_id = %job.source_id, "Giving up on sync after repeated poll errors");
                        job.fail(format!("status polling failed {} times in a row: {}", error_streak, e));
                        return Ok(job);
                    }
                }
            }

            if timer.expired() {
                error!(source_id = %job.source_id, timeout = ?self.options.job_timeout, "Timed out waiting for sync");
                job.time_out(format!("no terminal status within {:?}", self.options.job_timeout));
                return Ok(job);
            }

            if timer.wait().await == Tick::Cancelled {
                warn!(source_id = %job.source_id, "Polling cancelled");
                return Err(IngestError::Cancelled);
            }
        }
    }
}
