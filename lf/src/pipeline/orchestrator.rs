//! Pipeline orchestrator
//!
//! Phase 1 ingests (health-gated, per-source failure tolerant), phase 2
//! transforms (critical steps abort). Exactly one "started" notification is
//! sent on entry and exactly one "success" or "failure" notification on exit.
//! A failure is notified and then returned to the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::{PhaseError, PipelineError};
use crate::config::Config;
use crate::domain::{PipelineKind, PipelineRun, TransformStep, format_duration};
use crate::ingest::{AirbyteClient, CancellationToken, IngestionOptions, IngestionOrchestrator};
use crate::notify::{Notification, Notifier, Severity, create_notifier, send_guarded};
use crate::transform::{DbtCli, TransformRunner};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What a run does, independent of how the collaborators are wired
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub pipeline_name: String,
    pub run_ingestion: bool,
    pub run_transformations: bool,
    pub sources: Vec<String>,
    pub steps: Vec<TransformStep>,
    pub incremental_steps: Vec<TransformStep>,
    pub timeout: Option<Duration>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PipelineOptions {
    fn from(config: &Config) -> Self {
        Self {
            pipeline_name: config.notify.pipeline.clone(),
            run_ingestion: config.pipeline.run_ingestion,
            run_transformations: config.pipeline.run_transformations,
            sources: config.ingestion.sources.clone(),
            steps: config.transform.steps.clone(),
            incremental_steps: config.transform.incremental_steps.clone(),
            timeout: config.pipeline.timeout(),
        }
    }
}

pub struct PipelineOrchestrator {
    ingestion: IngestionOrchestrator,
    transform: TransformRunner,
    notifier: Arc<dyn Notifier>,
    options: PipelineOptions,
}

impl PipelineOrchestrator {
    pub fn new(
        ingestion: IngestionOrchestrator,
        transform: TransformRunner,
        notifier: Arc<dyn Notifier>,
        options: PipelineOptions,
    ) -> Self {
        debug!(?options, "PipelineOrchestrator::new: called");
        Self {
            ingestion,
            transform,
            notifier,
            options,
        }
    }

    /// Wire the Airbyte, dbt and notification adapters from configuration
    pub fn from_config(config: &Config) -> eyre::Result<Self> {
        debug!("PipelineOrchestrator::from_config: called");
        let airbyte = Arc::new(AirbyteClient::from_config(&config.ingestion)?);
        let ingestion = IngestionOrchestrator::new(
            airbyte.clone(),
            airbyte,
            IngestionOptions::from(&config.ingestion),
        );
        let transform = TransformRunner::new(
            Arc::new(DbtCli::from_config(&config.transform)),
            config.transform.project_dir.clone(),
        );
        let notifier = create_notifier(&config.notify)?;
        Ok(Self::new(ingestion, transform, notifier, PipelineOptions::from(config)))
    }

    /// Cancelling this token stops in-flight sync polling and fails the run
    pub fn cancel_token(&self) -> CancellationToken {
        self.ingestion.cancel_token()
    }

    /// Daily run: ingestion then the full transform sequence
    pub async fn run(&self) -> Result<PipelineRun, PipelineError> {
        debug!("PipelineOrchestrator::run: called");
        let mut run = PipelineRun::start(PipelineKind::Daily);
        info!(run_id = %run.id, "Starting daily ETL pipeline");
        self.notify("Daily ETL pipeline started", Severity::Info).await;

        let outcome = self.with_deadline(self.daily_phases(&mut run)).await;
        self.conclude(run, outcome).await
    }

    /// Incremental run: ingestion then best-effort state-modified transforms
    pub async fn run_incremental(&self) -> Result<PipelineRun, PipelineError> {
        debug!("PipelineOrchestrator::run_incremental: called");
        let mut run = PipelineRun::start(PipelineKind::Incremental);
        info!(run_id = %run.id, "Starting incremental sync");
        self.notify("Incremental sync started", Severity::Info).await;

        let outcome = self.with_deadline(self.incremental_phases(&mut run)).await;
        self.conclude(run, outcome).await
    }

    async fn daily_phases(&self, run: &mut PipelineRun) -> Result<(), PhaseError> {
        if self.options.run_ingestion {
            info!("Phase 1: ingestion");
            self.ingest(run).await?;
        } else {
            info!("Ingestion disabled, skipping phase 1");
        }

        if self.options.run_transformations {
            info!("Phase 2: transformations");
            // Results land on the run as each step finishes, so a deadline keeps them
            self.transform
                .run_into(&self.options.steps, &mut run.transformation_results)
                .await?;
            info!(step_count = run.transformation_results.len(), "Transformations finished");
        } else {
            info!("Transformations disabled, skipping phase 2");
        }
        Ok(())
    }

    async fn incremental_phases(&self, run: &mut PipelineRun) -> Result<(), PhaseError> {
        self.ingest(run).await?;
        self.transform
            .run_best_effort_into(&self.options.incremental_steps, &mut run.transformation_results)
            .await;
        Ok(())
    }

    async fn ingest(&self, run: &mut PipelineRun) -> Result<(), PhaseError> {
        let report = self.ingestion.run(&self.options.sources).await?;
        if report.succeeded.is_empty() {
            warn!("No successful ingestion, continuing with transformations");
        } else {
            info!(sources = report.succeeded.len(), "Ingestion complete");
        }
        run.ingestion_results = report.succeeded;
        run.failed_sources = report.failed;
        run.skipped_sources = report.skipped;
        Ok(())
    }

    async fn with_deadline<F>(&self, phases: F) -> Result<(), PhaseError>
    where
        F: Future<Output = Result<(), PhaseError>>,
    {
        match self.options.timeout {
            Some(limit) => match tokio::time::timeout(limit, phases).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    error!(?limit, "Pipeline deadline exceeded");
                    Err(PhaseError::Timeout(limit))
                }
            },
            None => phases.await,
        }
    }

    async fn conclude(&self, run: PipelineRun, outcome: Result<(), PhaseError>) -> Result<PipelineRun, PipelineError> {
        match outcome {
            Ok(()) => {
                let run = run.finish_success();
                let message = success_message(&run);
                info!("{}", message);
                self.notify(message, Severity::Success).await;
                Ok(run)
            }
            Err(cause) => {
                let run = run.finish_failure(cause.to_string());
                let message = failure_message(&run, &cause);
                error!("{}", message);
                self.notify(message, Severity::Error).await;
                Err(PipelineError {
                    run: Box::new(run),
                    cause,
                })
            }
        }
    }

    async fn notify(&self, message: impl Into<String>, severity: Severity) {
        let notification = Notification::new(self.options.pipeline_name.clone(), message, severity);
        send_guarded(self.notifier.as_ref(), &notification).await;
    }
}

fn success_message(run: &PipelineRun) -> String {
    let finished = run.completed_at.unwrap_or_else(chrono::Utc::now);
    format!(
        "Pipeline {} completed successfully\n\
         Summary:\n\
         - Duration: {}\n\
         - Ingestions: {} succeeded, {} failed, {} skipped\n\
         - Transform steps: {} ({} failed)\n\
         - Started: {}\n\
         - Finished: {}",
        run.kind.title(),
        format_duration(run.duration()),
        run.ingestion_results.len(),
        run.failed_sources.len(),
        run.skipped_sources.len(),
        run.transformation_results.len(),
        run.failed_step_count(),
        run.started_at.format(TIMESTAMP_FORMAT),
        finished.format(TIMESTAMP_FORMAT),
    )
}

fn failure_message(run: &PipelineRun, cause: &PhaseError) -> String {
    let failed_at = run.completed_at.unwrap_or_else(chrono::Utc::now);
    format!(
        "Pipeline {} failed\n\
         Error: {}\n\
         - Duration until failure: {}\n\
         - Started: {}\n\
         - Failed at: {}",
        run.kind.title(),
        cause,
        format_duration(run.duration()),
        run.started_at.format(TIMESTAMP_FORMAT),
        failed_at.format(TIMESTAMP_FORMAT),
    )
}
