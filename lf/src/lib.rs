//! lakeflow - Lakehouse ETL Orchestrator
//!
//! Drives one end-to-end refresh of a lakehouse: trigger and poll source
//! syncs on an ingestion service, then run an ordered sequence of
//! transformation commands, reporting start and outcome through a
//! notification channel.
//!
//! # Core Concepts
//!
//! - **Health Gate**: no sync is triggered unless the ingestion service reports itself available
//! - **Per-Source Tolerance**: one failing source never sinks the others
//! - **Critical Steps**: a failing critical transform step ends the run; others are recorded and skipped
//! - **Guarded Notifications**: a broken notification channel never changes the outcome
//!
//! # Modules
//!
//! - [`domain`] - Run, sync job, and transform step records
//! - [`ingest`] - Ingestion traits, Airbyte adapter, and ingestion orchestrator
//! - [`transform`] - Transform tool trait, dbt adapter, and step runner
//! - [`notify`] - Notification payloads and channels
//! - [`pipeline`] - Two-phase pipeline orchestrator
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod ingest;
pub mod notify;
pub mod pipeline;
pub mod transform;

// Re-export commonly used types
pub use config::{Config, IngestionConfig, NotifyConfig, PipelineConfig, TransformConfig};
pub use domain::{
    PipelineKind, PipelineRun, PipelineRunStatus, StepResult, StepStatus, SyncJob, SyncJobStatus, TransformStep,
};
pub use ingest::{
    AirbyteClient, CancellationToken, HealthProbe, IngestError, IngestionOptions, IngestionOrchestrator, IngestionReport,
    Ingestor, JobStatus,
};
pub use notify::{Notification, Notifier, NotifyError, Severity};
pub use pipeline::{PhaseError, PipelineError, PipelineOptions, PipelineOrchestrator};
pub use transform::{DbtCli, ToolOutput, TransformError, TransformRunner, TransformTool};
