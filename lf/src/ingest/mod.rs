//! Ingestion phase
//!
//! Collaborator traits for the ingestion service (health probe, sync
//! trigger, status poll), the Airbyte HTTP adapter, and the orchestrator that
//! fans syncs out across sources.

use async_trait::async_trait;

mod airbyte;
mod error;
mod orchestrator;
mod timer;
mod types;

pub use airbyte::AirbyteClient;
pub use error::IngestError;
pub use orchestrator::{IngestionOptions, IngestionOrchestrator, IngestionReport};
pub use timer::{PollTimer, Tick};
pub use tokio_util::sync::CancellationToken;
pub use types::JobStatus;

/// Liveness check for the ingestion backend
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// `Ok(false)` and `Err(_)` both mean "do not ingest"
    async fn check(&self) -> Result<bool, IngestError>;
}

/// Sync trigger and status lookup on the ingestion service
#[async_trait]
pub trait Ingestor: Send + Sync {
    /// Start a sync for one source, returning the service-assigned job id
    async fn trigger(&self, source_id: &str) -> Result<String, IngestError>;

    /// Current status of a previously triggered job
    async fn poll_status(&self, job_id: &str) -> Result<JobStatus, IngestError>;
}
