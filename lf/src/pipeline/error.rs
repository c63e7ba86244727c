//! Pipeline error types

use std::time::Duration;
use thiserror::Error;

use crate::domain::PipelineRun;
use crate::ingest::IngestError;
use crate::transform::TransformError;

/// The fatal condition that ended a phase
#[derive(Debug, Error)]
pub enum PhaseError {
    #[error("Ingestion failed: {0}")]
    Ingestion(#[from] IngestError),

    #[error("Transformation failed: {0}")]
    Transformation(#[from] TransformError),

    #[error("Pipeline exceeded its {0:?} deadline")]
    Timeout(Duration),
}

/// A failed run, carrying the run record as it stood when it failed
#[derive(Debug, Error)]
#[error("Pipeline run {} failed: {cause}", .run.id)]
pub struct PipelineError {
    pub run: Box<PipelineRun>,
    #[source]
    pub cause: PhaseError,
}

impl PipelineError {
    pub fn is_timeout(&self) -> bool {
        matches!(self.cause, PhaseError::Timeout(_))
    }
}
