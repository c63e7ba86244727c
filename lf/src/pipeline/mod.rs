//! Pipeline orchestration
//!
//! Composes the ingestion and transformation phases into one run, with
//! start/success/failure notifications and a run-level deadline.

mod error;
mod orchestrator;

pub use error::{PhaseError, PipelineError};
pub use orchestrator::{PipelineOptions, PipelineOrchestrator};
