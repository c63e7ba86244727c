//! Domain types for lakeflow
//!
//! Core domain types: SyncJob, TransformStep/StepResult, PipelineRun.
//! None of these are persisted; they live for the duration of one run.

mod id;
mod run;
mod step;
mod sync_job;

pub use id::generate_id;
pub(crate) use run::format_duration;
pub use run::{PipelineKind, PipelineRun, PipelineRunStatus};
pub use step::{StepResult, StepStatus, TransformStep};
pub use sync_job::{SyncJob, SyncJobStatus};
