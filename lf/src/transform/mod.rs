//! Transformation phase
//!
//! The transform tool trait, the dbt CLI adapter, and the runner that walks
//! an ordered step sequence.

use async_trait::async_trait;
use std::path::Path;

mod dbt;
mod error;
mod runner;

pub use dbt::DbtCli;
pub use error::TransformError;
pub use runner::TransformRunner;

/// Captured output of a successful command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub output: String,
}

/// Executes one transform command in a working directory
#[async_trait]
pub trait TransformTool: Send + Sync {
    /// `Err` means the command did not succeed
    async fn run(&self, command: &str, working_dir: &Path) -> Result<ToolOutput, TransformError>;
}
