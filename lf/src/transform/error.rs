//! Transform error types

use std::time::Duration;
use thiserror::Error;

use crate::domain::StepResult;

/// Errors that can occur while running transform commands
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Invalid command: {0:?}")]
    InvalidCommand(String),

    #[error("Failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with code {}: {output}", exit_code_label(.exit_code))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("'{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// A critical step failed; `results` holds the steps recorded before it
    #[error("Critical transform step '{command}' failed: {message}")]
    CriticalStepFailed {
        command: String,
        message: String,
        results: Vec<StepResult>,
    },
}

fn exit_code_label(code: &Option<i32>) -> String {
    code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string())
}
