//! Transform step definitions and per-execution results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One command in the ordered transform sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformStep {
    /// Command line understood by the transform tool (e.g. "dbt run --models staging")
    pub command: String,

    /// A failing critical step abandons every step after it
    #[serde(default)]
    pub critical: bool,
}

impl TransformStep {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            critical: false,
        }
    }

    pub fn critical(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            critical: true,
        }
    }

    /// Medallion-ordered default sequence: staging and silver builds are critical
    pub fn default_sequence() -> Vec<Self> {
        vec![
            Self::new("dbt deps"),
            Self::new("dbt seed"),
            Self::critical("dbt run --models staging"),
            Self::critical("dbt run --models silver"),
            Self::new("dbt run --models gold"),
            Self::new("dbt test"),
            Self::new("dbt docs generate"),
        ]
    }

    /// State-modified subset used by the incremental run
    pub fn incremental_sequence() -> Vec<Self> {
        vec![
            Self::new("dbt run --models staging --select state:modified+"),
            Self::new("dbt run --models silver --select state:modified+"),
            Self::new("dbt run --models gold --select state:modified+"),
        ]
    }
}

/// Outcome of one step execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Record of one step execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub command: String,
    pub status: StepStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Tool output (stdout/stderr), truncated by the tool adapter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl StepResult {
    pub fn succeeded(command: impl Into<String>, output: String, started_at: DateTime<Utc>) -> Self {
        let command = command.into();
        debug!(%command, "StepResult::succeeded: called");
        Self {
            command,
            status: StepStatus::Succeeded,
            error: None,
            output: Some(output).filter(|o| !o.is_empty()),
            started_at,
            completed_at: Utc::now(),
        }
    }

    pub fn failed(command: impl Into<String>, error: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        let command = command.into();
        let error = error.into();
        debug!(%command, %error, "StepResult::failed: called");
        Self {
            command,
            status: StepStatus::Failed,
            error: Some(error),
            output: None,
            started_at,
            completed_at: Utc::now(),
        }
    }

    pub fn is_succeeded(&self) -> bool {
        self.status == StepStatus::Succeeded
    }
}
