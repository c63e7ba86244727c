//! Ingestion job status vocabulary

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Job status as reported by the ingestion service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// pending / running / incomplete
    Running,
    /// succeeded / completed
    Succeeded,
    Failed,
    Cancelled,
    /// Anything outside the known vocabulary
    Unknown(String),
}

impl JobStatus {
    /// Map a raw status string onto the known vocabulary (case-insensitive)
    pub fn parse(raw: &str) -> Self {
        debug!(%raw, "JobStatus::parse: called");
        match raw.trim().to_lowercase().as_str() {
            "succeeded" | "completed" => Self::Succeeded,
            "failed" => Self::Failed,
            "cancelled" | "canceled" => Self::Cancelled,
            "running" | "pending" | "incomplete" => Self::Running,
            _ => Self::Unknown(raw.to_string()),
        }
    }

}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Unknown(raw) => write!(f, "unknown({})", raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vocabulary() {
        assert_eq!(JobStatus::parse("succeeded"), JobStatus::Succeeded);
        assert_eq!(JobStatus::parse("completed"), JobStatus::Succeeded);
        assert_eq!(JobStatus::parse("FAILED"), JobStatus::Failed);
        assert_eq!(JobStatus::parse("cancelled"), JobStatus::Cancelled);
        assert_eq!(JobStatus::parse("pending"), JobStatus::Running);
        assert_eq!(JobStatus::parse(" running "), JobStatus::Running);
        assert_eq!(JobStatus::parse("incomplete"), JobStatus::Running);
        assert_eq!(JobStatus::parse("exploded"), JobStatus::Unknown("exploded".to_string()));
    }
}
