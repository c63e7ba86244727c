//! Ingestion error types

use std::time::Duration;
use thiserror::Error;

/// Errors raised by ingestion adapters and the ingestion orchestrator
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Ingestion backend unhealthy: {0}")]
    Unhealthy(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Ingestion cancelled")]
    Cancelled,
}

impl IngestError {
    /// Whether retrying the same call could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            IngestError::Api { status, .. } => *status >= 500 || *status == 429,
            IngestError::Network(_) => true,
            IngestError::Timeout(_) => true,
            IngestError::Unhealthy(_) => false,
            IngestError::InvalidResponse(_) => false,
            IngestError::Cancelled => false,
        }
    }
}
