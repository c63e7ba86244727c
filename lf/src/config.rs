//! lakeflow configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::TransformStep;

/// Main lakeflow configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR); the CLI flag wins
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Ingestion service and sync polling
    pub ingestion: IngestionConfig,

    /// Transform tool and step sequences
    pub transform: TransformConfig,

    /// Notification channel
    pub notify: NotifyConfig,

    /// Phase toggles and the run-level deadline
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.run_ingestion && self.ingestion.sources.is_empty() {
            return Err(eyre::eyre!("ingestion.sources is empty but pipeline.run-ingestion is enabled"));
        }
        if self.ingestion.poll_interval_secs == 0 {
            return Err(eyre::eyre!("ingestion.poll-interval-secs must be greater than zero"));
        }
        if self.ingestion.job_timeout_minutes == 0 {
            return Err(eyre::eyre!("ingestion.job-timeout-minutes must be greater than zero"));
        }
        if self.pipeline.run_transformations && self.transform.steps.is_empty() {
            return Err(eyre::eyre!(
                "transform.steps is empty but pipeline.run-transformations is enabled"
            ));
        }
        if self.ingestion.max_unknown_polls == 0 {
            return Err(eyre::eyre!("ingestion.max-unknown-polls must be greater than zero"));
        }
        if self.ingestion.max_poll_errors == 0 {
            return Err(eyre::eyre!("ingestion.max-poll-errors must be greater than zero"));
        }
        if let Some(step) = self.transform.steps.iter().find(|s| s.command.trim().is_empty()) {
            return Err(eyre::eyre!("transform step has an empty command: {:?}", step));
        }
        if let Some(step) = self
            .transform
            .incremental_steps
            .iter()
            .find(|s| s.command.trim().is_empty())
        {
            return Err(eyre::eyre!("incremental transform step has an empty command: {:?}", step));
        }
        if self.pipeline.timeout_minutes == Some(0) {
            return Err(eyre::eyre!("pipeline.timeout-minutes must be greater than zero when set"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Project-local config: .lakeflow.yml
        let local_config = PathBuf::from(".lakeflow.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // User config: ~/.config/lakeflow/lakeflow.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("lakeflow").join("lakeflow.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Ingestion service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Ingestion API base URL (including the version prefix)
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Connection identifiers to sync, in order
    pub sources: Vec<String>,

    /// Timeout for the health probe in seconds
    #[serde(rename = "health-timeout-secs")]
    pub health_timeout_secs: u64,

    /// Timeout for trigger/poll HTTP requests in seconds
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Fixed delay between status polls in seconds
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,

    /// Per-job wall-clock deadline in minutes
    #[serde(rename = "job-timeout-minutes")]
    pub job_timeout_minutes: u64,

    /// Consecutive unrecognised statuses before a job is failed
    #[serde(rename = "max-unknown-polls")]
    pub max_unknown_polls: u32,

    /// Consecutive poll request errors before a job is failed
    #[serde(rename = "max-poll-errors")]
    pub max_poll_errors: u32,

    /// Poll all triggered jobs concurrently instead of one after another
    #[serde(rename = "parallel-polling")]
    pub parallel_polling: bool,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://airbyte-server.airbyte.svc.cluster.local:8001/api/v1".to_string(),
            sources: vec![
                "facebook-ads-connection".to_string(),
                "google-ads-connection".to_string(),
                "activecampaign-connection".to_string(),
            ],
            health_timeout_secs: 30,
            request_timeout_secs: 30,
            poll_interval_secs: 30,
            job_timeout_minutes: 30,
            max_unknown_polls: 10,
            max_poll_errors: 3,
            parallel_polling: false,
        }
    }
}

impl IngestionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_minutes * 60)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Transform tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Working directory of the transform project
    #[serde(rename = "project-dir")]
    pub project_dir: PathBuf,

    /// Directory holding the tool's connection profiles
    #[serde(rename = "profiles-dir")]
    pub profiles_dir: PathBuf,

    /// Per-command timeout in seconds
    #[serde(rename = "command-timeout-secs")]
    pub command_timeout_secs: u64,

    /// Ordered steps for the daily run
    pub steps: Vec<TransformStep>,

    /// Ordered steps for the incremental run (criticality is ignored there)
    #[serde(rename = "incremental-steps")]
    pub incremental_steps: Vec<TransformStep>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("/opt/lakeflow/dbt"),
            profiles_dir: PathBuf::from("/opt/lakeflow/dbt"),
            command_timeout_secs: 3600,
            steps: TransformStep::default_sequence(),
            incremental_steps: TransformStep::incremental_sequence(),
        }
    }
}

impl TransformConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Pipeline name stamped on every notification
    pub pipeline: String,

    /// Webhook URL; takes precedence over `webhook-url-env`
    #[serde(rename = "webhook-url", skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Environment variable consulted for the webhook URL
    #[serde(rename = "webhook-url-env")]
    pub webhook_url_env: String,

    /// Webhook request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            pipeline: "lakehouse-etl".to_string(),
            webhook_url: None,
            webhook_url_env: "NOTIFICATION_WEBHOOK_URL".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl NotifyConfig {
    /// Resolve the webhook URL from config, then the environment
    pub fn resolve_webhook_url(&self) -> Option<String> {
        self.webhook_url
            .clone()
            .or_else(|| std::env::var(&self.webhook_url_env).ok())
            .filter(|u| !u.trim().is_empty())
    }
}

/// Pipeline-level options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    #[serde(rename = "run-ingestion")]
    pub run_ingestion: bool,

    #[serde(rename = "run-transformations")]
    pub run_transformations: bool,

    /// Wall-clock ceiling for the whole run; unset means no ceiling
    #[serde(rename = "timeout-minutes", skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            run_ingestion: true,
            run_transformations: true,
            timeout_minutes: None,
        }
    }
}

impl PipelineConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_minutes.map(|m| Duration::from_secs(m * 60))
    }
}
