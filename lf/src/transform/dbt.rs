//! dbt CLI adapter
//!
//! Runs each command as a child process in the project directory, pointing
//! dbt at the configured profiles directory through `DBT_PROFILES_DIR`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::{ToolOutput, TransformError, TransformTool};
use crate::config::TransformConfig;

/// Output beyond this many bytes is truncated
const MAX_OUTPUT_BYTES: usize = 30_000;

pub struct DbtCli {
    profiles_dir: Option<PathBuf>,
    timeout: Duration,
}

impl DbtCli {
    pub fn new(profiles_dir: Option<PathBuf>, timeout: Duration) -> Self {
        debug!(?profiles_dir, ?timeout, "DbtCli::new: called");
        Self { profiles_dir, timeout }
    }

    pub fn from_config(config: &TransformConfig) -> Self {
        Self::new(Some(config.profiles_dir.clone()), config.command_timeout())
    }
}

/// Combine stdout/stderr the way a terminal would show them
fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    let combined = if stdout.is_empty() {
        stderr.to_string()
    } else if stderr.is_empty() {
        stdout.to_string()
    } else {
        format!("{}\n\nSTDERR:\n{}", stdout, stderr)
    };
    truncate(combined)
}

fn truncate(text: String) -> String {
    if text.len() <= MAX_OUTPUT_BYTES {
        return text;
    }
    let mut cut = MAX_OUTPUT_BYTES;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...\n[truncated, {} bytes total]", &text[..cut], text.len())
}

#[async_trait]
impl TransformTool for DbtCli {
    async fn run(&self, command: &str, working_dir: &Path) -> Result<ToolOutput, TransformError> {
        debug!(%command, ?working_dir, "DbtCli::run: called");
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| TransformError::InvalidCommand(command.to_string()))?;

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(parts).current_dir(working_dir).kill_on_drop(true);
        if let Some(dir) = &self.profiles_dir {
            cmd.env("DBT_PROFILES_DIR", dir);
        }

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                debug!(%e, "DbtCli::run: failed to spawn");
                return Err(TransformError::Spawn {
                    command: command.to_string(),
                    source: e,
                });
            }
            Err(_) => {
                debug!("DbtCli::run: command timed out");
                return Err(TransformError::Timeout {
                    command: command.to_string(),
                    timeout: self.timeout,
                });
            }
        };

        let text = combine_output(&output.stdout, &output.stderr);
        if output.status.success() {
            debug!(output_len = text.len(), "DbtCli::run: command succeeded");
            Ok(ToolOutput { output: text })
        } else {
            debug!(exit_code = ?output.status.code(), "DbtCli::run: command failed");
            Err(TransformError::CommandFailed {
                command: command.to_string(),
                exit_code: output.status.code(),
                output: text,
            })
        }
    }
}
