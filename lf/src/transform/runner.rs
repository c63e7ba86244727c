//! Transformation runner
//!
//! Walks an ordered step sequence. A failing non-critical step is recorded
//! and skipped; a failing critical step ends the phase immediately.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{TransformError, TransformTool};
use crate::domain::{StepResult, TransformStep};

pub struct TransformRunner {
    tool: Arc<dyn TransformTool>,
    working_dir: PathBuf,
}

impl TransformRunner {
    pub fn new(tool: Arc<dyn TransformTool>, working_dir: impl Into<PathBuf>) -> Self {
        let working_dir = working_dir.into();
        debug!(?working_dir, "TransformRunner::new: called");
        Self { tool, working_dir }
    }

    /// Run `steps` in order, stopping at the first failing critical step
    ///
    /// On a critical failure the error carries the results of the steps before it.
    pub async fn run(&self, steps: &[TransformStep]) -> Result<Vec<StepResult>, TransformError> {
        let mut results = Vec::with_capacity(steps.len());
        self.run_into(steps, &mut results).await?;
        Ok(results)
    }

    /// Like [`run`](Self::run), but appends each result to `results` as soon as
    /// its step finishes, so a caller that abandons the future keeps what ran
    pub async fn run_into(&self, steps: &[TransformStep], results: &mut Vec<StepResult>) -> Result<(), TransformError> {
        debug!(step_count = steps.len(), "TransformRunner::run_into: called");
        info!(step_count = steps.len(), "Starting transform pipeline");

        for step in steps {
            let result = self.execute(step).await;
            if result.is_succeeded() {
                info!(command = %step.command, "Transform step succeeded");
                results.push(result);
                continue;
            }

            let message = result.error.clone().unwrap_or_default();
            error!(command = %step.command, critical = step.critical, error = %message, "Transform step failed");
            if step.critical {
                // The failing step travels in the error, not in the results
                return Err(TransformError::CriticalStepFailed {
                    command: step.command.clone(),
                    message,
                    results: results.clone(),
                });
            }
            results.push(result);
        }

        info!("Transform pipeline finished");
        Ok(())
    }

    /// Run every step regardless of failures; criticality is ignored
    pub async fn run_best_effort(&self, steps: &[TransformStep]) -> Vec<StepResult> {
        let mut results = Vec::with_capacity(steps.len());
        self.run_best_effort_into(steps, &mut results).await;
        results
    }

    /// Best-effort variant of [`run_into`](Self::run_into)
    pub async fn run_best_effort_into(&self, steps: &[TransformStep], results: &mut Vec<StepResult>) {
        debug!(step_count = steps.len(), "TransformRunner::run_best_effort_into: called");
        for step in steps {
            let result = self.execute(step).await;
            if let Some(e) = &result.error {
                warn!(command = %step.command, error = %e, "Incremental step failed, continuing");
            }
            results.push(result);
        }
    }

    async fn execute(&self, step: &TransformStep) -> StepResult {
        debug!(command = %step.command, "TransformRunner::execute: called");
        info!(command = %step.command, "Running transform command");
        let started_at = Utc::now();
        match self.tool.run(&step.command, &self.working_dir).await {
            Ok(out) => StepResult::succeeded(step.command.clone(), out.output, started_at),
            Err(e) => StepResult::failed(step.command.clone(), e.to_string(), started_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StepStatus;
    use crate::transform::mock::MockTransformTool;
    use proptest::prelude::*;

    fn runner(tool: Arc<MockTransformTool>) -> TransformRunner {
        TransformRunner::new(tool, "/tmp/dbt")
    }

    fn statuses(results: &[StepResult]) -> Vec<StepStatus> {
        results.iter().map(|r| r.status).collect()
    }

    #[tokio::test]
    async fn test_all_steps_succeed() {
        let tool = Arc::new(MockTransformTool::new());
        let steps = TransformStep::default_sequence();

        let results = runner(tool.clone()).run(&steps).await.unwrap();

        assert_eq!(results.len(), 7);
        assert!(results.iter().all(|r| r.is_succeeded()));
        assert_eq!(tool.calls().len(), 7);
        assert_eq!(results[0].output.as_deref(), Some("ran dbt deps"));
    }

    #[tokio::test]
    async fn test_non_critical_failure_continues() {
        let tool = Arc::new(MockTransformTool::failing(&["dbt seed", "dbt test"]));
        let steps = TransformStep::default_sequence();

        let results = runner(tool.clone()).run(&steps).await.unwrap();

        assert_eq!(
            statuses(&results),
            vec![
                StepStatus::Succeeded,
                StepStatus::Failed,
                StepStatus::Succeeded,
                StepStatus::Succeeded,
                StepStatus::Succeeded,
                StepStatus::Failed,
                StepStatus::Succeeded,
            ]
        );
        assert!(results[1].error.as_deref().unwrap().contains("mock failure"));
        assert_eq!(tool.calls().len(), 7);
    }

    #[tokio::test]
    async fn test_seed_staging_silver_scenario() {
        let tool = Arc::new(MockTransformTool::failing(&["dbt seed", "dbt run --models silver"]));
        let steps = vec![
            TransformStep::new("dbt seed"),
            TransformStep::critical("dbt run --models staging"),
            TransformStep::critical("dbt run --models silver"),
            TransformStep::new("dbt test"),
            TransformStep::new("dbt docs generate"),
        ];

        let err = runner(tool.clone()).run(&steps).await.unwrap_err();

        match &err {
            TransformError::CriticalStepFailed { command, results, .. } => {
                assert_eq!(command, "dbt run --models silver");
                assert_eq!(results.len(), 2);
                assert_eq!(results[0].status, StepStatus::Failed);
                assert_eq!(results[0].command, "dbt seed");
                assert_eq!(results[1].status, StepStatus::Succeeded);
                assert_eq!(results[1].command, "dbt run --models staging");
            }
            other => panic!("expected CriticalStepFailed, got {:?}", other),
        }
        assert_eq!(
            tool.calls(),
            vec!["dbt seed", "dbt run --models staging", "dbt run --models silver"]
        );
    }

    #[tokio::test]
    async fn test_best_effort_ignores_criticality() {
        let tool = Arc::new(MockTransformTool::failing(&["dbt run --models staging"]));
        let steps = vec![
            TransformStep::critical("dbt run --models staging"),
            TransformStep::critical("dbt run --models silver"),
        ];

        let results = runner(tool.clone()).run_best_effort(&steps).await;

        assert_eq!(statuses(&results), vec![StepStatus::Failed, StepStatus::Succeeded]);
        assert_eq!(tool.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_runner_is_repeatable() {
        let tool = Arc::new(MockTransformTool::failing(&["dbt deps", "dbt docs generate"]));
        let steps = TransformStep::default_sequence();
        let runner = runner(tool);

        let first = runner.run(&steps).await.unwrap();
        let second = runner.run(&steps).await.unwrap();

        assert_eq!(statuses(&first), statuses(&second));
    }

    #[tokio::test]
    async fn test_empty_sequence() {
        let tool = Arc::new(MockTransformTool::new());
        let results = runner(tool).run(&[]).await.unwrap();
        assert!(results.is_empty());
    }

    proptest! {
        #[test]
        fn prop_stops_exactly_at_first_critical_failure(
            plan in prop::collection::vec((any::<bool>(), any::<bool>()), 0..12)
        ) {
            // (critical, fails) per step
            let steps: Vec<TransformStep> = plan
                .iter()
                .enumerate()
                .map(|(i, (critical, _))| TransformStep { command: format!("step {}", i), critical: *critical })
                .collect();
            let failing: Vec<String> = plan
                .iter()
                .enumerate()
                .filter(|(_, (_, fails))| *fails)
                .map(|(i, _)| format!("step {}", i))
                .collect();
            let failing_refs: Vec<&str> = failing.iter().map(String::as_str).collect();
            let tool = Arc::new(MockTransformTool::failing(&failing_refs));

            let rt = tokio::runtime::Runtime::new().unwrap();
            let outcome = rt.block_on(runner(tool.clone()).run(&steps));

            let first_critical_failure = plan.iter().position(|(critical, fails)| *critical && *fails);
            match first_critical_failure {
                Some(idx) => {
                    match outcome {
                        Err(TransformError::CriticalStepFailed { results, .. }) => prop_assert_eq!(results.len(), idx),
                        other => prop_assert!(false, "expected critical failure, got {:?}", other),
                    }
                    prop_assert_eq!(tool.calls().len(), idx + 1);
                }
                None => {
                    let results = outcome.unwrap();
                    prop_assert_eq!(results.len(), plan.len());
                    for (result, (_, fails)) in results.iter().zip(plan.iter()) {
                        prop_assert_eq!(result.is_succeeded(), !*fails);
                    }
                }
            }
        }
    }
}
