use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};

use crate::{
    domain::flow_definition::{FlowDefinition, FlowId},
    domain::flow_execution::{
        ExecutionCompletion, ExecutionId, ExecutionStatus, FlowExecution, NewFlowExecution,
    },
    domain::repository::{FlowDefinitionRepository, FlowExecutionRepository},
    CoreError,
};

/// Status a runner reports for a finished flow
pub const RUNNER_COMPLETED: &str = "completed";

/// Hands a flow definition to whatever actually interprets the graph
#[async_trait]
pub trait FlowRunner: Send + Sync {
    /// Run the flow and return the raw result object. The object is expected
    /// to carry `status`, and optionally `output` and `error`.
    async fn run(&self, definition: &FlowDefinition) -> Result<Value, CoreError>;
}

/// Outcome of a dispatched execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionReport {
    /// The completed execution row
    pub execution: FlowExecution,
    /// Raw runner result
    pub result: Value,
}

/// Service that records and dispatches flow executions
pub struct FlowExecutionService {
    definitions: Arc<dyn FlowDefinitionRepository>,
    executions: Arc<dyn FlowExecutionRepository>,
    runner: Arc<dyn FlowRunner>,
}

impl FlowExecutionService {
    /// Create a new flow execution service
    pub fn new(
        definitions: Arc<dyn FlowDefinitionRepository>,
        executions: Arc<dyn FlowExecutionRepository>,
        runner: Arc<dyn FlowRunner>,
    ) -> Self {
        Self {
            definitions,
            executions,
            runner,
        }
    }

    /// Execute a flow on behalf of `triggered_by`.
    ///
    /// Once the row is inserted it is always completed. Any failure after
    /// that point, from the runner or from the store, marks the row failed
    /// before the error is returned.
    pub async fn execute(&self, flow_id: &FlowId, triggered_by: &str) -> Result<ExecutionReport, CoreError> {
        let span = info_span!("execute_flow", %flow_id, %triggered_by);
        async move {
            let definition = self
                .definitions
                .find_by_id(flow_id)
                .await?
                .ok_or_else(|| CoreError::FlowDefinitionNotFound(flow_id.0.clone()))?;

            let execution = self
                .executions
                .insert(NewFlowExecution {
                    flow_id: flow_id.clone(),
                    status: ExecutionStatus::Running,
                    started_at: Utc::now(),
                    triggered_by: Some(triggered_by.to_string()),
                })
                .await?;

            info!(execution_id = %execution.id, "Dispatching flow");

            match self.run_and_complete(&definition, execution.id).await {
                Ok(report) => {
                    info!(
                        execution_id = %report.execution.id,
                        status = %report.execution.status,
                        "Flow execution finished"
                    );
                    Ok(report)
                }
                Err(err) => {
                    error!(execution_id = %execution.id, %err, "Flow execution failed");
                    self.mark_failed(execution.id, &err).await;
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_and_complete(
        &self,
        definition: &FlowDefinition,
        execution_id: ExecutionId,
    ) -> Result<ExecutionReport, CoreError> {
        let result = self.runner.run(definition).await?;

        let execution = self
            .executions
            .complete(execution_id, completion_from_result(&result)?)
            .await?;

        self.definitions
            .record_execution(&definition.id, Utc::now())
            .await?;

        Ok(ExecutionReport { execution, result })
    }

    /// Errors from this update are logged, not returned
    async fn mark_failed(&self, execution_id: ExecutionId, err: &CoreError) {
        let completion = ExecutionCompletion {
            status: ExecutionStatus::Failed,
            completed_at: Utc::now(),
            logs: None,
            error: Some(err.to_string()),
        };

        if let Err(update_err) = self.executions.complete(execution_id, completion).await {
            error!(%execution_id, err = %update_err, "Failed to mark execution as failed");
        }
    }
}

fn completion_from_result(result: &Value) -> Result<ExecutionCompletion, CoreError> {
    let status = match result.get("status").and_then(Value::as_str) {
        Some(RUNNER_COMPLETED) => ExecutionStatus::Succeeded,
        _ => ExecutionStatus::Failed,
    };

    let error = match result.get("error") {
        Some(Value::String(message)) => Some(message.clone()),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    };

    Ok(ExecutionCompletion {
        status,
        completed_at: Utc::now(),
        logs: Some(serde_json::to_string(result)?),
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn completed_result_succeeds() {
        let completion = completion_from_result(&json!({"status": "completed", "output": {"a": 1}})).unwrap();
        assert_eq!(completion.status, ExecutionStatus::Succeeded);
        assert_eq!(completion.error, None);
        assert_eq!(
            crate::domain::flow_execution::decode_output(completion.logs.as_deref()),
            json!({"a": 1})
        );
    }

    #[test]
    fn any_other_status_fails_and_keeps_error() {
        let completion = completion_from_result(&json!({"status": "error", "error": "boom"})).unwrap();
        assert_eq!(completion.status, ExecutionStatus::Failed);
        assert_eq!(completion.error.as_deref(), Some("boom"));

        let completion = completion_from_result(&json!({"output": 1})).unwrap();
        assert_eq!(completion.status, ExecutionStatus::Failed);
    }
}
