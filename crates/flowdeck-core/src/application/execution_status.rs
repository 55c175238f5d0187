use std::sync::Arc;
use tracing::debug;

use crate::{
    domain::flow_definition::FlowId,
    domain::flow_execution::ExecutionStatusView,
    domain::repository::FlowExecutionRepository,
    CoreError,
};

/// Read-side projector for flow execution status.
///
/// Holds no mutable state; every call is an independent read.
#[derive(Clone)]
pub struct ExecutionStatusReader {
    executions: Arc<dyn FlowExecutionRepository>,
}

impl ExecutionStatusReader {
    /// Create a new reader over an execution repository
    pub fn new(executions: Arc<dyn FlowExecutionRepository>) -> Self {
        Self { executions }
    }

    /// Project the most recent execution of a flow.
    ///
    /// Returns [`CoreError::ExecutionNotFound`] when the flow has never been
    /// executed. Storage failures are propagated unchanged.
    pub async fn get_latest_status(&self, flow_id: &FlowId) -> Result<ExecutionStatusView, CoreError> {
        let execution = self
            .executions
            .find_latest_for_flow(flow_id)
            .await?
            .ok_or_else(|| CoreError::ExecutionNotFound(flow_id.0.clone()))?;

        debug!(
            flow_id = %flow_id,
            execution_id = %execution.id,
            status = %execution.status,
            "Resolved latest execution"
        );

        Ok(ExecutionStatusView::from(execution))
    }
}
