//! Flow runners
//!
//! The server never interprets flow graphs itself. It either forwards the
//! definition to a remote executor or, when none is configured, answers with
//! a canned local result.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use flowdeck_core::{CoreError, FlowDefinition, FlowId, FlowRunner};

static NULL: Value = Value::Null;

/// Request body sent to a remote executor: the flow id plus the graph's
/// `nodes` and `edges`, null when the definition lacks them
#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    flow_id: &'a FlowId,
    nodes: &'a Value,
    edges: &'a Value,
}

impl<'a> ExecuteRequest<'a> {
    fn from_definition(definition: &'a FlowDefinition) -> Self {
        Self {
            flow_id: &definition.id,
            nodes: definition.data.get("nodes").unwrap_or(&NULL),
            edges: definition.data.get("edges").unwrap_or(&NULL),
        }
    }
}

/// Runner that POSTs the definition to a remote executor endpoint
pub struct HttpFlowRunner {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpFlowRunner {
    /// Create a runner for `endpoint` with a per-request timeout
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::FlowExecutionError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl FlowRunner for HttpFlowRunner {
    async fn run(&self, definition: &FlowDefinition) -> Result<Value, CoreError> {
        debug!(flow_id = %definition.id, endpoint = %self.endpoint, "Calling remote executor");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&ExecuteRequest::from_definition(definition))
            .send()
            .await
            .map_err(|e| CoreError::FlowExecutionError(format!("Executor request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::FlowExecutionError(format!(
                "Executor responded with {}: {}",
                status, body
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| CoreError::FlowExecutionError(format!("Invalid executor response: {}", e)))
    }
}

/// Runner used when no remote executor is configured
#[derive(Debug, Default)]
pub struct LocalFlowRunner;

#[async_trait]
impl FlowRunner for LocalFlowRunner {
    async fn run(&self, definition: &FlowDefinition) -> Result<Value, CoreError> {
        info!(flow_id = %definition.id, "No executor configured, completing flow locally");

        Ok(json!({
            "status": "completed",
            "output": { "message": "Flow executed locally (no executor configured)" },
            "timestamp": Utc::now().to_rfc3339(),
        }))
    }
}
