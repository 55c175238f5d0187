use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use tracing::warn;

use super::flow_definition::FlowId;

/// Value object: Execution ID, assigned by the store in insertion order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub i64);

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Execution status as written by the worker running the flow.
///
/// Workers are not bound to a fixed vocabulary. Only the exact canonical
/// spellings map to the named variants; every other string is kept verbatim
/// in `Other`, so a stored status always serializes back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExecutionStatus {
    /// Queued, not yet picked up
    Pending,
    /// In progress
    Running,
    /// Finished successfully
    Succeeded,
    /// Finished with an error
    Failed,
    /// Any other stored status string
    Other(String),
}

impl ExecutionStatus {
    /// Parse a stored status string without rewriting it
    pub fn parse(raw: &str) -> Self {
        match raw {
            "pending" => ExecutionStatus::Pending,
            "running" => ExecutionStatus::Running,
            "succeeded" => ExecutionStatus::Succeeded,
            "failed" => ExecutionStatus::Failed,
            _ => ExecutionStatus::Other(raw.to_string()),
        }
    }

    /// Stored string form
    pub fn as_str(&self) -> &str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Succeeded => "succeeded",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Other(raw) => raw,
        }
    }

    /// Whether the status reports a successful run. Also recognises the
    /// `success` and `completed` spellings older workers write.
    pub fn is_success(&self) -> bool {
        match self {
            ExecutionStatus::Succeeded => true,
            ExecutionStatus::Other(raw) => {
                matches!(raw.trim().to_ascii_lowercase().as_str(), "success" | "completed" | "succeeded")
            }
            _ => false,
        }
    }

    /// Whether the status reports a failed run. Also recognises `error`.
    pub fn is_failure(&self) -> bool {
        match self {
            ExecutionStatus::Failed => true,
            ExecutionStatus::Other(raw) => {
                matches!(raw.trim().to_ascii_lowercase().as_str(), "error" | "failed")
            }
            _ => false,
        }
    }

    /// Whether no further transitions are expected
    pub fn is_terminal(&self) -> bool {
        self.is_success() || self.is_failure()
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ExecutionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ExecutionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ExecutionStatus::parse(&raw))
    }
}

/// Aggregate: one execution attempt of a flow definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowExecution {
    /// Store-assigned id
    pub id: ExecutionId,

    /// Executed flow (not enforced as a foreign key)
    pub flow_id: FlowId,

    /// Current status
    pub status: ExecutionStatus,

    /// Set when the row is created
    pub started_at: DateTime<Utc>,

    /// Set once the status is terminal
    pub completed_at: Option<DateTime<Utc>>,

    /// Set only on failure
    pub error: Option<String>,

    /// Serialized log object, expected to carry an `output` key
    pub logs: Option<String>,

    /// User that requested the execution, if known
    pub triggered_by: Option<String>,
}

impl FlowExecution {
    /// Extract the `output` object from the logs blob
    pub fn output(&self) -> Value {
        decode_output(self.logs.as_deref())
    }
}

/// Insert payload for [`FlowExecution`]
#[derive(Debug, Clone, PartialEq)]
pub struct NewFlowExecution {
    pub flow_id: FlowId,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub triggered_by: Option<String>,
}

/// Terminal update applied to an execution row
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionCompletion {
    pub status: ExecutionStatus,
    pub completed_at: DateTime<Utc>,
    pub logs: Option<String>,
    pub error: Option<String>,
}

/// Decode the `output` field of a logs blob.
///
/// Missing logs, malformed JSON and a non-object payload yield an empty
/// object, as does an `output` that is missing, null, `false`, `0` or `""`.
/// Partially written rows must not fail the reader.
pub fn decode_output(logs: Option<&str>) -> Value {
    let Some(raw) = logs else {
        return empty_output();
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(mut map)) => match map.remove("output") {
            Some(output) if is_blank(&output) => empty_output(),
            Some(output) => output,
            None => empty_output(),
        },
        Ok(_) => {
            warn!("Execution logs are not a JSON object, using empty output");
            empty_output()
        }
        Err(err) => {
            warn!(%err, "Failed to decode execution logs, using empty output");
            empty_output()
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn empty_output() -> Value {
    Value::Object(Map::new())
}

/// Normalized projection of the latest execution of a flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStatusView {
    pub execution_id: ExecutionId,
    pub flow_id: FlowId,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub output: Value,
    pub error: Option<String>,
}

impl From<FlowExecution> for ExecutionStatusView {
    fn from(execution: FlowExecution) -> Self {
        let output = execution.output();
        Self {
            execution_id: execution.id,
            flow_id: execution.flow_id,
            status: execution.status,
            started_at: execution.started_at,
            completed_at: execution.completed_at,
            output,
            error: execution.error,
        }
    }
}
