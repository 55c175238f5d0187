use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Length of generated flow identifiers
const FLOW_ID_LEN: usize = 8;

/// Value object: Flow ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowId(pub String);

impl FlowId {
    /// Generate a short lowercase alphanumeric identifier
    pub fn generate() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        FlowId(simple[..FLOW_ID_LEN].to_string())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FlowId {
    fn from(value: &str) -> Self {
        FlowId(value.to_string())
    }
}

/// Aggregate: a stored flow graph.
///
/// `data` holds the serialized nodes and edges. It is never inspected here;
/// interpreting the graph is the job of whatever runner executes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDefinition {
    /// Immutable identifier
    pub id: FlowId,

    /// Display name
    pub title: String,

    /// Opaque graph payload
    pub data: serde_json::Value,

    /// Visibility flag
    pub published: bool,

    /// Owning user
    pub author_id: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,

    /// When the flow was last dispatched for execution
    pub last_executed_at: Option<DateTime<Utc>>,

    /// Number of completed dispatches
    pub execution_count: u64,
}

impl FlowDefinition {
    /// Create a new, unpublished definition with a freshly generated id
    pub fn new(title: impl Into<String>, data: serde_json::Value, author_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: FlowId::generate(),
            title: title.into(),
            data,
            published: false,
            author_id: author_id.into(),
            created_at: now,
            updated_at: now,
            last_executed_at: None,
            execution_count: 0,
        }
    }

    /// Builder-style override of the generated id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = FlowId(id.into());
        self
    }
}

/// A recorded embed view of a flow definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEmbed {
    /// Store-assigned id
    pub id: i64,
    /// Embedded flow
    pub flow_id: FlowId,
    /// Viewer
    pub user_id: String,
    /// Referring page, `"direct"` when the request carried none
    pub referrer: String,
    /// When the embed was opened
    pub created_at: DateTime<Utc>,
}

/// Insert payload for [`FlowEmbed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFlowEmbed {
    pub flow_id: FlowId,
    pub user_id: String,
    pub referrer: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generated_ids_are_short_and_alphanumeric() {
        let id = FlowId::generate();
        assert_eq!(id.as_str().len(), FLOW_ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert_ne!(id, FlowId::generate());
    }

    #[test]
    fn definition_serializes_in_camel_case() {
        let def = FlowDefinition::new("Welcome", json!({"nodes": [], "edges": []}), "user-1")
            .with_id("abc");
        let value = serde_json::to_value(&def).unwrap();

        assert_eq!(value["id"], "abc");
        assert_eq!(value["authorId"], "user-1");
        assert_eq!(value["published"], false);
        assert_eq!(value["executionCount"], 0);
        assert!(value["lastExecutedAt"].is_null());
    }
}
