use crate::InMemoryStateStoreProvider;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use flowdeck_core::{
    CoreError, ExecutionCompletion, ExecutionId, ExecutionStatus, ExecutionStatusReader,
    FlowDefinition, FlowDefinitionRepository, FlowEmbed, FlowEmbedService, FlowExecutionService,
    FlowId, FlowRunner, NewFlowEmbed, NewFlowExecution, Session,
};
use mockall::mock;
use serde_json::{json, Value};
use std::sync::Arc;

mock! {
    pub Definitions {}

    #[async_trait]
    impl FlowDefinitionRepository for Definitions {
        async fn find_by_id(&self, id: &FlowId) -> Result<Option<FlowDefinition>, CoreError>;
        async fn save(&self, definition: &FlowDefinition) -> Result<(), CoreError>;
        async fn record_execution(&self, id: &FlowId, at: chrono::DateTime<Utc>) -> Result<(), CoreError>;
        async fn record_embed(&self, embed: NewFlowEmbed) -> Result<FlowEmbed, CoreError>;
    }
}

fn new_execution(flow_id: &str, started_at: chrono::DateTime<Utc>, status: ExecutionStatus) -> NewFlowExecution {
    NewFlowExecution {
        flow_id: FlowId::from(flow_id),
        status,
        started_at,
        triggered_by: None,
    }
}

#[tokio::test]
async fn test_flow_definition_repository() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let (definitions, _, _) = provider.create_repositories();

    let definition = FlowDefinition::new("Onboarding", json!({"nodes": [], "edges": []}), "author-1");
    definitions.save(&definition).await?;

    let found = definitions.find_by_id(&definition.id).await?;
    assert_eq!(found, Some(definition.clone()));

    let at = Utc::now();
    definitions.record_execution(&definition.id, at).await?;
    definitions.record_execution(&definition.id, at).await?;

    let found = definitions.find_by_id(&definition.id).await?.unwrap();
    assert_eq!(found.execution_count, 2);
    assert_eq!(found.last_executed_at, Some(at));

    let missing = definitions.record_execution(&FlowId::from("nope"), at).await;
    assert!(matches!(missing, Err(CoreError::FlowDefinitionNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_execution_ids_follow_insertion_order() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let (_, executions, _) = provider.create_repositories();

    let now = Utc::now();
    let first = executions.insert(new_execution("abc", now, ExecutionStatus::Running)).await?;
    let second = executions.insert(new_execution("xyz", now, ExecutionStatus::Running)).await?;

    assert!(second.id > first.id);
    assert_eq!(first.completed_at, None);
    assert_eq!(first.logs, None);

    Ok(())
}

#[tokio::test]
async fn test_latest_execution_uses_started_at_not_insertion_order() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let (_, executions, _) = provider.create_repositories();

    let t0 = Utc::now();
    let newer = executions
        .insert(new_execution("abc", t0 + Duration::seconds(30), ExecutionStatus::Succeeded))
        .await?;
    executions.insert(new_execution("abc", t0, ExecutionStatus::Running)).await?;
    executions
        .insert(new_execution("other", t0 + Duration::seconds(60), ExecutionStatus::Running))
        .await?;

    let latest = executions.find_latest_for_flow(&FlowId::from("abc")).await?.unwrap();
    assert_eq!(latest.id, newer.id);

    let history = executions.list_for_flow(&FlowId::from("abc")).await?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, newer.id);

    assert!(executions.find_latest_for_flow(&FlowId::from("none")).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_equal_start_times_prefer_later_insert() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let (_, executions, _) = provider.create_repositories();

    let t0 = Utc::now();
    executions.insert(new_execution("abc", t0, ExecutionStatus::Running)).await?;
    let second = executions.insert(new_execution("abc", t0, ExecutionStatus::Running)).await?;

    let latest = executions.find_latest_for_flow(&FlowId::from("abc")).await?.unwrap();
    assert_eq!(latest.id, second.id);

    Ok(())
}

#[tokio::test]
async fn test_complete_unknown_execution_fails() {
    let provider = InMemoryStateStoreProvider::new();
    let (_, executions, _) = provider.create_repositories();

    let result = executions
        .complete(
            ExecutionId(99),
            ExecutionCompletion {
                status: ExecutionStatus::Failed,
                completed_at: Utc::now(),
                logs: None,
                error: Some("boom".to_string()),
            },
        )
        .await;

    assert!(matches!(result, Err(CoreError::ExecutionNotFound(_))));
}

#[tokio::test]
async fn test_status_reader_scenario() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let (_, executions, _) = provider.create_repositories();
    let reader = ExecutionStatusReader::new(executions.clone());

    let flow_id = FlowId::from("abc");
    let not_found = reader.get_latest_status(&flow_id).await;
    assert_eq!(not_found, Err(CoreError::ExecutionNotFound("abc".to_string())));

    let t0 = Utc::now();
    executions.insert(new_execution("abc", t0, ExecutionStatus::Running)).await?;
    let second = executions
        .insert(new_execution("abc", t0 + Duration::seconds(5), ExecutionStatus::Running))
        .await?;
    executions
        .complete(
            second.id,
            ExecutionCompletion {
                status: ExecutionStatus::Succeeded,
                completed_at: t0 + Duration::seconds(6),
                logs: Some(r#"{"output":{"x":1}}"#.to_string()),
                error: None,
            },
        )
        .await?;

    let view = reader.get_latest_status(&flow_id).await?;
    assert_eq!(view.execution_id, ExecutionId(2));
    assert_eq!(view.flow_id, flow_id);
    assert_eq!(view.status, ExecutionStatus::Succeeded);
    assert_eq!(view.output, json!({"x": 1}));
    assert_eq!(view.error, None);

    // No writes in between: identical result
    assert_eq!(reader.get_latest_status(&flow_id).await?, view);

    Ok(())
}

#[tokio::test]
async fn test_status_reader_is_idempotent_and_keeps_stored_status() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let (_, executions, _) = provider.create_repositories();
    let flow_id = FlowId::from("legacy");
    let t0 = Utc::now() - Duration::minutes(2);

    let older = executions
        .insert(new_execution("legacy", t0, ExecutionStatus::Running))
        .await?;
    executions
        .complete(
            older.id,
            ExecutionCompletion {
                status: ExecutionStatus::Other("error".to_string()),
                completed_at: t0 + Duration::seconds(1),
                logs: None,
                error: Some("timeout".to_string()),
            },
        )
        .await?;
    let latest = executions
        .insert(new_execution("legacy", t0 + Duration::minutes(1), ExecutionStatus::Running))
        .await?;
    executions
        .complete(
            latest.id,
            ExecutionCompletion {
                status: ExecutionStatus::parse("completed"),
                completed_at: t0 + Duration::minutes(1),
                logs: Some(r#"{"output":{"rows":7}}"#.to_string()),
                error: None,
            },
        )
        .await?;

    let reader = ExecutionStatusReader::new(executions);
    let first = reader.get_latest_status(&flow_id).await?;
    let second = reader.get_latest_status(&flow_id).await?;
    let third = reader.get_latest_status(&flow_id).await?;

    assert_eq!(first, second);
    assert_eq!(second, third);
    assert_eq!(first.execution_id, latest.id);
    assert_eq!(first.status.as_str(), "completed");
    assert_eq!(serde_json::to_value(&first)?["status"], "completed");
    assert!(first.status.is_success());

    Ok(())
}

#[tokio::test]
async fn test_status_reader_defaults_output_for_null_logs() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let (_, executions, _) = provider.create_repositories();
    let reader = ExecutionStatusReader::new(executions.clone());

    executions.insert(new_execution("abc", Utc::now(), ExecutionStatus::Running)).await?;

    let view = reader.get_latest_status(&FlowId::from("abc")).await?;
    assert_eq!(view.output, json!({}));
    assert_eq!(view.status, ExecutionStatus::Running);

    Ok(())
}

struct StaticRunner(Result<Value, CoreError>);

#[async_trait]
impl FlowRunner for StaticRunner {
    async fn run(&self, _definition: &FlowDefinition) -> Result<Value, CoreError> {
        self.0.clone()
    }
}

#[tokio::test]
async fn test_execution_service_records_successful_run() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let (definitions, executions, _) = provider.create_repositories();

    let definition = FlowDefinition::new("Daily digest", json!({}), "admin-1").with_id("digest");
    definitions.save(&definition).await?;

    let runner = StaticRunner(Ok(json!({"status": "completed", "output": {"sent": 3}})));
    let service = FlowExecutionService::new(definitions.clone(), executions.clone(), Arc::new(runner));

    let report = service.execute(&definition.id, "admin-1").await?;
    assert_eq!(report.execution.status, ExecutionStatus::Succeeded);
    assert_eq!(report.execution.triggered_by.as_deref(), Some("admin-1"));
    assert!(report.execution.completed_at.is_some());
    assert_eq!(report.execution.output(), json!({"sent": 3}));
    assert_eq!(report.result["status"], "completed");

    let stored = definitions.find_by_id(&definition.id).await?.unwrap();
    assert_eq!(stored.execution_count, 1);
    assert!(stored.last_executed_at.is_some());

    let reader = ExecutionStatusReader::new(executions);
    let view = reader.get_latest_status(&definition.id).await?;
    assert_eq!(view.execution_id, report.execution.id);
    assert_eq!(view.output, json!({"sent": 3}));

    Ok(())
}

#[tokio::test]
async fn test_execution_service_marks_runner_failure() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let (definitions, executions, _) = provider.create_repositories();

    let definition = FlowDefinition::new("Broken", json!({}), "admin-1").with_id("broken");
    definitions.save(&definition).await?;

    let runner = StaticRunner(Err(CoreError::FlowExecutionError("executor unreachable".to_string())));
    let service = FlowExecutionService::new(definitions.clone(), executions.clone(), Arc::new(runner));

    let err = service.execute(&definition.id, "admin-1").await.unwrap_err();
    assert!(matches!(err, CoreError::FlowExecutionError(_)));

    let latest = executions.find_latest_for_flow(&definition.id).await?.unwrap();
    assert_eq!(latest.status, ExecutionStatus::Failed);
    assert!(latest.error.unwrap().contains("executor unreachable"));
    assert!(latest.completed_at.is_some());

    let stored = definitions.find_by_id(&definition.id).await?.unwrap();
    assert_eq!(stored.execution_count, 0);

    Ok(())
}

#[tokio::test]
async fn test_execution_service_marks_store_failure_after_run() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let (_, executions, _) = provider.create_repositories();

    let definition = FlowDefinition::new("Bookkeeping", json!({}), "admin-1").with_id("books");
    let found = definition.clone();

    let mut definitions = MockDefinitions::new();
    definitions
        .expect_find_by_id()
        .returning(move |_| Ok(Some(found.clone())));
    definitions
        .expect_record_execution()
        .times(1)
        .returning(|_, _| Err(CoreError::StateStoreError("write timed out".to_string())));

    let runner = StaticRunner(Ok(json!({"status": "completed", "output": {"ok": true}})));
    let service = FlowExecutionService::new(Arc::new(definitions), executions.clone(), Arc::new(runner));

    let err = service.execute(&definition.id, "admin-1").await.unwrap_err();
    assert_eq!(err, CoreError::StateStoreError("write timed out".to_string()));

    let latest = executions.find_latest_for_flow(&definition.id).await?.unwrap();
    assert_eq!(latest.status, ExecutionStatus::Failed);
    assert!(latest.error.unwrap().contains("write timed out"));
    assert!(latest.completed_at.is_some());

    Ok(())
}

#[tokio::test]
async fn test_execution_service_unknown_flow() {
    let provider = InMemoryStateStoreProvider::new();
    let (definitions, executions, _) = provider.create_repositories();

    let runner = StaticRunner(Ok(json!({"status": "completed"})));
    let service = FlowExecutionService::new(definitions, executions.clone(), Arc::new(runner));

    let err = service.execute(&FlowId::from("ghost"), "admin-1").await.unwrap_err();
    assert_eq!(err, CoreError::FlowDefinitionNotFound("ghost".to_string()));

    let history = executions.list_for_flow(&FlowId::from("ghost")).await.unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_embed_service_records_referrer() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let (definitions, _, _) = provider.create_repositories();

    let definition = FlowDefinition::new("Embeddable", json!({"nodes": []}), "author-1").with_id("emb");
    definitions.save(&definition).await?;

    let service = FlowEmbedService::new(definitions);

    let opened = service.open_embed(&definition.id, Some("viewer-1"), None).await?;
    assert_eq!(opened, definition);
    service
        .open_embed(&definition.id, Some("viewer-2"), Some("https://blog.example.com/post"))
        .await?;

    let embeds = provider.embeds().await;
    assert_eq!(embeds.len(), 2);
    assert_eq!(embeds[0].referrer, "direct");
    assert_eq!(embeds[1].referrer, "https://blog.example.com/post");
    assert_eq!(embeds[1].user_id, "viewer-2");

    let err = service.open_embed(&definition.id, Some("  "), None).await.unwrap_err();
    assert_eq!(err, CoreError::ValidationError("userId required".to_string()));

    let err = service.open_embed(&FlowId::from("missing"), Some("viewer-1"), None).await.unwrap_err();
    assert!(err.is_not_found());

    Ok(())
}

#[tokio::test]
async fn test_session_repository() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let (_, _, sessions) = provider.create_repositories();

    let now = Utc::now();
    provider.insert_session("live", Session::user("u1"), now + Duration::hours(1)).await;
    provider.insert_session("stale", Session::user("u2"), now - Duration::hours(1)).await;
    provider.insert_api_key("bn_key", Session::user("u3")).await;

    assert_eq!(sessions.find_by_token("live", now).await?, Some(Session::user("u1")));
    assert_eq!(sessions.find_by_token("stale", now).await?, None);
    assert_eq!(sessions.find_by_token("unknown", now).await?, None);

    assert!(provider.api_key_last_used("bn_key").await.is_none());
    assert_eq!(sessions.find_by_api_key("bn_key").await?, Some(Session::user("u3")));
    assert!(provider.api_key_last_used("bn_key").await.is_some());

    Ok(())
}
