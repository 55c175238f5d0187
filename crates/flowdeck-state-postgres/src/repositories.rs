use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row;
use tracing::debug;

use flowdeck_core::{
    CoreError, ExecutionCompletion, ExecutionId, ExecutionStatus, FlowDefinition,
    FlowDefinitionRepository, FlowEmbed, FlowExecution, FlowExecutionRepository, FlowId,
    NewFlowEmbed, NewFlowExecution, Role, Session, SessionRepository,
};

use crate::PostgresConnection;

const EXECUTION_COLUMNS: &str =
    "id, flow_id, status, started_at, completed_at, error, logs, triggered_by";

const DEFINITION_COLUMNS: &str = "id, title, data, published, author_id, created_at, updated_at, \
     last_executed_at, execution_count";

fn store_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> CoreError {
    move |e| CoreError::StateStoreError(format!("{}: {}", context, e))
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, CoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| CoreError::SerializationError(format!("Error getting {}: {}", name, e)))
}

fn definition_from_row(row: &PgRow) -> Result<FlowDefinition, CoreError> {
    let execution_count: i64 = column(row, "execution_count")?;

    Ok(FlowDefinition {
        id: FlowId(column(row, "id")?),
        title: column(row, "title")?,
        data: column(row, "data")?,
        published: column(row, "published")?,
        author_id: column(row, "author_id")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
        last_executed_at: column(row, "last_executed_at")?,
        execution_count: u64::try_from(execution_count).unwrap_or_default(),
    })
}

fn execution_from_row(row: &PgRow) -> Result<FlowExecution, CoreError> {
    let status: String = column(row, "status")?;

    Ok(FlowExecution {
        id: ExecutionId(column(row, "id")?),
        flow_id: FlowId(column(row, "flow_id")?),
        status: ExecutionStatus::parse(&status),
        started_at: column(row, "started_at")?,
        completed_at: column(row, "completed_at")?,
        error: column(row, "error")?,
        logs: column(row, "logs")?,
        triggered_by: column(row, "triggered_by")?,
    })
}

fn session_from_row(row: &PgRow) -> Result<Session, CoreError> {
    let role: String = column(row, "role")?;

    Ok(Session {
        user_id: column(row, "id")?,
        role: Role::parse(&role),
        banned: column(row, "banned")?,
    })
}

/// Postgres implementation of the FlowDefinitionRepository
#[derive(Clone)]
pub struct PostgresFlowDefinitionRepository {
    conn: PostgresConnection,
}

impl PostgresFlowDefinitionRepository {
    /// Create a new Postgres flow definition repository
    pub fn new(conn: PostgresConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl FlowDefinitionRepository for PostgresFlowDefinitionRepository {
    async fn find_by_id(&self, id: &FlowId) -> Result<Option<FlowDefinition>, CoreError> {
        let query = format!("SELECT {} FROM flow_definitions WHERE id = $1", DEFINITION_COLUMNS);

        let row = sqlx::query(&query)
            .bind(&id.0)
            .fetch_optional(self.conn.pool())
            .await
            .map_err(store_error("Failed to load flow definition"))?;

        row.as_ref().map(definition_from_row).transpose()
    }

    async fn save(&self, definition: &FlowDefinition) -> Result<(), CoreError> {
        let query = "
            INSERT INTO flow_definitions
                (id, title, data, published, author_id, created_at, updated_at, last_executed_at, execution_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                title = $2,
                data = $3,
                published = $4,
                updated_at = $7,
                last_executed_at = $8,
                execution_count = $9
        ";

        sqlx::query(query)
            .bind(&definition.id.0)
            .bind(&definition.title)
            .bind(&definition.data)
            .bind(definition.published)
            .bind(&definition.author_id)
            .bind(definition.created_at)
            .bind(definition.updated_at)
            .bind(definition.last_executed_at)
            .bind(i64::try_from(definition.execution_count).unwrap_or(i64::MAX))
            .execute(self.conn.pool())
            .await
            .map_err(store_error("Failed to save flow definition"))?;

        Ok(())
    }

    async fn record_execution(&self, id: &FlowId, at: DateTime<Utc>) -> Result<(), CoreError> {
        let query = "
            UPDATE flow_definitions
            SET last_executed_at = $2, execution_count = execution_count + 1
            WHERE id = $1
        ";

        let result = sqlx::query(query)
            .bind(&id.0)
            .bind(at)
            .execute(self.conn.pool())
            .await
            .map_err(store_error("Failed to record execution"))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::FlowDefinitionNotFound(id.0.clone()));
        }

        Ok(())
    }

    async fn record_embed(&self, embed: NewFlowEmbed) -> Result<FlowEmbed, CoreError> {
        let query = "
            INSERT INTO flow_embeds (flow_id, user_id, referrer)
            VALUES ($1, $2, $3)
            RETURNING id, created_at
        ";

        let row = sqlx::query(query)
            .bind(&embed.flow_id.0)
            .bind(&embed.user_id)
            .bind(&embed.referrer)
            .fetch_one(self.conn.pool())
            .await
            .map_err(store_error("Failed to record embed"))?;

        Ok(FlowEmbed {
            id: column(&row, "id")?,
            flow_id: embed.flow_id,
            user_id: embed.user_id,
            referrer: embed.referrer,
            created_at: column(&row, "created_at")?,
        })
    }
}

/// Postgres implementation of the FlowExecutionRepository
#[derive(Clone)]
pub struct PostgresFlowExecutionRepository {
    conn: PostgresConnection,
}

impl PostgresFlowExecutionRepository {
    /// Create a new Postgres flow execution repository
    pub fn new(conn: PostgresConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl FlowExecutionRepository for PostgresFlowExecutionRepository {
    async fn find_latest_for_flow(&self, flow_id: &FlowId) -> Result<Option<FlowExecution>, CoreError> {
        let query = format!(
            "SELECT {} FROM flow_executions WHERE flow_id = $1 ORDER BY started_at DESC, id DESC LIMIT 1",
            EXECUTION_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(&flow_id.0)
            .fetch_optional(self.conn.pool())
            .await
            .map_err(store_error("Failed to load latest execution"))?;

        row.as_ref().map(execution_from_row).transpose()
    }

    async fn list_for_flow(&self, flow_id: &FlowId) -> Result<Vec<FlowExecution>, CoreError> {
        let query = format!(
            "SELECT {} FROM flow_executions WHERE flow_id = $1 ORDER BY started_at DESC, id DESC",
            EXECUTION_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(&flow_id.0)
            .fetch_all(self.conn.pool())
            .await
            .map_err(store_error("Failed to list executions"))?;

        rows.iter().map(execution_from_row).collect()
    }

    async fn insert(&self, execution: NewFlowExecution) -> Result<FlowExecution, CoreError> {
        let query = format!(
            "INSERT INTO flow_executions (flow_id, status, started_at, triggered_by) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            EXECUTION_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(&execution.flow_id.0)
            .bind(execution.status.as_str())
            .bind(execution.started_at)
            .bind(&execution.triggered_by)
            .fetch_one(self.conn.pool())
            .await
            .map_err(store_error("Failed to insert execution"))?;

        let execution = execution_from_row(&row)?;
        debug!(execution_id = %execution.id, flow_id = %execution.flow_id, "Inserted execution");
        Ok(execution)
    }

    async fn complete(
        &self,
        id: ExecutionId,
        completion: ExecutionCompletion,
    ) -> Result<FlowExecution, CoreError> {
        let query = format!(
            "UPDATE flow_executions SET status = $2, completed_at = $3, logs = $4, error = $5 \
             WHERE id = $1 RETURNING {}",
            EXECUTION_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(id.0)
            .bind(completion.status.as_str())
            .bind(completion.completed_at)
            .bind(&completion.logs)
            .bind(&completion.error)
            .fetch_optional(self.conn.pool())
            .await
            .map_err(store_error("Failed to complete execution"))?;

        match row {
            Some(row) => execution_from_row(&row),
            None => Err(CoreError::ExecutionNotFound(id.to_string())),
        }
    }

    async fn health_check(&self) -> Result<bool, CoreError> {
        sqlx::query("SELECT 1")
            .execute(self.conn.pool())
            .await
            .map_err(store_error("Health check failed"))?;
        Ok(true)
    }
}

/// Postgres implementation of the SessionRepository
#[derive(Clone)]
pub struct PostgresSessionRepository {
    conn: PostgresConnection,
}

impl PostgresSessionRepository {
    /// Create a new Postgres session repository
    pub fn new(conn: PostgresConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    async fn find_by_token(&self, token: &str, now: DateTime<Utc>) -> Result<Option<Session>, CoreError> {
        let query = "
            SELECT u.id, u.role, u.banned
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token = $1 AND s.expires_at > $2
        ";

        let row = sqlx::query(query)
            .bind(token)
            .bind(now)
            .fetch_optional(self.conn.pool())
            .await
            .map_err(store_error("Failed to resolve session"))?;

        row.as_ref().map(session_from_row).transpose()
    }

    async fn find_by_api_key(&self, key: &str) -> Result<Option<Session>, CoreError> {
        let query = "
            UPDATE api_keys k
            SET last_used = NOW()
            FROM users u
            WHERE k.key = $1 AND u.id = k.user_id
            RETURNING u.id, u.role, u.banned
        ";

        let row = sqlx::query(query)
            .bind(key)
            .fetch_optional(self.conn.pool())
            .await
            .map_err(store_error("Failed to resolve API key"))?;

        row.as_ref().map(session_from_row).transpose()
    }
}
