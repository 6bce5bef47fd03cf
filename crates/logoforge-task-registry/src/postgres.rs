//! Postgres-backed Task Registry. Table name is resolved once at config
//! load time (`logoforge_config::TableNames`) and never string-interpolated
//! at call sites beyond this module's constructor (spec.md §9 design note).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use logoforge_domain::{Task, TaskMetadata, TaskStatus, TaskType};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::TaskRegistryError;
use crate::state_machine;
use crate::traits::{TaskRegistry, TransitionPatch};

#[derive(Debug, Clone)]
pub struct PostgresTaskConfig {
    pub database_url: String,
    /// Environment-scoped table name, e.g. `tasks_dev` / `tasks_prod`.
    pub table_name: String,
    pub max_connections: u32,
}

pub struct PostgresTaskRegistry {
    pool: PgPool,
    table_name: String,
}

impl PostgresTaskRegistry {
    pub async fn connect(config: PostgresTaskConfig) -> Result<Self, TaskRegistryError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;
        Ok(Self {
            pool,
            table_name: config.table_name,
        })
    }

    pub fn with_pool(pool: PgPool, table_name: impl Into<String>) -> Self {
        Self {
            pool,
            table_name: table_name.into(),
        }
    }

    /// Create the table if absent. Called once at process start; not part
    /// of the trait since migrations are an operational concern, not a
    /// per-request one.
    pub async fn ensure_schema(&self) -> Result<(), TaskRegistryError> {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id uuid PRIMARY KEY,
                user_id uuid NOT NULL,
                type text NOT NULL,
                status text NOT NULL,
                result_id uuid,
                error_message text,
                metadata jsonb NOT NULL,
                is_cancelled boolean NOT NULL DEFAULT false,
                created_at timestamptz NOT NULL,
                updated_at timestamptz NOT NULL
            )
            "#,
            table = self.table_name
        );
        sqlx::query(&sql).execute(&self.pool).await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_active ON {table} (user_id, status, type)",
            table = self.table_name
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_status_updated ON {table} (status, updated_at)",
            table = self.table_name
        ))
        .execute(&self.pool)
        .await?;

        // Enforces the at-most-one-active rule (spec.md §3, §8 property 2)
        // at the database level: at most one row per (user_id, type) may
        // have a non-terminal status. This is what makes `create` atomic
        // across processes — two concurrent inserts for the same key can
        // never both commit (spec.md S3), unlike an application-level
        // `list_active` check performed before the insert.
        sqlx::query(&format!(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_one_active
            ON {table} (user_id, type)
            WHERE status IN ('pending', 'processing')
            "#,
            table = self.table_name
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn is_one_active_violation(err: &sqlx::Error) -> bool {
        use sqlx::error::ErrorKind;
        matches!(
            err,
            sqlx::Error::Database(db_err)
                if db_err.kind() == ErrorKind::UniqueViolation
                    && db_err.constraint().is_some_and(|c| c.contains("one_active"))
        )
    }

    fn row_to_task(row: &sqlx::postgres::PgRow) -> Result<Task, TaskRegistryError> {
        let status_str: String = row.try_get("status").map_err(sqlx::Error::from)?;
        let type_str: String = row.try_get("type").map_err(sqlx::Error::from)?;
        let metadata_json: serde_json::Value = row.try_get("metadata").map_err(sqlx::Error::from)?;
        let metadata: TaskMetadata = serde_json::from_value(metadata_json)?;

        Ok(Task {
            task_id: row.try_get("id").map_err(sqlx::Error::from)?,
            user_id: row.try_get("user_id").map_err(sqlx::Error::from)?,
            task_type: parse_task_type(&type_str)?,
            status: parse_status(&status_str)?,
            result_id: row.try_get("result_id").map_err(sqlx::Error::from)?,
            error_message: row.try_get("error_message").map_err(sqlx::Error::from)?,
            metadata,
            is_cancelled: row.try_get("is_cancelled").map_err(sqlx::Error::from)?,
            created_at: row.try_get("created_at").map_err(sqlx::Error::from)?,
            updated_at: row.try_get("updated_at").map_err(sqlx::Error::from)?,
        })
    }

    /// Fires a `pg_notify` on the channel `logoforge-meta-store` listens on
    /// (`change_feed::POSTGRES_NOTIFY_CHANNEL` there), so the Status Channel
    /// gets pushed updates without this crate depending on that one.
    /// Best-effort: a notify failure never fails the transition itself.
    async fn notify_change(&self, from: TaskStatus, to: TaskStatus, task: &Task) {
        let payload = serde_json::json!({
            "task_id": task.task_id,
            "old_status": status_str(from),
            "new_status": status_str(to),
            "result_id": task.result_id,
            "error_message": task.error_message,
        });
        if let Err(err) = sqlx::query("SELECT pg_notify('logoforge_task_changes', $1)")
            .bind(payload.to_string())
            .execute(&self.pool)
            .await
        {
            tracing::warn!(task_id = %task.task_id, error = %err, "failed to publish task change notification");
        }
    }
}

fn status_str(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::Processing => "processing",
        TaskStatus::Completed => "completed",
        TaskStatus::Failed => "failed",
    }
}

fn parse_status(s: &str) -> Result<TaskStatus, TaskRegistryError> {
    match s {
        "pending" => Ok(TaskStatus::Pending),
        "processing" => Ok(TaskStatus::Processing),
        "completed" => Ok(TaskStatus::Completed),
        "failed" => Ok(TaskStatus::Failed),
        other => Err(TaskRegistryError::Database(format!("unknown task status {other}"))),
    }
}

fn type_str(t: TaskType) -> &'static str {
    match t {
        TaskType::Generate => "generate",
        TaskType::Refine => "refine",
    }
}

fn parse_task_type(s: &str) -> Result<TaskType, TaskRegistryError> {
    match s {
        "generate" => Ok(TaskType::Generate),
        "refine" => Ok(TaskType::Refine),
        other => Err(TaskRegistryError::Database(format!("unknown task type {other}"))),
    }
}

#[async_trait]
impl TaskRegistry for PostgresTaskRegistry {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn create(&self, user_id: Uuid, metadata: TaskMetadata) -> Result<Task, TaskRegistryError> {
        let task = Task::new(user_id, metadata);
        let metadata_json = serde_json::to_value(&task.metadata)?;

        let result = sqlx::query(&format!(
            r#"
            INSERT INTO {table}
                (id, user_id, type, status, result_id, error_message, metadata, is_cancelled, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
            table = self.table_name
        ))
        .bind(task.task_id)
        .bind(task.user_id)
        .bind(type_str(task.task_type))
        .bind(status_str(task.status))
        .bind(task.result_id)
        .bind(&task.error_message)
        .bind(&metadata_json)
        .bind(task.is_cancelled)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(task),
            Err(err) if Self::is_one_active_violation(&err) => Err(TaskRegistryError::ActiveTaskExists),
            Err(err) => Err(err.into()),
        }
    }

    async fn get(&self, task_id: Uuid) -> Result<Option<Task>, TaskRegistryError> {
        let row = sqlx::query(&format!("SELECT * FROM {table} WHERE id = $1", table = self.table_name))
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_task).transpose()
    }

    async fn transition(
        &self,
        task_id: Uuid,
        from: TaskStatus,
        to: TaskStatus,
        patch: TransitionPatch,
    ) -> Result<Task, TaskRegistryError> {
        state_machine::validate_transition(from, to)?;

        let metadata_json = patch.metadata.as_ref().map(serde_json::to_value).transpose()?;

        // The conditional update: it only matches a row whose status is
        // still `from`, which is what makes duplicate worker claims safe
        // under at-least-once delivery (spec.md §4.5).
        let row = sqlx::query(&format!(
            r#"
            UPDATE {table} SET
                status = $1,
                result_id = COALESCE($2, result_id),
                error_message = COALESCE($3, error_message),
                metadata = COALESCE($4, metadata),
                updated_at = GREATEST(updated_at, now())
            WHERE id = $5 AND status = $6
            RETURNING *
            "#,
            table = self.table_name
        ))
        .bind(status_str(to))
        .bind(patch.result_id)
        .bind(&patch.error_message)
        .bind(&metadata_json)
        .bind(task_id)
        .bind(status_str(from))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let task = Self::row_to_task(&row)?;
                self.notify_change(from, to, &task).await;
                Ok(task)
            }
            None => {
                // Distinguish "doesn't exist" from "exists but wrong status"
                // so the Worker's duplicate-delivery path (ack vs nack) can
                // branch correctly.
                match self.get(task_id).await? {
                    Some(current) => Err(TaskRegistryError::TransitionConflict {
                        task_id,
                        expected: from,
                        actual: current.status,
                    }),
                    None => Err(TaskRegistryError::NotFound(task_id)),
                }
            }
        }
    }

    async fn list_active(&self, user_id: Uuid, task_type: TaskType) -> Result<Vec<Task>, TaskRegistryError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT * FROM {table}
            WHERE user_id = $1 AND type = $2 AND status IN ('pending', 'processing')
            "#,
            table = self.table_name
        ))
        .bind(user_id)
        .bind(type_str(task_type))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_task).collect()
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        status: Option<TaskStatus>,
        task_type: Option<TaskType>,
        limit: u32,
    ) -> Result<Vec<Task>, TaskRegistryError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT * FROM {table}
            WHERE user_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR type = $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
            table = self.table_name
        ))
        .bind(user_id)
        .bind(status.map(status_str))
        .bind(task_type.map(type_str))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_task).collect()
    }

    async fn set_cancelled(&self, task_id: Uuid) -> Result<Task, TaskRegistryError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE {table} SET is_cancelled = true, updated_at = GREATEST(updated_at, now())
            WHERE id = $1
            RETURNING *
            "#,
            table = self.table_name
        ))
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(TaskRegistryError::NotFound(task_id))?;
        Self::row_to_task(&row)
    }

    async fn mark_failed_if_stale(
        &self,
        status: TaskStatus,
        older_than: DateTime<Utc>,
        error_message: &str,
    ) -> Result<Vec<Uuid>, TaskRegistryError> {
        let timestamp_column = match status {
            TaskStatus::Processing => "updated_at",
            TaskStatus::Pending => "created_at",
            _ => return Ok(Vec::new()),
        };

        let rows = sqlx::query(&format!(
            r#"
            UPDATE {table} SET
                status = 'failed',
                error_message = $1,
                updated_at = now()
            WHERE status = $2 AND {timestamp_column} < $3
            RETURNING id
            "#,
            table = self.table_name,
            timestamp_column = timestamp_column
        ))
        .bind(logoforge_domain::clamp_error_message(error_message))
        .bind(status_str(status))
        .bind(older_than)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|row| row.try_get::<Uuid, _>("id").map_err(TaskRegistryError::from)).collect()
    }
}
