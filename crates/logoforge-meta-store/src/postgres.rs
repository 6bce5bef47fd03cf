//! Postgres-backed MetaStore: Concept/Variation CRUD plus a `LISTEN`-based
//! `TaskChangeFeed` that consumes the `pg_notify` calls fired by
//! `logoforge-task-registry`'s Postgres backend on every successful
//! `transition()` (see `change_feed::POSTGRES_NOTIFY_CHANNEL`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use logoforge_domain::{Concept, Variation};
use sqlx::postgres::{PgListener, PgPoolOptions};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::change_feed::{TaskChangeEvent, TaskChangeFeed, POSTGRES_NOTIFY_CHANNEL};
use crate::error::MetaStoreError;
use crate::traits::ConceptStore;

#[derive(Debug, Clone)]
pub struct PostgresMetaConfig {
    pub database_url: String,
    pub concepts_table: String,
    pub variations_table: String,
    pub max_connections: u32,
}

pub struct PostgresConceptStore {
    pool: PgPool,
    concepts_table: String,
    variations_table: String,
}

impl PostgresConceptStore {
    pub async fn connect(config: PostgresMetaConfig) -> Result<Self, MetaStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;
        Ok(Self {
            pool,
            concepts_table: config.concepts_table,
            variations_table: config.variations_table,
        })
    }

    pub fn with_pool(pool: PgPool, concepts_table: impl Into<String>, variations_table: impl Into<String>) -> Self {
        Self {
            pool,
            concepts_table: concepts_table.into(),
            variations_table: variations_table.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ensure_schema(&self) -> Result<(), MetaStoreError> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {concepts} (
                id uuid PRIMARY KEY,
                user_id uuid NOT NULL,
                logo_description text NOT NULL,
                theme_description text NOT NULL,
                base_image_path text NOT NULL,
                created_at timestamptz NOT NULL
            )
            "#,
            concepts = self.concepts_table
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {variations} (
                id uuid PRIMARY KEY,
                concept_id uuid NOT NULL REFERENCES {concepts}(id) ON DELETE CASCADE,
                palette_name text NOT NULL,
                colors jsonb NOT NULL,
                image_path text NOT NULL,
                created_at timestamptz NOT NULL
            )
            "#,
            variations = self.variations_table,
            concepts = self.concepts_table
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{concepts}_user_created ON {concepts} (user_id, created_at DESC)",
            concepts = self.concepts_table
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{variations}_concept ON {variations} (concept_id)",
            variations = self.variations_table
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_variations(&self, concept_id: Uuid) -> Result<Vec<Variation>, MetaStoreError> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM {variations} WHERE concept_id = $1 ORDER BY created_at ASC",
            variations = self.variations_table
        ))
        .bind(concept_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let colors_json: serde_json::Value = row.try_get("colors").map_err(sqlx::Error::from)?;
                let colors: Vec<String> = serde_json::from_value(colors_json)?;
                Ok(Variation {
                    variation_id: row.try_get("id").map_err(sqlx::Error::from)?,
                    concept_id: row.try_get("concept_id").map_err(sqlx::Error::from)?,
                    palette_name: row.try_get("palette_name").map_err(sqlx::Error::from)?,
                    colors,
                    image_path: row.try_get("image_path").map_err(sqlx::Error::from)?,
                    created_at: row.try_get("created_at").map_err(sqlx::Error::from)?,
                })
            })
            .collect()
    }

    fn row_to_concept_shell(row: &sqlx::postgres::PgRow) -> Result<Concept, MetaStoreError> {
        Ok(Concept {
            concept_id: row.try_get("id").map_err(sqlx::Error::from)?,
            user_id: row.try_get("user_id").map_err(sqlx::Error::from)?,
            logo_description: row.try_get("logo_description").map_err(sqlx::Error::from)?,
            theme_description: row.try_get("theme_description").map_err(sqlx::Error::from)?,
            base_image_path: row.try_get("base_image_path").map_err(sqlx::Error::from)?,
            created_at: row.try_get("created_at").map_err(sqlx::Error::from)?,
            variations: Vec::new(),
        })
    }
}

#[async_trait]
impl ConceptStore for PostgresConceptStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn insert_concept(&self, concept: Concept) -> Result<Concept, MetaStoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            r#"
            INSERT INTO {concepts} (id, user_id, logo_description, theme_description, base_image_path, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
            concepts = self.concepts_table
        ))
        .bind(concept.concept_id)
        .bind(concept.user_id)
        .bind(&concept.logo_description)
        .bind(&concept.theme_description)
        .bind(&concept.base_image_path)
        .bind(concept.created_at)
        .execute(&mut *tx)
        .await?;

        for variation in &concept.variations {
            let colors_json = serde_json::to_value(&variation.colors)?;
            sqlx::query(&format!(
                r#"
                INSERT INTO {variations} (id, concept_id, palette_name, colors, image_path, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
                variations = self.variations_table
            ))
            .bind(variation.variation_id)
            .bind(variation.concept_id)
            .bind(&variation.palette_name)
            .bind(&colors_json)
            .bind(&variation.image_path)
            .bind(variation.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(concept)
    }

    async fn get_concept(&self, concept_id: Uuid) -> Result<Option<Concept>, MetaStoreError> {
        let row = sqlx::query(&format!("SELECT * FROM {concepts} WHERE id = $1", concepts = self.concepts_table))
            .bind(concept_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else { return Ok(None) };
        let mut concept = Self::row_to_concept_shell(&row)?;
        concept.variations = self.load_variations(concept_id).await?;
        Ok(Some(concept))
    }

    async fn list_concepts_for_user(&self, user_id: Uuid, limit: u32) -> Result<Vec<Concept>, MetaStoreError> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM {concepts} WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
            concepts = self.concepts_table
        ))
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut concepts = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut concept = Self::row_to_concept_shell(row)?;
            concept.variations = self.load_variations(concept.concept_id).await?;
            concepts.push(concept);
        }
        Ok(concepts)
    }

    async fn delete_concept_cascade(&self, concept_id: Uuid) -> Result<(), MetaStoreError> {
        sqlx::query(&format!("DELETE FROM {concepts} WHERE id = $1", concepts = self.concepts_table))
            .bind(concept_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_concepts_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Concept>, MetaStoreError> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM {concepts} WHERE created_at < $1",
            concepts = self.concepts_table
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        let mut concepts = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut concept = Self::row_to_concept_shell(row)?;
            concept.variations = self.load_variations(concept.concept_id).await?;
            concepts.push(concept);
        }
        Ok(concepts)
    }
}

/// `LISTEN`-based change feed. One `PgListener` per `subscribe()` call,
/// filtering the shared `POSTGRES_NOTIFY_CHANNEL` stream down to the
/// requested `task_id`.
pub struct PostgresTaskChangeFeed {
    database_url: String,
}

impl PostgresTaskChangeFeed {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }
}

#[async_trait]
impl TaskChangeFeed for PostgresTaskChangeFeed {
    /// Notifications are fired by `logoforge-task-registry`'s Postgres
    /// backend directly via SQL; an explicit in-process `publish` is a no-op
    /// here but kept so callers can use the same trait uniformly.
    async fn publish(&self, _event: TaskChangeEvent) -> Result<(), MetaStoreError> {
        Ok(())
    }

    async fn subscribe(&self, task_id: Uuid) -> Result<BoxStream<'static, TaskChangeEvent>, MetaStoreError> {
        let mut listener = PgListener::connect(&self.database_url).await?;
        listener.listen(POSTGRES_NOTIFY_CHANNEL).await?;

        let stream = async_stream::stream! {
            loop {
                match listener.recv().await {
                    Ok(notification) => {
                        let Ok(event) = serde_json::from_str::<TaskChangeEvent>(notification.payload()) else {
                            tracing::warn!("dropping malformed task change notification");
                            continue;
                        };
                        if event.task_id != task_id {
                            continue;
                        }
                        let terminal = event.is_terminal();
                        yield event;
                        if terminal {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "task change listener disconnected");
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
