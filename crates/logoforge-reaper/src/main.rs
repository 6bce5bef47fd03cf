//! Reaper (C10) binary entry point: wires production or in-memory backends
//! per Cargo feature flag and drives the sweep on a fixed interval until
//! `SIGINT`/`SIGTERM` (spec.md §4.10, §10.6 graceful shutdown), matching
//! `turul-mcp-task-storage::postgres::start_cleanup_task`'s
//! `tokio::time::interval` + loop shape.

use std::sync::Arc;
use std::time::Duration;

use logoforge_config::Config;
use logoforge_reaper::Reaper;

/// How often the sweep runs (spec.md §4.10: "e.g., every 5 min").
const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    logoforge_config::init_tracing(&config);
    tracing::info!(environment = %config.environment, "logoforge-reaper starting");

    #[cfg(feature = "postgres")]
    let task_registry = Arc::new(
        logoforge_task_registry::PostgresTaskRegistry::connect(logoforge_task_registry::PostgresTaskConfig {
            database_url: config.database_url.clone().ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required"))?,
            table_name: config.table_names.tasks.clone(),
            max_connections: 5,
        })
        .await?,
    );
    #[cfg(not(feature = "postgres"))]
    let task_registry = Arc::new(logoforge_task_registry::InMemoryTaskRegistry::new());

    #[cfg(feature = "postgres")]
    let concept_store = Arc::new(
        logoforge_meta_store::PostgresConceptStore::connect(logoforge_meta_store::PostgresMetaConfig {
            database_url: config.database_url.clone().ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required"))?,
            concepts_table: config.table_names.concepts.clone(),
            variations_table: config.table_names.color_variations.clone(),
            max_connections: 5,
        })
        .await?,
    );
    #[cfg(not(feature = "postgres"))]
    let concept_store = Arc::new(logoforge_meta_store::InMemoryConceptStore::new());

    #[cfg(feature = "s3")]
    let blob_store = Arc::new(
        logoforge_blob_store::S3BlobStore::connect(logoforge_blob_store::S3BlobStoreConfig {
            bucket: config.bucket_names.concept.clone(),
            region: config.aws_region.clone(),
        })
        .await,
    );
    #[cfg(not(feature = "s3"))]
    let blob_store = Arc::new(logoforge_blob_store::InMemoryBlobStore::new());

    let retention = config.concept_retention_days.map(|days| Duration::from_secs(days as u64 * 24 * 3600));
    let reaper = Reaper::new(task_registry, concept_store, blob_store, config.processing_timeout, config.pending_timeout, retention);

    run_sweep_loop(reaper).await
}

async fn run_sweep_loop<R, C, B>(reaper: Reaper<R, C, B>) -> anyhow::Result<()>
where
    R: logoforge_task_registry::TaskRegistry,
    C: logoforge_meta_store::ConceptStore,
    B: logoforge_blob_store::BlobStore,
{
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                match reaper.sweep_once().await {
                    Ok(report) if report.is_empty() => tracing::debug!("reaper: sweep found nothing stale"),
                    Ok(report) => tracing::info!(
                        processing_timed_out = report.processing_timed_out.len(),
                        pending_timed_out = report.pending_timed_out.len(),
                        concepts_deleted = report.concepts_deleted.len(),
                        "reaper: sweep complete"
                    ),
                    Err(err) => tracing::error!(error = %err, "reaper: sweep failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("received shutdown signal, exiting after current sweep");
                return Ok(());
            }
        }
    }
}
