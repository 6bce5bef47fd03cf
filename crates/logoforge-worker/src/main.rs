//! Worker (C7) binary entry point: wires production or in-memory backends
//! per Cargo feature flag and drives the poll loop until `SIGINT`/`SIGTERM`
//! (spec.md §10.6 — graceful shutdown matching the teacher's
//! `HttpMcpServer::run()` accept-loop shape, generalized to a poll loop).

use std::sync::Arc;
use std::time::Duration;

use logoforge_blob_store::BlobStore;
use logoforge_bus::BusConsumer;
use logoforge_config::Config;
use logoforge_image_provider::ImageProvider;
use logoforge_meta_store::ConceptStore;
use logoforge_task_registry::TaskRegistry;
use logoforge_worker::WorkerLoop;

/// How long to sleep after an empty `receive()` before polling again, to
/// avoid a tight spin loop against an in-memory or idle queue.
const EMPTY_POLL_BACKOFF: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    logoforge_config::init_tracing(&config);
    tracing::info!(environment = %config.environment, "logoforge-worker starting");

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

    #[cfg(feature = "http-provider")]
    let image_provider = Arc::new(logoforge_image_provider::HttpImageProvider::new(
        logoforge_image_provider::HttpImageProviderConfig {
            base_url: config.image_provider_base_url.clone().ok_or_else(|| anyhow::anyhow!("IMAGE_PROVIDER_BASE_URL is required"))?,
            api_key: config.image_provider_api_key.clone().unwrap_or_default(),
        },
    )?);
    #[cfg(not(feature = "http-provider"))]
    let image_provider = Arc::new(logoforge_image_provider::FakeImageProvider::new());

    #[cfg(feature = "sqs")]
    let bus = Arc::new(
        logoforge_bus::SqsBus::connect(logoforge_bus::SqsBusConfig {
            queue_url: config.bus_queue_url.clone().ok_or_else(|| anyhow::anyhow!("BUS_QUEUE_URL is required"))?,
            region: config.aws_region.clone(),
        })
        .await,
    );
    #[cfg(not(feature = "sqs"))]
    let bus = Arc::new(logoforge_bus::InMemoryBus::new());

    let worker = WorkerLoop::new(task_registry, concept_store, blob_store, image_provider, bus, config.worker_parallelism);

    run_poll_loop(worker).await
}

/// spec.md §5: "Hard wall-clock timeout per Worker invocation: 15 min", left
/// to `run_workflow`'s own per-call timeouts (ImageProvider 120s, BlobStore
/// 30s, MetaStore 10s) rather than wrapped here, so a long parallel-palette
/// stage isn't truncated mid-flight by an outer deadline shorter than the
/// sum of its legitimate per-call timeouts.
async fn run_poll_loop<R, C, B, P, Q>(worker: WorkerLoop<R, C, B, P, Q>) -> anyhow::Result<()>
where
    R: TaskRegistry + 'static,
    C: ConceptStore + 'static,
    B: BlobStore + 'static,
    P: ImageProvider + 'static,
    Q: BusConsumer + 'static,
{
    loop {
        tokio::select! {
            outcome = worker.poll_once() => {
                match outcome {
                    Ok(Some(_)) => {}
                    Ok(None) => tokio::time::sleep(EMPTY_POLL_BACKOFF).await,
                    Err(err) => {
                        tracing::error!(error = %err, "worker poll failed; backing off");
                        tokio::time::sleep(EMPTY_POLL_BACKOFF).await;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("received shutdown signal, finishing in-flight message and exiting");
                return Ok(());
            }
        }
    }
}
