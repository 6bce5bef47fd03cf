//! API (C11) binary entry point: wires production or in-memory backends per
//! Cargo feature flag and serves the HTTP router until `SIGINT`/`SIGTERM`
//! (spec.md §10.4, §10.6).

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use logoforge_api::build_router;
use logoforge_api::services::Services;
use logoforge_config::Config;
use logoforge_http_server::{HttpServer, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "logoforge-api", about = "LogoForge HTTP API")]
struct Cli {
    /// Address to bind the HTTP listener to.
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:8080")]
    bind_address: SocketAddr,

    /// Disable permissive CORS headers (enabled by default for local/dev use).
    #[arg(long, env = "DISABLE_CORS")]
    disable_cors: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    logoforge_config::init_tracing(&config);
    tracing::info!(environment = %config.environment, addr = %cli.bind_address, "logoforge-api starting");

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

    #[cfg(feature = "dynamodb")]
    let rate_counter = Arc::new(
        logoforge_rate_counter::DynamoDbRateCounter::connect(logoforge_rate_counter::DynamoDbRateCounterConfig {
            region: config.aws_region.clone(),
            ..Default::default()
        })
        .await,
    );
    #[cfg(not(feature = "dynamodb"))]
    let rate_counter = Arc::new(logoforge_rate_counter::InMemoryRateCounter::new());

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

    #[cfg(feature = "postgres")]
    let task_change_feed = Arc::new(logoforge_meta_store::PostgresTaskChangeFeed::new(
        config.database_url.clone().ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required"))?,
    ));
    #[cfg(not(feature = "postgres"))]
    let task_change_feed = Arc::new(logoforge_meta_store::InMemoryTaskChangeFeed::new());

    let services = Arc::new(Services::new(
        rate_counter,
        task_registry,
        concept_store,
        blob_store,
        bus,
        task_change_feed,
        config.num_palettes_default,
    ));

    let router = build_router(services);
    let server = HttpServer::new(
        ServerConfig {
            bind_address: cli.bind_address,
            enable_cors: !cli.disable_cors,
        },
        router,
    );

    server.run().await?;
    Ok(())
}
