//! Process-wide configuration, loaded once at start (§6 Configuration).
//!
//! `TableNames`/`BucketNames` are resolved here from `ENVIRONMENT` at
//! load time, so call sites never string-interpolate an environment
//! suffix themselves (spec.md §9 design note).

use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Prod,
    Test,
}

impl Environment {
    fn suffix(self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Prod => "prod",
            Environment::Test => "dev",
        }
    }

    fn from_env_var(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "prod" | "production" => Ok(Environment::Prod),
            "test" => Ok(Environment::Test),
            other => Err(ConfigError::InvalidValue {
                key: "ENVIRONMENT",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// Environment-scoped MetaStore table names (§6: `tasks_dev` vs `tasks_prod`).
#[derive(Debug, Clone)]
pub struct TableNames {
    pub tasks: String,
    pub concepts: String,
    pub color_variations: String,
}

impl TableNames {
    fn resolve(env: Environment) -> Self {
        let suffix = env.suffix();
        Self {
            tasks: format!("tasks_{suffix}"),
            concepts: format!("concepts_{suffix}"),
            color_variations: format!("color_variations_{suffix}"),
        }
    }
}

/// Environment-scoped BlobStore bucket names, overridable (§6).
#[derive(Debug, Clone)]
pub struct BucketNames {
    pub concept: String,
    pub palette: String,
}

impl BucketNames {
    fn resolve(env: Environment) -> Self {
        let suffix = env.suffix();
        let concept = env_string("BLOB_BUCKET_CONCEPT").unwrap_or_else(|| format!("logoforge-concepts-{suffix}"));
        let palette = env_string("BLOB_BUCKET_PALETTE").unwrap_or_else(|| format!("logoforge-palettes-{suffix}"));
        Self { concept, palette }
    }
}

/// Process-wide configuration, constructed once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub table_names: TableNames,
    pub bucket_names: BucketNames,
    /// Reaper threshold for `status=processing` (default 30 min).
    pub processing_timeout: Duration,
    /// Reaper threshold for `status=pending` (default 30 min).
    pub pending_timeout: Duration,
    /// Worker's bounded-concurrency cap for parallel palette generation.
    pub worker_parallelism: usize,
    /// Default `num_palettes` for the generate flow (bounded 1..10).
    pub num_palettes_default: u8,
    /// `None` disables scheduled Concept-retention cleanup.
    pub concept_retention_days: Option<u32>,
    pub log_level: String,
    /// Production-backend DSNs (§10.4); unset when the process runs with
    /// the `in-memory` feature set instead.
    pub database_url: Option<String>,
    pub bus_queue_url: Option<String>,
    pub aws_region: String,
    pub image_provider_base_url: Option<String>,
    pub image_provider_api_key: Option<String>,
}

impl Config {
    /// Load from environment variables. See `SPEC_FULL.md` §10.4.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env_string("ENVIRONMENT") {
            Some(value) => Environment::from_env_var(&value)?,
            None => Environment::Dev,
        };

        let concept_retention_days = match env_string("CONCEPT_RETENTION_DAYS") {
            Some(value) if value.eq_ignore_ascii_case("none") => None,
            Some(value) => Some(value.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
                key: "CONCEPT_RETENTION_DAYS",
                value: value.clone(),
            })?),
            None if environment == Environment::Prod => None,
            None => Some(3),
        };

        Ok(Self {
            environment,
            table_names: TableNames::resolve(environment),
            bucket_names: BucketNames::resolve(environment),
            processing_timeout: Duration::from_secs(env_u64("PROCESSING_TIMEOUT_S").unwrap_or(1800)),
            pending_timeout: Duration::from_secs(env_u64("PENDING_TIMEOUT_S").unwrap_or(1800)),
            worker_parallelism: env_u64("WORKER_PARALLELISM").unwrap_or(3) as usize,
            num_palettes_default: env_u64("NUM_PALETTES_DEFAULT").unwrap_or(7) as u8,
            concept_retention_days,
            log_level: env_string("LOG_LEVEL").unwrap_or_else(|| "INFO".to_string()),
            database_url: env_string("DATABASE_URL"),
            bus_queue_url: env_string("BUS_QUEUE_URL"),
            aws_region: env_string("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            image_provider_base_url: env_string("IMAGE_PROVIDER_BASE_URL"),
            image_provider_api_key: env_string("IMAGE_PROVIDER_API_KEY"),
        })
    }

    /// A config suitable for unit/integration tests: dev environment,
    /// short timeouts, in-memory backends implied by the caller.
    pub fn for_tests() -> Self {
        Self {
            environment: Environment::Test,
            table_names: TableNames::resolve(Environment::Test),
            bucket_names: BucketNames::resolve(Environment::Test),
            processing_timeout: Duration::from_secs(1800),
            pending_timeout: Duration::from_secs(1800),
            worker_parallelism: 3,
            num_palettes_default: 7,
            concept_retention_days: Some(3),
            log_level: "DEBUG".to_string(),
            database_url: None,
            bus_queue_url: None,
            aws_region: "us-east-1".to_string(),
            image_provider_base_url: None,
            image_provider_api_key: None,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key).and_then(|v| v.parse().ok())
}

/// Initialize the global `tracing` subscriber from `Config::log_level`.
/// Call once per binary entry point.
pub fn init_tracing(config: &Config) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
