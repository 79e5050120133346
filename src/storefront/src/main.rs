//! Storefront: multi-tenant pharmacy storefront server.
//!
//! Main entry point that wires the data store, cache, license gates, and the
//! REST API, then serves traffic.

use clap::{Parser, ValueEnum};
use std::sync::Arc;
use std::time::Duration;
use storefront_api::{ApiServer, AppState};
use storefront_cache::{KeyValueStore, LocalCache, RedisCache};
use storefront_core::config::{AppConfig, CacheBackend, DatastoreBackend};
use storefront_datastore::{Datastore, InMemoryDatastore, RestDatastore};
use storefront_licensing::{HttpLicenseAuthority, LicenseRegistry};
use tracing::{error, info, warn};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DatastoreArg {
    Memory,
    Rest,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CacheArg {
    Local,
    Redis,
}

#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(about = "Multi-tenant pharmacy storefront server")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "STOREFRONT__NODE_ID")]
    node_id: Option<String>,

    /// Bind address (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "STOREFRONT__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Data store backend (overrides config)
    #[arg(long, value_enum)]
    datastore: Option<DatastoreArg>,

    /// Cache backend (overrides config)
    #[arg(long, value_enum)]
    cache: Option<CacheArg>,

    /// Store slug used when a request names none
    #[arg(long)]
    default_tenant: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Storefront starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(host) = cli.host {
        config.api.host = host;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    match cli.datastore {
        Some(DatastoreArg::Memory) => config.datastore.backend = DatastoreBackend::Memory,
        Some(DatastoreArg::Rest) => config.datastore.backend = DatastoreBackend::Rest,
        None => {}
    }
    match cli.cache {
        Some(CacheArg::Local) => config.cache.backend = CacheBackend::Local,
        Some(CacheArg::Redis) => config.cache.backend = CacheBackend::Redis,
        None => {}
    }
    if let Some(slug) = cli.default_tenant {
        config.tenancy.default_slug = Some(slug);
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        datastore = ?config.datastore.backend,
        cache = ?config.cache.backend,
        "Configuration loaded"
    );

    // Data store
    let datastore = match config.datastore.backend {
        DatastoreBackend::Memory => {
            let memory = Arc::new(InMemoryDatastore::new());
            memory.seed_demo();
            info!("Using in-memory data store with demo tenants");
            Datastore::from_backend(memory)
        }
        DatastoreBackend::Rest => {
            info!(url = %config.datastore.url, "Using REST data store");
            Datastore::from_backend(Arc::new(RestDatastore::new(&config.datastore)?))
        }
    };

    // Session and license cache
    let (kv, maintenance): (Arc<dyn KeyValueStore>, CacheMaintenance) =
        match config.cache.backend {
            CacheBackend::Redis => match RedisCache::new(&config.cache).await {
                Ok(redis) => {
                    let redis = Arc::new(redis);
                    let kv: Arc<dyn KeyValueStore> = redis.clone();
                    (kv, CacheMaintenance::Redis(redis))
                }
                Err(e) => {
                    error!(error = %e, "Failed to connect to Redis, falling back to local cache");
                    local_cache(&config)
                }
            },
            CacheBackend::Local => local_cache(&config),
        };

    // License gates
    let authority = Arc::new(HttpLicenseAuthority::new(&config.licensing)?);
    let licenses = LicenseRegistry::new(authority, kv.clone(), config.licensing.clone());

    let state = AppState::new(&config, datastore, kv, licenses);
    let api_server = ApiServer::new(config.clone(), state);

    // Start metrics exporter
    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    // Spawn cache maintenance task
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            maintenance.run().await;
        }
    });

    info!("Storefront is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}

enum CacheMaintenance {
    Local(Arc<LocalCache>),
    Redis(Arc<RedisCache>),
}

impl CacheMaintenance {
    async fn run(&self) {
        match self {
            Self::Local(cache) => {
                let evicted = cache.evict_expired();
                if evicted > 0 {
                    tracing::debug!(evicted, "Local cache eviction complete");
                }
            }
            Self::Redis(cache) => cache.maintenance().await,
        }
    }
}

fn local_cache(config: &AppConfig) -> (Arc<dyn KeyValueStore>, CacheMaintenance) {
    let local = Arc::new(LocalCache::new(
        config.cache.ttl_secs,
        config.cache.max_local_entries,
    ));
    info!(max_entries = config.cache.max_local_entries, "Using local cache");
    let kv: Arc<dyn KeyValueStore> = local.clone();
    (kv, CacheMaintenance::Local(local))
}
