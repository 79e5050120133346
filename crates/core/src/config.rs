use crate::error::StorefrontResult;
use crate::types::PaymentProviderKind;
use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `STOREFRONT__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub tenancy: TenancyConfig,
    #[serde(default)]
    pub licensing: LicensingConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub datastore: DatastoreConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// ─── Tenancy ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct TenancyConfig {
    /// Slug used when no request signal names a tenant.
    #[serde(default)]
    pub default_slug: Option<String>,
    /// Subdomain labels that never name a tenant.
    #[serde(default = "default_reserved_subdomains")]
    pub reserved_subdomains: Vec<String>,
}

fn default_reserved_subdomains() -> Vec<String> {
    ["www", "app", "admin", "store", "market", "api"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            default_slug: None,
            reserved_subdomains: default_reserved_subdomains(),
        }
    }
}

// ─── Licensing ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct LicensingConfig {
    #[serde(default = "default_authority_url")]
    pub authority_url: String,
    #[serde(default = "default_license_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_max_staleness_hours")]
    pub max_staleness_hours: i64,
    #[serde(default = "default_license_cache_key")]
    pub cache_key: String,
}

fn default_authority_url() -> String {
    "https://master.seusistema.app/api/license-status".to_string()
}
fn default_license_timeout_ms() -> u64 {
    5000
}
fn default_refresh_interval_secs() -> u64 {
    30 * 60
}
fn default_max_staleness_hours() -> i64 {
    72
}
fn default_license_cache_key() -> String {
    "store_license_status".to_string()
}

impl Default for LicensingConfig {
    fn default() -> Self {
        Self {
            authority_url: default_authority_url(),
            timeout_ms: default_license_timeout_ms(),
            refresh_interval_secs: default_refresh_interval_secs(),
            max_staleness_hours: default_max_staleness_hours(),
            cache_key: default_license_cache_key(),
        }
    }
}

// ─── Billing ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Base URL of the master (billing) application used for unblock links.
    #[serde(default = "default_master_base_url")]
    pub master_base_url: String,
    #[serde(default = "default_provider")]
    pub default_provider: PaymentProviderKind,
    #[serde(default)]
    pub stripe_secret_key: Option<String>,
    #[serde(default = "default_stripe_api_base")]
    pub stripe_api_base: String,
    #[serde(default)]
    pub webhook_secret: Option<String>,
    #[serde(default = "default_webhook_tolerance_secs")]
    pub webhook_tolerance_secs: i64,
}

fn default_master_base_url() -> String {
    "http://localhost:5175".to_string()
}
fn default_provider() -> PaymentProviderKind {
    PaymentProviderKind::Stripe
}
fn default_stripe_api_base() -> String {
    "https://api.stripe.com".to_string()
}
fn default_webhook_tolerance_secs() -> i64 {
    300
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            master_base_url: default_master_base_url(),
            default_provider: default_provider(),
            stripe_secret_key: None,
            stripe_api_base: default_stripe_api_base(),
            webhook_secret: None,
            webhook_tolerance_secs: default_webhook_tolerance_secs(),
        }
    }
}

// ─── Datastore ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatastoreBackend {
    /// In-process store seeded with demo tenants.
    Memory,
    /// PostgREST-compatible RPC endpoint.
    Rest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatastoreConfig {
    #[serde(default = "default_datastore_backend")]
    pub backend: DatastoreBackend,
    #[serde(default = "default_datastore_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_datastore_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_datastore_backend() -> DatastoreBackend {
    DatastoreBackend::Memory
}
fn default_datastore_url() -> String {
    "http://localhost:54321".to_string()
}
fn default_datastore_timeout_ms() -> u64 {
    10_000
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            backend: default_datastore_backend(),
            url: default_datastore_url(),
            api_key: String::new(),
            timeout_ms: default_datastore_timeout_ms(),
        }
    }
}

// ─── Cache ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    Local,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_backend")]
    pub backend: CacheBackend,
    #[serde(default = "default_redis_urls")]
    pub redis_urls: Vec<String>,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_max_local_entries")]
    pub max_local_entries: usize,
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::Local
}
fn default_redis_urls() -> Vec<String> {
    vec!["redis://localhost:6379".to_string()]
}
fn default_ttl_secs() -> u64 {
    7 * 24 * 3600
}
fn default_max_local_entries() -> usize {
    100_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            redis_urls: default_redis_urls(),
            ttl_secs: default_ttl_secs(),
            max_local_entries: default_max_local_entries(),
        }
    }
}

// Default functions
fn default_node_id() -> String {
    "storefront-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9091
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            tenancy: TenancyConfig::default(),
            licensing: LicensingConfig::default(),
            billing: BillingConfig::default(),
            datastore: DatastoreConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> StorefrontResult<Self> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("STOREFRONT")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("tenancy.reserved_subdomains")
                .with_list_parse_key("cache.redis_urls"),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }
}
