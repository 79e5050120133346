//! Redis-backed key-value store for session and license state.
//! Two-tier caching: LocalCache (L1) -> Redis (L2).

use crate::local::LocalCache;
use crate::store::KeyValueStore;
use async_trait::async_trait;
use redis::AsyncCommands;
use std::sync::Arc;
use storefront_core::config::CacheConfig;
use tracing::{debug, info};

const KEY_PREFIX: &str = "storefront:";

/// Redis-backed distributed store with a local L1 layer.
pub struct RedisCache {
    client: redis::Client,
    local: Arc<LocalCache>,
    ttl_secs: u64,
}

impl RedisCache {
    /// Connect to Redis and verify connectivity.
    pub async fn new(config: &CacheConfig) -> anyhow::Result<Self> {
        let url = config
            .redis_urls
            .first()
            .cloned()
            .unwrap_or_else(|| "redis://localhost:6379".to_string());

        info!(url = %url, "Connecting to Redis");

        let client = redis::Client::open(url.as_str())?;

        let mut conn = client.get_multiplexed_async_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!(response = %pong, "Redis connection established");

        // L1 entries live for a short window so other nodes' writes show up quickly.
        let local = Arc::new(LocalCache::new(
            (config.ttl_secs / 2).min(30),
            config.max_local_entries,
        ));

        Ok(Self {
            client,
            local,
            ttl_secs: config.ttl_secs,
        })
    }

    fn redis_key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }

    /// Run periodic maintenance (L1 eviction).
    pub async fn maintenance(&self) {
        let evicted = self.local.evict_expired();
        if evicted > 0 {
            debug!(evicted = evicted, "Local cache eviction complete");
        }
    }

    pub fn local_cache_size(&self) -> usize {
        self.local.len()
    }
}

#[async_trait]
impl KeyValueStore for RedisCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        if let Some(value) = self.local.get_value(key) {
            metrics::counter!("cache.l1.hit").increment(1);
            return Ok(Some(value));
        }
        metrics::counter!("cache.l1.miss").increment(1);

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let data: Option<String> = conn.get(Self::redis_key(key)).await?;

        match data {
            Some(value) => {
                self.local.put_value(key.to_string(), value.clone());
                metrics::counter!("cache.l2.hit").increment(1);
                Ok(Some(value))
            }
            None => {
                metrics::counter!("cache.l2.miss").increment(1);
                debug!(key = key, "Cache miss");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(Self::redis_key(key), &value, self.ttl_secs)
            .await?;

        self.local.put_value(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(Self::redis_key(key)).await?;

        self.local.remove_value(key);
        Ok(())
    }
}
