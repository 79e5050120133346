//! In-process cache backed by DashMap for lock-free concurrent access.
//! Serves as the whole store in single-node mode and as L1 in front of Redis.

use crate::store::KeyValueStore;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct CacheEntry {
    value: String,
    inserted_at: Instant,
}

/// Lock-free local key-value cache with a per-entry TTL.
pub struct LocalCache {
    store: Arc<DashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl LocalCache {
    pub fn new(ttl_secs: u64, max_entries: usize) -> Self {
        Self {
            store: Arc::new(DashMap::with_capacity(max_entries.min(1024))),
            ttl: Duration::from_secs(ttl_secs),
            max_entries,
        }
    }

    /// Get a value, returns None if expired or missing.
    pub fn get_value(&self, key: &str) -> Option<String> {
        let entry = self.store.get(key)?;
        if entry.inserted_at.elapsed() > self.ttl {
            drop(entry);
            self.store.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    /// Insert or update a value. Returns false when the cache is full of live
    /// entries and `key` is new.
    pub fn put_value(&self, key: String, value: String) -> bool {
        if self.store.len() >= self.max_entries && !self.store.contains_key(&key) {
            self.evict_expired();
            if self.store.len() >= self.max_entries {
                return false;
            }
        }
        self.store.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
        true
    }

    pub fn remove_value(&self, key: &str) {
        self.store.remove(key);
    }

    /// Remove expired entries. Call this periodically from a background task.
    pub fn evict_expired(&self) -> usize {
        let before = self.store.len();
        self.store
            .retain(|_, entry| entry.inserted_at.elapsed() <= self.ttl);
        before - self.store.len()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for LocalCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.get_value(key))
    }

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        if self.put_value(key.to_string(), value) {
            Ok(())
        } else {
            metrics::counter!("cache.local.rejected").increment(1);
            anyhow::bail!("local cache is full ({} entries)", self.max_entries)
        }
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.remove_value(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{get_json, put_json};

    #[tokio::test]
    async fn test_set_get_remove() {
        let cache = LocalCache::new(60, 10);
        cache.set("cart", "[]".into()).await.unwrap();
        assert_eq!(cache.get("cart").await.unwrap().as_deref(), Some("[]"));

        cache.remove("cart").await.unwrap();
        assert_eq!(cache.get("cart").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entries_are_dropped() {
        let cache = LocalCache::new(0, 10);
        cache.put_value("k".into(), "v".into());
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.get_value("k"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_full_cache_rejects_new_keys_but_updates_existing() {
        let cache = LocalCache::new(60, 1);
        cache.set("a", "1".into()).await.unwrap();
        assert!(cache.set("b", "2".into()).await.is_err());
        cache.set("a", "3".into()).await.unwrap();
        assert_eq!(cache.get_value("a").as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let cache = LocalCache::new(60, 10);
        put_json(&cache, "numbers", &vec![1, 2, 3]).await.unwrap();
        let numbers: Option<Vec<i32>> = get_json(&cache, "numbers").await.unwrap();
        assert_eq!(numbers, Some(vec![1, 2, 3]));

        let missing: Option<Vec<i32>> = get_json(&cache, "missing").await.unwrap();
        assert!(missing.is_none());
    }
}
