//! The cache store: get/set with TTL, hit/miss accounting, degrade-to-miss.

use crate::client::RedisPool;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Hit/miss counters, readable as a snapshot for cost tracking.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

impl CacheMetrics {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

enum Backend {
    Redis(RedisPool),
    Memory(Mutex<HashMap<String, (String, Instant)>>),
    Disabled,
}

/// Shared cache handle. Cloning is cheap; all clones share counters and the
/// backing store.
#[derive(Clone)]
pub struct Cache {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Backend,
    metrics: CacheMetrics,
}

impl Cache {
    /// Production cache over a Redis pool.
    pub fn redis(pool: RedisPool) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend: Backend::Redis(pool),
                metrics: CacheMetrics::default(),
            }),
        }
    }

    /// In-process cache for tests and single-node runs.
    pub fn memory() -> Self {
        Self {
            inner: Arc::new(Inner {
                backend: Backend::Memory(Mutex::new(HashMap::new())),
                metrics: CacheMetrics::default(),
            }),
        }
    }

    /// A cache that always misses (config `cache.enabled = false`).
    pub fn disabled() -> Self {
        Self {
            inner: Arc::new(Inner {
                backend: Backend::Disabled,
                metrics: CacheMetrics::default(),
            }),
        }
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.inner.metrics
    }

    /// Release the backend. Clears the in-process map; a Redis connection
    /// manager closes with its last handle. Reads after close behave as
    /// misses.
    pub fn close(&self) {
        if let Backend::Memory(map) = &self.inner.backend {
            if let Ok(mut map) = map.try_lock() {
                map.clear();
            }
        }
        debug!("cache closed");
    }

    /// Look up a JSON value. Backend failures are logged and counted, then
    /// reported as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match &self.inner.backend {
            Backend::Disabled => None,
            Backend::Memory(map) => {
                let mut map = map.lock().await;
                match map.get(key) {
                    Some((value, deadline)) if *deadline > Instant::now() => Some(value.clone()),
                    Some(_) => {
                        map.remove(key);
                        None
                    }
                    None => None,
                }
            }
            Backend::Redis(pool) => {
                let mut conn = pool.clone();
                match conn.get::<_, Option<String>>(key).await {
                    Ok(value) => value,
                    Err(e) => {
                        warn!(key, error = %e, "cache read failed; treating as miss");
                        self.inner.metrics.errors.fetch_add(1, Ordering::Relaxed);
                        None
                    }
                }
            }
        };

        match raw {
            Some(json) => match serde_json::from_str(&json) {
                Ok(value) => {
                    self.inner.metrics.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key, "cache hit");
                    Some(value)
                }
                Err(e) => {
                    warn!(key, error = %e, "cache entry failed to decode; treating as miss");
                    self.inner.metrics.errors.fetch_add(1, Ordering::Relaxed);
                    None
                }
            },
            None => {
                self.inner.metrics.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a JSON value with a TTL. Failures are logged and swallowed.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(key, error = %e, "cache value failed to encode; skipping store");
                self.inner.metrics.errors.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        match &self.inner.backend {
            Backend::Disabled => {}
            Backend::Memory(map) => {
                let mut map = map.lock().await;
                map.insert(key.to_string(), (json, Instant::now() + ttl));
            }
            Backend::Redis(pool) => {
                let mut conn = pool.clone();
                let result: redis::RedisResult<()> =
                    conn.set_ex(key, json, ttl.as_secs()).await;
                if let Err(e) = result {
                    warn!(key, error = %e, "cache write failed; continuing without store");
                    self.inner.metrics.errors.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Entry {
        value: u32,
    }

    #[tokio::test]
    async fn test_memory_round_trip() {
        let cache = Cache::memory();
        let key = "tech_research:database:abc";
        assert_eq!(cache.get_json::<Entry>(key).await, None);

        cache
            .set_json(key, &Entry { value: 7 }, Duration::from_secs(60))
            .await;
        assert_eq!(cache.get_json::<Entry>(key).await, Some(Entry { value: 7 }));
        assert_eq!(cache.metrics().hits(), 1);
        assert_eq!(cache.metrics().misses(), 1);
    }

    #[tokio::test]
    async fn test_memory_expiry() {
        let cache = Cache::memory();
        cache
            .set_json("k", &Entry { value: 1 }, Duration::from_millis(10))
            .await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get_json::<Entry>("k").await, None);
    }

    #[tokio::test]
    async fn test_disabled_always_misses() {
        let cache = Cache::disabled();
        cache
            .set_json("k", &Entry { value: 1 }, Duration::from_secs(60))
            .await;
        assert_eq!(cache.get_json::<Entry>("k").await, None);
        assert_eq!(cache.metrics().hits(), 0);
    }

    #[tokio::test]
    async fn test_close_clears_memory_backend() {
        let cache = Cache::memory();
        cache
            .set_json("k", &Entry { value: 1 }, Duration::from_secs(60))
            .await;
        cache.close();
        assert_eq!(cache.get_json::<Entry>("k").await, None);
    }

    #[tokio::test]
    async fn test_identical_keys_return_identical_content() {
        let cache = Cache::memory();
        cache
            .set_json("key", &Entry { value: 42 }, Duration::from_secs(60))
            .await;
        let first: Entry = cache.get_json("key").await.unwrap();
        let second: Entry = cache.get_json("key").await.unwrap();
        assert_eq!(first, second);
    }
}
