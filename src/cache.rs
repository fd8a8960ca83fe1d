//! Read-through cache for expensive listings.
//!
//! Handlers talk to the [`Cache`] capability only, so the in-memory backend
//! can be swapped for a distributed one without touching core logic. Values are
//! stored as JSON so any backend can hold them.

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::{
    collections::HashMap,
    future::Future,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

use crate::errors::Result;

/// Key/value store with per-entry expiry.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the live value stored under `key`, if any.
    async fn get(&self, key: &str) -> Option<serde_json::Value>;

    /// Stores `value` under `key` for `ttl`.
    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration);

    /// Drops every entry whose key starts with `prefix`.
    async fn invalidate_prefix(&self, prefix: &str);
}

struct CacheEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

/// Process-local [`Cache`] backed by a `RwLock<HashMap>`.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<serde_json::Value> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: drop it so the map does not grow with dead keys.
        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            entries.remove(key);
            trace!("Evicted expired cache entry {}", key);
        }
        None
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) {
        let now = Instant::now();
        let Some(expires_at) = now.checked_add(ttl) else {
            warn!("Cache TTL {:?} out of range, not caching {}", ttl, key);
            return;
        };

        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        if entries.len() < before {
            trace!("Evicted {} expired cache entries", before - entries.len());
        }
        entries.insert(key.to_string(), CacheEntry { value, expires_at });
    }

    async fn invalidate_prefix(&self, prefix: &str) {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        debug!(
            "Invalidated {} cache entries with prefix {:?}",
            before - entries.len(),
            prefix
        );
    }
}

/// Returns the cached value for `key`, computing and storing it on a miss.
///
/// A cached value that no longer deserializes into `T` is treated as a miss.
pub async fn get_or_compute<T, F, Fut>(
    cache: &dyn Cache,
    key: &str,
    ttl: Duration,
    compute: F,
) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if let Some(value) = cache.get(key).await {
        match serde_json::from_value(value) {
            Ok(hit) => {
                debug!("Cache hit for {}", key);
                return Ok(hit);
            }
            Err(e) => warn!("Discarding undecodable cache entry {}: {}", key, e),
        }
    }

    debug!("Cache miss for {}", key);
    let fresh = compute().await?;
    cache.set(key, serde_json::to_value(&fresh)?, ttl).await;
    Ok(fresh)
}
