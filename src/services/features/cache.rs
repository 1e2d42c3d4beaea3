/// Feature Cache
///
/// Single-flight, TTL-aware store for externally fetched feature data.
/// Guarantees that under any number of simultaneous callers for the same
/// key, the fetch runs at most once per staleness window. Unrelated keys
/// refresh independently via a per-key lock table.
use super::{FeatureData, FeatureKey};
use crate::config::CacheConfig;
use crate::error::Result;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// Cached feature data with its fetch timestamp
///
/// An entry is stale once `now - fetched_at > ttl`. Staleness never deletes
/// the entry, it only makes the key eligible for refresh.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: FeatureKey,
    pub data: FeatureData,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.fetched_at);
        chrono::Duration::from_std(ttl)
            .map(|ttl| age <= ttl)
            .unwrap_or(false)
    }
}

/// Cache statistics snapshot
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub total_entries: usize,
    pub fresh_entries: usize,
    pub stale_entries: usize,
    pub in_flight: usize,
}

pub struct FeatureCache {
    entries: RwLock<HashMap<FeatureKey, CacheEntry>>,
    /// Per-key fetch locks; holding a key's lock marks its fetch in flight
    locks: DashMap<FeatureKey, Arc<Mutex<()>>>,
}

impl Default for FeatureCache {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            locks: DashMap::new(),
        }
    }

    /// Get the cached value for `key`, fetching it if missing or stale.
    ///
    /// - A fresh entry returns immediately without touching the network.
    /// - If a fetch for `key` is already in flight, callers await it and
    ///   share its result instead of starting a second fetch.
    /// - Otherwise `fetch_fn` runs, and its result is stored with a fresh
    ///   timestamp. The in-flight marker is released whether the fetch
    ///   succeeded or failed.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: FeatureKey,
        ttl: Duration,
        fetch_fn: F,
    ) -> Result<FeatureData>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<FeatureData>>,
    {
        if let Some(data) = self.get_if_fresh(key, ttl).await {
            debug!(key = %key, "Feature cache hit");
            return Ok(data);
        }

        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        // Waiters for an in-flight fetch queue here. The guard is released
        // on every exit path, including fetch errors.
        let _guard = lock.lock().await;

        // Another caller may have completed the fetch while we waited
        if let Some(data) = self.get_if_fresh(key, ttl).await {
            debug!(key = %key, "Feature cache hit after coalesced fetch");
            return Ok(data);
        }

        debug!(key = %key, "Fetching feature data");
        let data = fetch_fn().await?;

        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CacheEntry {
                key,
                data: data.clone(),
                fetched_at: Utc::now(),
            },
        );

        Ok(data)
    }

    /// Return the cached value for `key` if present and unexpired
    pub async fn get_if_fresh(&self, key: FeatureKey, ttl: Duration) -> Option<FeatureData> {
        let entries = self.entries.read().await;
        entries
            .get(&key)
            .filter(|entry| entry.is_fresh(ttl))
            .map(|entry| entry.data.clone())
    }

    /// Force the next `get_or_fetch` for `key` to bypass the cached value
    pub async fn invalidate(&self, key: FeatureKey) {
        let mut entries = self.entries.write().await;
        if entries.remove(&key).is_some() {
            info!(key = %key, "Feature cache invalidated");
        }
    }

    /// Drop all cached entries
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        info!(count, "Feature cache cleared");
    }

    pub async fn stats(&self, config: &CacheConfig) -> CacheStats {
        let entries = self.entries.read().await;

        let mut fresh = 0;
        let mut stale = 0;
        for entry in entries.values() {
            if entry.is_fresh(entry.key.ttl(config)) {
                fresh += 1;
            } else {
                stale += 1;
            }
        }

        let in_flight = self
            .locks
            .iter()
            .filter(|item| item.value().try_lock().is_err())
            .count();

        CacheStats {
            total_entries: entries.len(),
            fresh_entries: fresh,
            stale_entries: stale,
            in_flight,
        }
    }
}
