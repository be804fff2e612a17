// In-memory cache storage.
// Used by tests and by callers that want caching only for the lifetime of the process.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::{FetchError, Result};
use crate::http::RawResponse;

use super::traits::{CacheStorage, ResponseCache};

/// Cache storage kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    caches: Mutex<HashMap<String, Arc<MemoryCache>>>,
    unavailable: bool,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage whose `open` always fails, simulating a disabled or broken cache.
    pub fn unavailable() -> Self {
        Self {
            caches: Mutex::default(),
            unavailable: true,
        }
    }

    /// Direct handle to a named cache, creating it if needed.
    pub fn cache(&self, name: &str) -> Arc<MemoryCache> {
        let mut caches = self.caches.lock().unwrap_or_else(PoisonError::into_inner);
        caches.entry(name.to_string()).or_default().clone()
    }

    /// Whether a cache called `name` exists.
    pub fn contains_cache(&self, name: &str) -> bool {
        self.caches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn ResponseCache>> {
        if self.unavailable {
            return Err(FetchError::StorageUnavailable(format!(
                "cache {} is disabled",
                name
            )));
        }
        Ok(self.cache(name))
    }

    async fn delete_cache(&self, name: &str) -> Result<bool> {
        let mut caches = self.caches.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(caches.remove(name).is_some())
    }
}

/// One in-memory named cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<BTreeMap<String, RawResponse>>,
}

impl MemoryCache {
    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, url: &str) -> Result<Option<RawResponse>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(url).cloned())
    }

    async fn put(&self, url: &str, response: &RawResponse) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(url.to_string(), response.clone());
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.keys().cloned().collect())
    }

    async fn delete(&self, url: &str) -> Result<bool> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.remove(url).is_some())
    }
}
