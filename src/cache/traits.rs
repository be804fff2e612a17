// Cache storage traits.
// A named, persistent map of request URL to buffered response.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::http::RawResponse;

/// One opened named cache.
///
/// Writes are atomic per entry; there is no coordination across entries or
/// callers, so concurrent writers of the same URL race and the last one wins.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Look up the entry stored for `url`.
    async fn get(&self, url: &str) -> Result<Option<RawResponse>>;

    /// Store `response` under `url`, replacing any previous entry.
    async fn put(&self, url: &str, response: &RawResponse) -> Result<()>;

    /// URLs of all stored entries.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Remove the entry for `url`. Returns whether one existed.
    async fn delete(&self, url: &str) -> Result<bool>;

    /// Remove every entry whose URL matches `predicate`. Returns the number removed.
    async fn delete_matching(&self, predicate: &(dyn for<'u> Fn(&'u str) -> bool + Send + Sync)) -> Result<usize> {
        let mut removed = 0;
        for url in self.keys().await? {
            if predicate(&url) && self.delete(&url).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Opens named caches.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open (creating if needed) the cache called `name`.
    ///
    /// Fails with [`FetchError::StorageUnavailable`](crate::error::FetchError::StorageUnavailable)
    /// when the backing storage cannot be used.
    async fn open(&self, name: &str) -> Result<Arc<dyn ResponseCache>>;

    /// Drop the cache called `name` with all its entries. Returns whether it existed.
    async fn delete_cache(&self, name: &str) -> Result<bool>;
}
