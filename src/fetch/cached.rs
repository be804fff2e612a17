// Cached fetch policy.
// Decides per call whether to serve from cache, force a refresh, or fall back to stale data.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{CacheStorage, ResponseCache};
use crate::error::Result;
use crate::http::RawResponse;

use super::fetcher::Fetcher;
use super::session::RefreshTracker;

/// Per-call options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Fetch fresh data once per session, even when a cached entry exists.
    pub refresh: bool,
}

impl FetchOptions {
    pub fn refresh() -> Self {
        Self { refresh: true }
    }
}

/// Network access mediated by a named persistent cache.
///
/// Two concurrent calls that miss on the same URL both fetch and both
/// write; the last write wins.
#[derive(Clone)]
pub struct CachedFetch {
    storage: Arc<dyn CacheStorage>,
    fetcher: Fetcher,
    cache_name: String,
}

impl CachedFetch {
    pub fn new(storage: Arc<dyn CacheStorage>, fetcher: Fetcher, cache_name: impl Into<String>) -> Self {
        Self {
            storage,
            fetcher,
            cache_name: cache_name.into(),
        }
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Fetch `url` and decode it, going through the cache.
    pub async fn fetch<T, D>(
        &self,
        session: &RefreshTracker,
        url: &str,
        options: FetchOptions,
        decode: D,
    ) -> Result<T>
    where
        D: Fn(&RawResponse) -> Result<T>,
    {
        let cache = match self.storage.open(&self.cache_name).await {
            Ok(cache) => {
                debug!(cache = %self.cache_name, url, "opened cache");
                cache
            }
            Err(err) => {
                warn!(cache = %self.cache_name, error = %err, "failed to open cache");
                let response = self.fetcher.fetch(url, false).await?;
                return decode(&response);
            }
        };

        let cached = match cache.get(url).await {
            Ok(entry) => entry.filter(RawResponse::is_ok),
            Err(err) => {
                warn!(url, error = %err, "failed to read cache entry, treating as miss");
                None
            }
        };

        let refresh = options.refresh && session.should_force_refresh(url);

        if refresh {
            match self.fetch_and_store(cache.as_ref(), url, &decode, true).await {
                Ok(value) => Ok(value),
                Err(err) => match cached {
                    Some(response) => {
                        debug!(url, error = %err, "cannot refresh, using cache");
                        decode(&response)
                    }
                    None => Err(err.context("Failed to fetch")),
                },
            }
        } else {
            if let Some(response) = cached {
                debug!(url, "retrieving cached data");
                return decode(&response);
            }
            self.fetch_and_store(cache.as_ref(), url, &decode, false)
                .await
        }
    }

    async fn fetch_and_store<T, D>(
        &self,
        cache: &dyn ResponseCache,
        url: &str,
        decode: &D,
        bypass_cache: bool,
    ) -> Result<T>
    where
        D: Fn(&RawResponse) -> Result<T>,
    {
        let response = self.fetcher.fetch(url, bypass_cache).await?;
        let value = decode(&response)?;

        // Keyed by the requested URL, even when a mirror served the bytes
        if let Err(err) = cache.put(url, &response).await {
            warn!(url, error = %err, "failed to store response in cache");
        }

        Ok(value)
    }
}
