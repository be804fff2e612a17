// Version resolution.
// Maps version references to concrete refs and invalidates "latest" data when upstream moves.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::CacheStorage;
use crate::config::SourceConfig;
use crate::error::Result;
use crate::settings::{LATEST_VERSION_KEY, SettingsStore};

/// A configured version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub id: String,
    /// Pinned upstream reference; the id when unset.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Follows whatever the latest upstream snapshot is.
    #[serde(default)]
    pub dynamic: bool,
}

impl VersionEntry {
    pub fn pinned(id: &str) -> Self {
        Self {
            id: id.to_string(),
            reference: Some(id.to_string()),
            dynamic: false,
        }
    }

    pub fn dynamic(id: &str) -> Self {
        Self {
            id: id.to_string(),
            reference: None,
            dynamic: true,
        }
    }

    pub fn version_ref(&self) -> VersionRef {
        if self.dynamic {
            VersionRef::Dynamic
        } else {
            VersionRef::Pinned(self.reference.clone().unwrap_or_else(|| self.id.clone()))
        }
    }
}

/// Reference to a dataset snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRef {
    /// An immutable snapshot.
    Pinned(String),
    /// Whatever the latest snapshot currently is.
    Dynamic,
}

/// Outcome of resolving a [`VersionRef`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    /// Concrete snapshot identifier.
    pub reference: String,
    /// Data is served from the rolling branches rather than `{ref}-{type}` ones.
    pub dynamic: bool,
}

/// Resolves version references and keeps latest-scoped cache entries consistent.
#[derive(Clone)]
pub struct VersionResolver {
    settings: Arc<dyn SettingsStore>,
    storage: Arc<dyn CacheStorage>,
    cache_name: String,
    latest_version: String,
    prefixes: Vec<String>,
}

impl VersionResolver {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        storage: Arc<dyn CacheStorage>,
        cache_name: impl Into<String>,
        latest_version: impl Into<String>,
        sources: &SourceConfig,
    ) -> Self {
        Self {
            settings,
            storage,
            cache_name: cache_name.into(),
            latest_version: latest_version.into(),
            prefixes: invalidation_prefixes(sources),
        }
    }

    pub fn latest_version(&self) -> &str {
        &self.latest_version
    }

    /// Resolve `version` to a concrete reference.
    ///
    /// For the dynamic ref, the first call after the latest version changes
    /// drops every latest-scoped cache entry and records the new stamp.
    pub async fn resolve(&self, version: &VersionRef) -> Result<ResolvedVersion> {
        match version {
            VersionRef::Pinned(reference) => Ok(ResolvedVersion {
                reference: reference.clone(),
                dynamic: false,
            }),
            VersionRef::Dynamic => {
                // An unreadable stamp counts as a mismatch
                let stamp = self.settings.get(LATEST_VERSION_KEY).await.unwrap_or_else(|err| {
                    warn!(error = %err, "failed to read latest-version stamp");
                    None
                });
                if stamp.as_deref() != Some(self.latest_version.as_str()) {
                    self.invalidate_latest(stamp.as_deref()).await;
                    if let Err(err) = self.settings.set(LATEST_VERSION_KEY, &self.latest_version).await {
                        warn!(error = %err, "failed to record latest-version stamp");
                    }
                }
                Ok(ResolvedVersion {
                    reference: self.latest_version.clone(),
                    dynamic: true,
                })
            }
        }
    }

    /// Fingerprint of the data currently loaded for `entry`.
    pub async fn checksum(&self, entry: &VersionEntry) -> Result<String> {
        match entry.version_ref() {
            VersionRef::Pinned(reference) => Ok(reference),
            VersionRef::Dynamic => Ok(self
                .settings
                .get(LATEST_VERSION_KEY)
                .await?
                .unwrap_or_default()),
        }
    }

    async fn invalidate_latest(&self, previous: Option<&str>) {
        let cache = match self.storage.open(&self.cache_name).await {
            Ok(cache) => cache,
            Err(err) => {
                warn!(cache = %self.cache_name, error = %err, "failed to open cache for invalidation");
                return;
            }
        };

        let prefixes = &self.prefixes;
        let matches = |url: &str| prefixes.iter().any(|prefix| url.starts_with(prefix));
        match cache.delete_matching(&matches).await {
            Ok(removed) => info!(
                previous = previous.unwrap_or("none"),
                latest = %self.latest_version,
                removed,
                "latest version changed, removed cached entries"
            ),
            Err(err) => warn!(error = %err, "failed to invalidate latest-version entries"),
        }
    }
}

/// URL prefixes of data that follows the latest version.
pub fn invalidation_prefixes(sources: &SourceConfig) -> Vec<String> {
    let mut prefixes: Vec<String> = ["summary", "data", "assets", "registries", "atlas"]
        .iter()
        .map(|branch| format!("{}/{}/", sources.mcmeta_url, branch))
        .collect();
    prefixes.push(format!("{}/assets-json/", sources.mcmeta_tarball_url));
    prefixes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCacheStorage, ResponseCache};
    use crate::http::RawResponse;
    use crate::settings::MemorySettings;

    const CACHE: &str = "misode-v2";

    fn resolver(
        settings: Arc<MemorySettings>,
        storage: Arc<MemoryCacheStorage>,
        latest: &str,
    ) -> VersionResolver {
        VersionResolver::new(settings, storage, CACHE, latest, &SourceConfig::default())
    }

    #[test]
    fn test_version_ref() {
        assert_eq!(
            VersionEntry::pinned("1.21.4").version_ref(),
            VersionRef::Pinned("1.21.4".to_string())
        );
        assert_eq!(VersionEntry::dynamic("1.21.5").version_ref(), VersionRef::Dynamic);

        let entry = VersionEntry {
            id: "1.21".to_string(),
            reference: None,
            dynamic: false,
        };
        assert_eq!(entry.version_ref(), VersionRef::Pinned("1.21".to_string()));
    }

    #[tokio::test]
    async fn test_pinned_unchanged() {
        let settings = Arc::new(MemorySettings::new());
        let resolver = resolver(settings.clone(), Arc::new(MemoryCacheStorage::new()), "1.21.5");

        let resolved = resolver
            .resolve(&VersionRef::Pinned("1.20.5".to_string()))
            .await
            .unwrap();

        assert_eq!(resolved.reference, "1.20.5");
        assert!(!resolved.dynamic);
        assert_eq!(settings.get(LATEST_VERSION_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_latest_change_invalidates_prefixes() {
        let sources = SourceConfig::default();
        let settings = Arc::new(MemorySettings::with_values([(LATEST_VERSION_KEY, "1.21.4")]));
        let storage = Arc::new(MemoryCacheStorage::new());
        let cache = storage.cache(CACHE);

        let stale = [
            format!("{}/summary/registries/data.min.json", sources.mcmeta_url),
            format!("{}/data/data/minecraft/recipe/stick.json", sources.mcmeta_url),
            format!("{}/assets/assets/minecraft/lang/en_us.json", sources.mcmeta_url),
            format!("{}/registries/item/data.json", sources.mcmeta_url),
            format!("{}/atlas/all/data.min.json", sources.mcmeta_url),
            format!("{}/assets-json/x", sources.mcmeta_tarball_url),
        ];
        let kept = [
            format!("{}/1.21.4-summary/registries/data.min.json", sources.mcmeta_url),
            format!("{}/data-json/x.json", sources.mcmeta_url),
            format!("{}/generated/symbols.json", sources.vanilla_mcdoc_url),
        ];
        for url in stale.iter().chain(kept.iter()) {
            cache.put(url, &RawResponse::new(url.as_str(), 200, "")).await.unwrap();
        }

        let resolver = resolver(settings.clone(), storage.clone(), "1.21.5");
        let resolved = resolver.resolve(&VersionRef::Dynamic).await.unwrap();

        assert_eq!(resolved.reference, "1.21.5");
        assert!(resolved.dynamic);
        let mut expected: Vec<String> = kept.to_vec();
        expected.sort();
        assert_eq!(cache.keys().await.unwrap(), expected);
        assert_eq!(
            settings.get(LATEST_VERSION_KEY).await.unwrap().as_deref(),
            Some("1.21.5")
        );
    }

    #[tokio::test]
    async fn test_same_latest_keeps_entries() {
        let sources = SourceConfig::default();
        let settings = Arc::new(MemorySettings::with_values([(LATEST_VERSION_KEY, "1.21.5")]));
        let storage = Arc::new(MemoryCacheStorage::new());
        let url = format!("{}/summary/versions/data.min.json", sources.mcmeta_url);
        storage
            .cache(CACHE)
            .put(&url, &RawResponse::new(url.as_str(), 200, "[]"))
            .await
            .unwrap();

        let resolver = resolver(settings, storage.clone(), "1.21.5");
        resolver.resolve(&VersionRef::Dynamic).await.unwrap();

        assert_eq!(storage.cache(CACHE).len(), 1);
    }

    #[tokio::test]
    async fn test_invalidation_survives_unavailable_storage() {
        let settings = Arc::new(MemorySettings::new());
        let resolver = resolver(settings.clone(), Arc::new(MemoryCacheStorage::unavailable()), "1.21.5");

        let resolved = resolver.resolve(&VersionRef::Dynamic).await.unwrap();

        assert_eq!(resolved.reference, "1.21.5");
        assert_eq!(
            settings.get(LATEST_VERSION_KEY).await.unwrap().as_deref(),
            Some("1.21.5")
        );
    }

    #[tokio::test]
    async fn test_checksum() {
        let settings = Arc::new(MemorySettings::new());
        let resolver = resolver(settings.clone(), Arc::new(MemoryCacheStorage::new()), "1.21.5");

        assert_eq!(
            resolver.checksum(&VersionEntry::pinned("1.21.4")).await.unwrap(),
            "1.21.4"
        );
        assert_eq!(
            resolver.checksum(&VersionEntry::dynamic("1.21.5")).await.unwrap(),
            ""
        );

        resolver.resolve(&VersionRef::Dynamic).await.unwrap();
        assert_eq!(
            resolver.checksum(&VersionEntry::dynamic("1.21.5")).await.unwrap(),
            "1.21.5"
        );
    }

    struct BrokenSettings;

    #[async_trait::async_trait]
    impl SettingsStore for BrokenSettings {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(crate::error::FetchError::Other("settings unreadable".to_string()))
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(crate::error::FetchError::Other("settings unwritable".to_string()))
        }
        async fn remove(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unreadable_stamp_invalidates_and_resolves() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let summary = "https://raw.githubusercontent.com/misode/mcmeta/summary/versions/data.min.json";
        storage
            .cache(CACHE)
            .put(summary, &RawResponse::new(summary, 200, "[]"))
            .await
            .unwrap();
        let resolver = VersionResolver::new(
            Arc::new(BrokenSettings),
            storage.clone(),
            CACHE,
            "1.21.5",
            &SourceConfig::default(),
        );

        let resolved = resolver.resolve(&VersionRef::Dynamic).await.unwrap();

        assert_eq!(resolved.reference, "1.21.5");
        assert!(resolved.dynamic);
        assert!(storage.cache(CACHE).is_empty());
    }
}
