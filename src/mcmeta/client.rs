// mcmeta dataset client.
// Typed operations over the cached fetch layer, one per dataset.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheStorage, FsCacheStorage, paths};
use crate::config::Config;
use crate::error::{FetchError, Result};
use crate::fetch::{CachedFetch, FetchOptions, Fetcher, RefreshTracker, decode};
use crate::http::{HttpTransport, RawResponse, ReqwestTransport};
use crate::patches::{PatchContext, PatchReport, PatchRunner};
use crate::settings::{FileSettings, SettingsStore};
use crate::version::{ResolvedVersion, VersionRef, VersionResolver};

use super::types::{
    BlockStateData, DeprecatedTranslations, ItemComponents, LegacyComponent, Presets, Registries,
    Resources, Translations, VanillaMcdocSymbols, VersionMeta,
};
use super::urls::{McmetaKind, mcmeta, preset_kind, summary_dir};

/// First version with item components.
const ITEM_COMPONENTS_SINCE: &str = "1.20.5";
/// First version with item model definitions.
const ITEM_MODELS_SINCE: &str = "1.21.4";
/// First version publishing deprecated language keys.
const DEPRECATED_LANG_SINCE: &str = "1.21.2";

const IMMERSIVE_WEATHERING_PREFIX: &str = "immersive_weathering:";

/// Client for the mcmeta datasets.
///
/// Owns one refresh session: data requested with refresh is fetched from
/// the network at most once per URL for the lifetime of the client.
pub struct McmetaClient {
    config: Arc<Config>,
    cached: CachedFetch,
    settings: Arc<dyn SettingsStore>,
    resolver: VersionResolver,
    patches: PatchRunner,
    patched: tokio::sync::Mutex<bool>,
    session: RefreshTracker,
}

impl McmetaClient {
    /// Create a client over explicit transport and stores.
    pub fn new(
        config: Config,
        transport: Arc<dyn HttpTransport>,
        storage: Arc<dyn CacheStorage>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        let resolver = VersionResolver::new(
            settings.clone(),
            storage.clone(),
            config.cache_name.clone(),
            config.latest_version.clone(),
            &config.sources,
        );
        let cached = CachedFetch::new(storage, Fetcher::new(transport), config.cache_name.clone());

        Self {
            config: Arc::new(config),
            cached,
            settings,
            resolver,
            patches: PatchRunner::builtin(),
            patched: tokio::sync::Mutex::new(false),
            session: RefreshTracker::new(),
        }
    }

    /// Create a client using reqwest and the on-disk stores under the configured cache root.
    pub fn from_config(config: Config) -> Result<Self> {
        let root = config
            .cache_root()
            .ok_or_else(|| FetchError::Other("no cache directory available".to_string()))?;

        let transport = Arc::new(ReqwestTransport::new(&config.user_agent)?);
        let storage = Arc::new(FsCacheStorage::new(&root));
        let settings = Arc::new(FileSettings::new(paths::settings_path(&root)));

        debug!(root = %root.display(), "using cache root");
        Ok(Self::new(config, transport, storage, settings))
    }

    /// Replace the patch table.
    pub fn with_patches(mut self, patches: PatchRunner) -> Self {
        self.patches = patches;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &RefreshTracker {
        &self.session
    }

    /// Start a new refresh session.
    pub fn reset_session(&mut self) {
        self.session = RefreshTracker::new();
    }

    /// Run pending cache patches.
    pub async fn apply_patches(&self) -> Result<PatchReport> {
        let mut patched = self.patched.lock().await;
        let ctx = PatchContext {
            settings: self.settings.as_ref(),
            storage: self.cached.storage().as_ref(),
            config: &self.config,
        };
        let report = self.patches.run(&ctx).await?;
        *patched = true;
        Ok(report)
    }

    async fn validate_cache(&self, version: &VersionRef) -> Result<ResolvedVersion> {
        // Held across the run so concurrent callers never apply a patch twice
        let mut patched = self.patched.lock().await;
        if !*patched {
            let ctx = PatchContext {
                settings: self.settings.as_ref(),
                storage: self.cached.storage().as_ref(),
                config: &self.config,
            };
            if let Err(err) = self.patches.run(&ctx).await {
                warn!(error = %err, "failed to run cache patches");
            }
            *patched = true;
        }
        drop(patched);

        self.resolver.resolve(version).await
    }

    async fn validate_version(&self, version_id: &str) -> Result<ResolvedVersion> {
        let entry = self.config.version(version_id)?;
        self.validate_cache(&entry.version_ref()).await
    }

    async fn cached_json<T: DeserializeOwned>(&self, url: &str, options: FetchOptions) -> Result<T> {
        self.cached
            .fetch(&self.session, url, options, decode::json)
            .await
    }

    async fn fetch_uncached<T>(&self, url: &str, decode: fn(&RawResponse) -> Result<T>) -> Result<T> {
        let response = self.cached.fetcher().fetch(url, false).await?;
        decode(&response)
    }

    fn summary_url(&self, version: &ResolvedVersion) -> String {
        mcmeta(&self.config.sources, version, McmetaKind::Summary)
    }

    /// Registry entries of `version_id`, prefixed with `minecraft:`.
    pub async fn fetch_registries(&self, version_id: &str) -> Result<Registries> {
        debug!(version = version_id, "fetch registries");
        let version = self.validate_version(version_id).await?;
        let url = format!("{}/registries/data.min.json", self.summary_url(&version));

        let data: Registries = self
            .cached_json(&url, FetchOptions::default())
            .await
            .map_err(|e| e.context("Error occurred while fetching registries"))?;

        Ok(data
            .into_iter()
            .map(|(id, entries)| {
                let entries: Vec<String> = entries
                    .into_iter()
                    .map(|entry| format!("minecraft:{}", entry))
                    .collect();
                (id, entries)
            })
            .collect())
    }

    /// Block properties and defaults of `version_id`. Fetch failures yield an empty map.
    pub async fn fetch_block_states(&self, version_id: &str) -> Result<BTreeMap<String, BlockStateData>> {
        debug!(version = version_id, "fetch block states");
        let version = self.validate_version(version_id).await?;
        let url = format!("{}/blocks/data.min.json", self.summary_url(&version));

        match self.cached_json(&url, FetchOptions::default()).await {
            Ok(data) => Ok(data),
            Err(err) => {
                warn!(error = %err, "error occurred while fetching block states");
                Ok(BTreeMap::new())
            }
        }
    }

    /// Default item components of `version_id`. Empty before 1.20.5 or on fetch failure.
    pub async fn fetch_item_components(&self, version_id: &str) -> Result<ItemComponents> {
        debug!(version = version_id, "fetch item components");
        let mut result = ItemComponents::new();
        if !self.config.check_version(version_id, ITEM_COMPONENTS_SINCE) {
            return Ok(result);
        }

        let version = self.validate_version(version_id).await?;
        let url = format!("{}/item_components/data.min.json", self.summary_url(&version));

        let data: BTreeMap<String, Value> = match self.cached_json(&url, FetchOptions::default()).await {
            Ok(data) => data,
            Err(err) => {
                warn!(error = %err, "error occurred while fetching item components");
                return Ok(result);
            }
        };

        for (id, components) in data {
            let mut base = BTreeMap::new();
            match components {
                // Syntax before 1.21: [{ "type": ..., "value": ... }]
                Value::Array(entries) => {
                    for entry in entries {
                        match serde_json::from_value::<LegacyComponent>(entry) {
                            Ok(component) => {
                                base.insert(component.component_type, component.value);
                            }
                            Err(err) => debug!(item = %id, error = %err, "skipping malformed component"),
                        }
                    }
                }
                Value::Object(entries) => base.extend(entries),
                _ => debug!(item = %id, "skipping item without components"),
            }
            result.insert(format!("minecraft:{}", id), base);
        }

        Ok(result)
    }

    /// Raw JSON text of a single preset. Not cached.
    ///
    /// Presets served by the configured site origin take precedence.
    pub async fn fetch_preset(&self, version_id: &str, registry: &str, id: &str) -> Result<String> {
        debug!(version = version_id, registry, id, "fetch preset");
        let version = self.validate_version(version_id).await?;

        let fetch = async {
            if let Some(origin) = &self.config.site_origin {
                let local_url = format!("{}/presets/{}/{}.json", origin, registry, id);
                match self.cached.fetcher().fetch(&local_url, false).await {
                    Ok(response) if response.is_ok() => return decode::text(&response),
                    Ok(response) => debug!(url = %local_url, status = response.status, "no local preset"),
                    Err(err) => debug!(url = %local_url, error = %err, "no local preset"),
                }
            }

            let url = match id.strip_prefix(IMMERSIVE_WEATHERING_PREFIX) {
                Some(path) => format!("{}/{}.json", self.config.sources.immersive_weathering_url, path),
                None => {
                    let kind = preset_kind(registry);
                    format!(
                        "{}/{}/minecraft/{}/{}.json",
                        mcmeta(&self.config.sources, &version, kind),
                        kind.as_str(),
                        registry,
                        id
                    )
                }
            };
            self.fetch_uncached(&url, decode::text).await
        };

        fetch.await.map_err(|e| {
            e.context(format!(
                "Error occurred while fetching {} preset {}",
                registry, id
            ))
        })
    }

    /// Summary of every preset in `registry`.
    pub async fn fetch_all_presets(&self, version_id: &str, registry: &str) -> Result<Presets> {
        debug!(version = version_id, registry, "fetch all presets");
        let version = self.validate_version(version_id).await?;
        let url = format!(
            "{}/{}/{}/data.min.json",
            self.summary_url(&version),
            summary_dir(registry),
            registry
        );

        self.cached_json(&url, FetchOptions::default())
            .await
            .map_err(|e| e.context(format!("Error occurred while fetching all {} presets", registry)))
    }

    /// Preset ids listed by the site origin for `key` (`namespace:path` or a plain name).
    ///
    /// Accepts a bare array or an object with a `presets` or `ids` array.
    pub async fn fetch_local_preset_ids(&self, key: &str) -> Option<Vec<String>> {
        let origin = self.config.site_origin.as_deref()?;
        let url = match key.split_once(':') {
            Some((namespace, path)) => format!("{}/presets/{}/{}.json", origin, namespace, path),
            None => format!("{}/presets/{}.json", origin, key),
        };

        let value: Value = match self.fetch_uncached(&url, decode::json).await {
            Ok(value) => value,
            Err(err) => {
                debug!(url, error = %err, "no local preset ids");
                return None;
            }
        };

        let list = match &value {
            Value::Array(items) => items,
            Value::Object(map) => match (map.get("presets"), map.get("ids")) {
                (Some(Value::Array(items)), _) | (_, Some(Value::Array(items))) => items,
                _ => return None,
            },
            _ => return None,
        };

        Some(
            list.iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
        )
    }

    /// Metadata of every known game version. Refreshed once per session.
    pub async fn fetch_versions(&self) -> Result<Vec<VersionMeta>> {
        debug!("fetch versions");
        let version = self.validate_cache(&VersionRef::Dynamic).await?;
        let url = format!("{}/versions/data.min.json", self.summary_url(&version));

        self.cached_json(&url, FetchOptions::refresh())
            .await
            .map_err(|e| e.context("Error occurred while fetching versions"))
    }

    /// Block and item model resources of `version_id`, fetched concurrently.
    pub async fn fetch_resources(&self, version_id: &str) -> Result<Resources> {
        debug!(version = version_id, "fetch resources");
        let version = self.validate_version(version_id).await?;
        let needs_item_models = self.config.check_version(version_id, ITEM_COMPONENTS_SINCE);
        let has_item_models = self.config.check_version(version_id, ITEM_MODELS_SINCE);

        let atlas_url = mcmeta(&self.config.sources, &version, McmetaKind::Atlas);
        let uv_url = format!("{}/all/data.min.json", atlas_url);
        let png_url = format!("{}/all/atlas.png", atlas_url);

        // 1.20.5 - 1.21.3 borrow the 1.21.4 item models
        let item_version = if has_item_models { version_id } else { ITEM_MODELS_SINCE };
        let item_definitions = async {
            if needs_item_models {
                self.fetch_all_presets(item_version, "item_definition").await
            } else {
                Ok(Presets::new())
            }
        };

        let (block_definitions, models, uv_mapping, atlas, item_definitions) = tokio::try_join!(
            self.fetch_all_presets(version_id, "block_definition"),
            self.fetch_all_presets(version_id, "model"),
            self.fetch_uncached(&uv_url, decode::json::<Value>),
            self.fetch_uncached(&png_url, decode::bytes),
            item_definitions,
        )
        .map_err(|e| e.context("Error occurred while fetching resources"))?;

        Ok(Resources {
            block_definitions,
            models,
            uv_mapping,
            atlas,
            item_definitions,
        })
    }

    /// Translations of `version_id` in `lang`, with deprecated keys applied from 1.21.2.
    pub async fn fetch_language(&self, version_id: &str, lang: &str) -> Result<Translations> {
        debug!(version = version_id, lang, "fetch language");
        let version = self.validate_version(version_id).await?;
        let base = format!(
            "{}/assets/minecraft/lang",
            mcmeta(&self.config.sources, &version, McmetaKind::Assets)
        );

        let fetch = async {
            let mut translations: Translations = self
                .cached_json(&format!("{}/{}.json", base, lang), FetchOptions::default())
                .await?;
            if self.config.check_version(version_id, DEPRECATED_LANG_SINCE) {
                let deprecated: DeprecatedTranslations = self
                    .cached_json(&format!("{}/deprecated.json", base), FetchOptions::default())
                    .await?;
                deprecated.apply(&mut translations);
            }
            Ok::<_, FetchError>(translations)
        };

        fetch
            .await
            .map_err(|e| e.context("Error occurred while fetching language"))
    }

    /// Generated vanilla mcdoc symbols. Refreshed once per session.
    pub async fn fetch_vanilla_mcdoc(&self) -> Result<VanillaMcdocSymbols> {
        let url = format!("{}/generated/symbols.json", self.config.sources.vanilla_mcdoc_url);
        self.cached_json(&url, FetchOptions::refresh())
            .await
            .map_err(|e| e.context("Error occurred while fetching vanilla-mcdoc"))
    }

    /// mcdoc source of a dependency served by the site origin. Refreshed once per session.
    pub async fn fetch_dependency_mcdoc(&self, dependency: &str) -> Result<String> {
        let context = format!("Error occurred while fetching {} mcdoc", dependency);
        let origin = self
            .config
            .site_origin
            .as_deref()
            .ok_or_else(|| FetchError::MissingOrigin(format!("{} mcdoc", dependency)).context(context.clone()))?;

        let url = format!("{}/mcdoc/{}.mcdoc", origin, dependency);
        self.cached
            .fetch(&self.session, &url, FetchOptions::refresh(), decode::text)
            .await
            .map_err(|e| e.context(context))
    }

    /// Fingerprint of the data currently loaded for `version_id`.
    pub async fn version_checksum(&self, version_id: &str) -> Result<String> {
        let entry = self.config.version(version_id)?;
        self.resolver.checksum(entry).await
    }
}
