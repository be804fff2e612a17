// Configuration.
// TOML config file with environment overrides; every field has a default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::cache::paths;
use crate::error::{FetchError, Result};
use crate::version::VersionEntry;

/// Upstream mirror locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Raw-content base of the mcmeta repository.
    pub mcmeta_url: String,
    /// Tarball base of the mcmeta repository.
    pub mcmeta_tarball_url: String,
    /// Raw-content base of the vanilla-mcdoc repository.
    pub vanilla_mcdoc_url: String,
    /// Base of the Immersive Weathering block growth presets.
    pub immersive_weathering_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mcmeta_url: "https://raw.githubusercontent.com/misode/mcmeta".to_string(),
            mcmeta_tarball_url: "https://github.com/misode/mcmeta/tarball".to_string(),
            vanilla_mcdoc_url: "https://raw.githubusercontent.com/SpyglassMC/vanilla-mcdoc"
                .to_string(),
            immersive_weathering_url: "https://raw.githubusercontent.com/AstralOrdana/Immersive-Weathering/main/src/main/resources/data/immersive_weathering/block_growths".to_string(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache root; the platform cache directory when unset.
    pub cache_dir: Option<PathBuf>,
    /// Name of the response cache.
    pub cache_name: String,
    /// Identifier the dynamic version currently resolves to.
    pub latest_version: String,
    /// User agent for outbound requests.
    pub user_agent: String,
    /// Origin of the site serving local presets and mcdoc files.
    pub site_origin: Option<String>,
    pub sources: SourceConfig,
    /// Known versions, oldest first.
    pub versions: Vec<VersionEntry>,
}

impl Default for Config {
    fn default() -> Self {
        let pinned = ["1.20.4", "1.20.5", "1.21", "1.21.2", "1.21.4"]
            .into_iter()
            .map(VersionEntry::pinned);

        Self {
            cache_dir: None,
            cache_name: "misode-v2".to_string(),
            latest_version: "1.21.5".to_string(),
            user_agent: crate::http::DEFAULT_USER_AGENT.to_string(),
            site_origin: None,
            sources: SourceConfig::default(),
            versions: pinned
                .chain(std::iter::once(VersionEntry::dynamic("1.21.5")))
                .collect(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, using defaults when the file does not exist.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).await?;
        Self::parse(&content, path)
    }

    /// Load from `path` or the default location, then apply environment overrides.
    pub async fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load(path).await?,
            None => match paths::default_config_path() {
                Some(path) => Self::load(&path).await?,
                None => Self::default(),
            },
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| FetchError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.cache_name.is_empty() {
            return Err(FetchError::Config {
                path: path.to_path_buf(),
                reason: "cache_name must not be empty".to_string(),
            });
        }
        let mut seen = std::collections::HashSet::new();
        for version in &self.versions {
            if !seen.insert(version.id.as_str()) {
                return Err(FetchError::Config {
                    path: path.to_path_buf(),
                    reason: format!("duplicate version id {}", version.id),
                });
            }
        }
        Ok(())
    }

    /// Apply `MCMETA_*` overrides read through `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(latest) = lookup("MCMETA_LATEST_VERSION") {
            self.latest_version = latest;
        }
        if let Some(dir) = lookup("MCMETA_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(origin) = lookup("MCMETA_SITE_ORIGIN") {
            self.site_origin = Some(origin);
        }
        self
    }

    /// Resolved cache root directory.
    pub fn cache_root(&self) -> Option<PathBuf> {
        self.cache_dir.clone().or_else(paths::default_cache_root)
    }

    /// Look up a configured version.
    pub fn version(&self, id: &str) -> Result<&VersionEntry> {
        self.versions
            .iter()
            .find(|v| v.id == id)
            .ok_or_else(|| FetchError::UnknownVersion(id.to_string()))
    }

    /// Whether `id` is the same as or newer than `min` in configuration order.
    ///
    /// Unknown ids never satisfy the check.
    pub fn check_version(&self, id: &str, min: &str) -> bool {
        let position = |id: &str| self.versions.iter().position(|v| v.id == id);
        match (position(id), position(min)) {
            (Some(a), Some(b)) => a >= b,
            _ => false,
        }
    }
}
