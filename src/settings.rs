// Settings store.
// Small persisted key/value records: the latest-version stamp and applied patches.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::fs;
use tracing::warn;

use crate::cache::store::write_atomic;
use crate::error::Result;

/// Last "latest version" the cache was validated against.
pub const LATEST_VERSION_KEY: &str = "cached_latest_version";
/// Number of patches applied, in table order.
pub const PATCH_COUNTER_KEY: &str = "misode_cache_patch";
/// JSON array of applied patch ids.
pub const APPLIED_PATCHES_KEY: &str = "applied_cache_patches";

/// Persisted string key/value store.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Settings persisted as a JSON object in a single file.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    // Serializes read-modify-write cycles
    lock: tokio::sync::Mutex<()>,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // A damaged file reads as empty; the next write replaces it
    async fn load(&self) -> Result<BTreeMap<String, String>> {
        match fs::read(&self.path).await {
            Ok(contents) => match serde_json::from_slice(&contents) {
                Ok(values) => Ok(values),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "ignoring unreadable settings file");
                    Ok(BTreeMap::new())
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let json = serde_json::to_vec_pretty(values)?;
        write_atomic(&self.path, &json).await
    }
}

#[async_trait]
impl SettingsStore for FileSettings {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut values = self.load().await?;
        values.insert(key.to_string(), value.to_string());
        self.save(&values).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut values = self.load().await?;
        if values.remove(key).is_some() {
            self.save(&values).await?;
        }
        Ok(())
    }
}

/// Settings kept in memory only.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings pre-populated with the given pairs.
    pub fn with_values<'a>(values: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let values = values
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            values: Mutex::new(values),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}
