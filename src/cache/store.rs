// Filesystem cache store.
// Each entry is one file holding a JSON metadata line and the raw body, written atomically.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;
use uuid::Uuid;

use crate::error::{FetchError, Result};
use crate::http::RawResponse;

use super::paths;
use super::traits::{CacheStorage, ResponseCache};

/// Metadata line stored ahead of each cached body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMeta {
    /// Request URL the entry is keyed by.
    pub url: String,
    /// HTTP status of the stored response.
    pub status: u16,
    /// When the entry was written.
    pub cached_at: DateTime<Utc>,
}

/// Cache storage rooted at a directory, one subdirectory per named cache.
#[derive(Debug, Clone)]
pub struct FsCacheStorage {
    root: PathBuf,
}

impl FsCacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl CacheStorage for FsCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn ResponseCache>> {
        let dir = paths::cache_dir(&self.root, name);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| FetchError::StorageUnavailable(format!("{}: {}", dir.display(), e)))?;
        Ok(Arc::new(FsCache { dir }))
    }

    async fn delete_cache(&self, name: &str) -> Result<bool> {
        let dir = paths::cache_dir(&self.root, name);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(cache = name, "deleted cache");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// One named cache directory.
///
/// Each entry is a single file: one line of compact JSON metadata, then the raw
/// body. Replacing the whole file with one rename keeps metadata and body in step.
#[derive(Debug)]
pub struct FsCache {
    dir: PathBuf,
}

impl FsCache {
    async fn read_entry(path: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // Reads only the metadata line, so listing never loads bodies
    async fn read_meta(path: &Path) -> Result<Option<EntryMeta>> {
        let file = match fs::File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut line = Vec::new();
        BufReader::new(file).read_until(b'\n', &mut line).await?;
        if line.pop() != Some(b'\n') {
            return Ok(None);
        }
        Ok(serde_json::from_slice(&line).ok())
    }
}

fn encode_entry(meta: &EntryMeta, body: &[u8]) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec(meta)?;
    bytes.push(b'\n');
    bytes.extend_from_slice(body);
    Ok(bytes)
}

fn decode_entry(bytes: &[u8]) -> Option<(EntryMeta, &[u8])> {
    let split = bytes.iter().position(|&b| b == b'\n')?;
    let meta = serde_json::from_slice(&bytes[..split]).ok()?;
    Some((meta, &bytes[split + 1..]))
}

#[async_trait]
impl ResponseCache for FsCache {
    async fn get(&self, url: &str) -> Result<Option<RawResponse>> {
        let path = paths::entry_path(&self.dir, url);
        let Some(contents) = Self::read_entry(&path).await? else {
            return Ok(None);
        };

        match decode_entry(&contents) {
            Some((meta, body)) if meta.url == url => {
                Ok(Some(RawResponse::new(url, meta.status, body.to_vec())))
            }
            Some(_) => Ok(None),
            None => {
                debug!(path = %path.display(), "ignoring damaged cache entry");
                Ok(None)
            }
        }
    }

    async fn put(&self, url: &str, response: &RawResponse) -> Result<()> {
        let meta = EntryMeta {
            url: url.to_string(),
            status: response.status,
            cached_at: Utc::now(),
        };
        let bytes = encode_entry(&meta, &response.body)?;
        write_atomic(&paths::entry_path(&self.dir, url), &bytes).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(paths::ENTRY_EXTENSION) {
                continue;
            }
            // Skip unreadable metadata rather than failing the whole listing
            if let Ok(Some(meta)) = Self::read_meta(&path).await {
                keys.push(meta.url);
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, url: &str) -> Result<bool> {
        remove_if_exists(&paths::entry_path(&self.dir, url)).await
    }
}

/// Write bytes atomically via a uniquely named temp file and rename.
///
/// Concurrent writers of one path never share a temp file; the last rename wins.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let temp_name = format!(".tmp.{}", Uuid::new_v4());
    let temp_path = path.with_file_name(
        path.file_name()
            .map(|n| format!("{}{}", n.to_string_lossy(), temp_name))
            .unwrap_or_else(|| temp_name.clone()),
    );
    {
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
    }
    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e.into());
    }

    Ok(())
}

async fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
