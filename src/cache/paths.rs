// Cache path utilities.
// Constructs filesystem paths for named caches, their entries, and the settings file.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use sha2::{Digest, Sha256};

/// Get the default cache root (~/.cache/mcmeta-cache on Linux).
pub fn default_cache_root() -> Option<PathBuf> {
    ProjectDirs::from("", "", "mcmeta-cache").map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Get the default config file path.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "mcmeta-cache").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Path to the persisted settings file.
pub fn settings_path(root: &Path) -> PathBuf {
    root.join("settings.json")
}

/// Directory holding all named caches.
pub fn caches_dir(root: &Path) -> PathBuf {
    root.join("caches")
}

/// Directory of one named cache.
pub fn cache_dir(root: &Path, name: &str) -> PathBuf {
    caches_dir(root).join(sanitize_name(name))
}

/// File stem for the entry keyed by `url`.
pub fn entry_stem(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// Extension of entry files.
pub const ENTRY_EXTENSION: &str = "entry";

/// Path to the file holding the entry keyed by `url`.
pub fn entry_path(dir: &Path, url: &str) -> PathBuf {
    dir.join(format!("{}.{}", entry_stem(url), ENTRY_EXTENSION))
}

/// Sanitize a name for use in filesystem paths.
/// Replaces problematic characters with underscores.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}
