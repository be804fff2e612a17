// Error types for the mcmeta cache layer.
// Separates storage, network, decode, and patch failures so callers can degrade per kind.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Network request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("Backup \"{mirror}\" for \"{url}\" failed: {reason}")]
    MirrorFailed {
        url: String,
        mirror: String,
        reason: String,
    },

    #[error("Cache storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration at {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("Unknown version: {0}")]
    UnknownVersion(String),

    #[error("No site origin configured for {0}")]
    MissingOrigin(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<FetchError>,
    },

    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// Wrap this error with a description of the operation that failed.
    pub fn context(self, context: impl Into<String>) -> Self {
        FetchError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether the request never produced a response (eligible for a mirror retry).
    pub fn is_network(&self) -> bool {
        match self {
            FetchError::Http(_) | FetchError::Network { .. } => true,
            FetchError::Context { source, .. } => source.is_network(),
            _ => false,
        }
    }

    /// Innermost error, skipping context wrappers.
    pub fn root(&self) -> &FetchError {
        match self {
            FetchError::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
