// Versioned, cached fetch layer for the mcmeta game-metadata mirrors.
// Persistent response cache, mirror fallback, one-time patches, and latest-version invalidation.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod mcmeta;
pub mod patches;
pub mod settings;
pub mod version;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{FetchError, Result};
pub use mcmeta::McmetaClient;
