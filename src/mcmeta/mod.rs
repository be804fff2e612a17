// mcmeta dataset module.
// URL layout, payload types, and the typed dataset client.

pub mod client;
pub mod types;
pub mod urls;

pub use client::McmetaClient;
pub use types::*;
pub use urls::{McmetaKind, mcmeta, mcmeta_tarball};
