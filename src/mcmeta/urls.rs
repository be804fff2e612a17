// mcmeta URL construction.
// `{mirror}/{type}` branches for the dynamic version, `{mirror}/{ref}-{type}` for pinned ones.

use crate::config::SourceConfig;
use crate::version::ResolvedVersion;

/// Dataset branch types published by mcmeta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McmetaKind {
    Summary,
    Data,
    DataJson,
    Assets,
    AssetsJson,
    Registries,
    Atlas,
}

impl McmetaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            McmetaKind::Summary => "summary",
            McmetaKind::Data => "data",
            McmetaKind::DataJson => "data-json",
            McmetaKind::Assets => "assets",
            McmetaKind::AssetsJson => "assets-json",
            McmetaKind::Registries => "registries",
            McmetaKind::Atlas => "atlas",
        }
    }
}

/// Registries whose single presets live in the assets branch.
const ASSET_PRESET_REGISTRIES: &[&str] = &[
    "atlases",
    "blockstates",
    "items",
    "font",
    "lang",
    "models",
    "equipment",
    "post_effect",
];

/// Registries whose summaries live under `assets/` in the summary branch.
const ASSET_SUMMARY_REGISTRIES: &[&str] = &[
    "atlas",
    "block_definition",
    "item_definition",
    "model",
    "font",
    "lang",
    "equipment",
    "post_effect",
];

/// Base URL of a dataset branch for `version`.
pub fn mcmeta(sources: &SourceConfig, version: &ResolvedVersion, kind: McmetaKind) -> String {
    branch_url(&sources.mcmeta_url, version, kind)
}

/// Tarball URL of a dataset branch for `version`.
pub fn mcmeta_tarball(sources: &SourceConfig, version: &ResolvedVersion, kind: McmetaKind) -> String {
    branch_url(&sources.mcmeta_tarball_url, version, kind)
}

fn branch_url(base: &str, version: &ResolvedVersion, kind: McmetaKind) -> String {
    if version.dynamic {
        format!("{}/{}", base, kind.as_str())
    } else {
        format!("{}/{}-{}", base, version.reference, kind.as_str())
    }
}

/// Branch holding single presets of `registry`.
pub fn preset_kind(registry: &str) -> McmetaKind {
    if ASSET_PRESET_REGISTRIES.contains(&registry) {
        McmetaKind::Assets
    } else {
        McmetaKind::Data
    }
}

/// Directory in the summary branch holding the summary of `registry`.
pub fn summary_dir(registry: &str) -> &'static str {
    if ASSET_SUMMARY_REGISTRIES.contains(&registry) {
        "assets"
    } else {
        "data"
    }
}
