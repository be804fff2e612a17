// mcmeta dataset types.
// Shapes of the decoded summary, language, and mcdoc payloads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Registry id to its entries, each prefixed with `minecraft:`.
pub type Registries = BTreeMap<String, Vec<String>>;

/// Block properties with their allowed values, and the default property values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStateData(pub BTreeMap<String, Vec<String>>, pub BTreeMap<String, String>);

/// Item id to its default components.
pub type ItemComponents = BTreeMap<String, BTreeMap<String, Value>>;

/// Translation key to text.
pub type Translations = BTreeMap<String, String>;

/// Summary entries of one registry, keyed by id.
pub type Presets = BTreeMap<String, Value>;

/// Metadata of one game version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionMeta {
    pub id: String,
    pub name: String,
    pub release_target: String,
    #[serde(rename = "type")]
    pub version_type: VersionType,
    pub stable: bool,
    pub data_version: u32,
    pub protocol_version: u32,
    pub data_pack_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_pack_version_minor: Option<u32>,
    pub resource_pack_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_pack_version_minor: Option<u32>,
    pub build_time: String,
    pub release_time: String,
    pub sha1: String,
}

/// Version channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionType {
    Release,
    Snapshot,
    #[serde(other)]
    Unknown,
}

/// Language keys removed or renamed in a version.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeprecatedTranslations {
    #[serde(default)]
    pub removed: Vec<String>,
    #[serde(default)]
    pub renamed: BTreeMap<String, String>,
}

impl DeprecatedTranslations {
    /// Drop removed keys and move renamed ones to their new key.
    pub fn apply(&self, translations: &mut Translations) {
        for key in &self.removed {
            translations.remove(key);
        }
        for (old_key, new_key) in &self.renamed {
            if let Some(value) = translations.remove(old_key) {
                translations.insert(new_key.clone(), value);
            }
        }
    }
}

/// Generated vanilla mcdoc symbol table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VanillaMcdocSymbols {
    #[serde(rename = "ref")]
    pub reference: String,
    pub mcdoc: BTreeMap<String, Value>,
    #[serde(rename = "mcdoc/dispatcher")]
    pub dispatcher: BTreeMap<String, BTreeMap<String, Value>>,
}

/// Everything needed to render block and item models.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resources {
    pub block_definitions: Presets,
    pub models: Presets,
    /// Texture id to its `[x, y, width, height]` in the atlas.
    pub uv_mapping: Value,
    /// PNG bytes of the texture atlas.
    #[serde(skip)]
    pub atlas: Vec<u8>,
    pub item_definitions: Presets,
}

/// One legacy (pre-1.21) item component entry.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LegacyComponent {
    #[serde(rename = "type")]
    pub component_type: String,
    pub value: Value,
}
