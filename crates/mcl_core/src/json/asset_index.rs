use std::collections::BTreeMap;

use serde::Deserialize;

/// An asset index: logical resource paths mapped to
/// content-addressed objects.
#[derive(Deserialize, Debug, Clone)]
pub struct AssetIndexFile {
    #[serde(default)]
    pub objects: BTreeMap<String, AssetObject>,
    /// Logical paths are additionally materialized under
    /// `assets/virtual/<index-id>/`.
    #[serde(rename = "virtual", default)]
    pub is_virtual: bool,
    /// Logical paths are additionally materialized under
    /// `<game-root>/resources/` (oldest versions).
    #[serde(default)]
    pub map_to_resources: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}
