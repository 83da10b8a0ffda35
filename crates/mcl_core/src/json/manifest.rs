use serde::Deserialize;

use crate::{file_utils, JsonDownloadError};

/// All versions and links to their descriptors.
pub const MANIFEST_URL: &str = "https://launchermeta.mojang.com/mc/game/version_manifest_v2.json";

/// The official version manifest
/// (list of all versions and their download links).
#[derive(Deserialize, Clone, Debug)]
pub struct Manifest {
    pub latest: Option<Latest>,
    pub versions: Vec<ManifestVersion>,
}

impl Manifest {
    /// Downloads the official manifest.
    ///
    /// # Errors
    /// Returns an error if the manifest cannot be downloaded or parsed.
    pub async fn download() -> Result<Manifest, JsonDownloadError> {
        file_utils::download_file_to_json(MANIFEST_URL).await
    }

    /// Looks up a version by its name.
    /// This searches for an *exact match*.
    #[must_use]
    pub fn find_name(&self, name: &str) -> Option<&ManifestVersion> {
        self.versions.iter().find(|n| n.id == name)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct Latest {
    pub release: String,
    pub snapshot: String,
}

#[allow(non_snake_case)]
#[derive(Deserialize, Clone, Debug)]
pub struct ManifestVersion {
    pub id: String,
    pub r#type: String,
    pub url: String,
    pub time: Option<String>,
    pub releaseTime: String,
    /// SHA-1 of the version descriptor (v2 manifest only).
    pub sha1: Option<String>,
}
