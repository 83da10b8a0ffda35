//! Writes local versions into `launcher_profiles.json`, the file
//! Forge/Fabric installers read to discover installable versions.

use std::collections::BTreeMap;

use mcl_core::{info, GameRoot, IntoIoError, IntoJsonError, JsonFileError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::list_versions::scan_local_versions;

const PROFILE_ICON_DEFAULT: &str = "Grass";
const PROFILES_FORMAT_VERSION: u32 = 3;

#[allow(non_snake_case)]
#[derive(Serialize, Deserialize, Default)]
pub struct LauncherProfiles {
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clientToken: Option<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

#[allow(non_snake_case)]
#[derive(Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub r#type: String,
    pub lastVersionId: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastUsed: Option<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// Merges every local version into `launcher_profiles.json`,
/// preserving existing profiles and unknown fields. A version already
/// referenced by some profile's `lastVersionId` is not added twice.
///
/// # Errors
/// - unreadable/unwritable profiles file
/// - existing file is not valid JSON
pub async fn write_profiles(root: &GameRoot) -> Result<(), JsonFileError> {
    let path = root.launcher_profiles_path();

    let mut launcher_profiles = if path.is_file() {
        let json = tokio::fs::read_to_string(&path).await.path(&path)?;
        serde_json::from_str::<LauncherProfiles>(&json).json(json)?
    } else {
        LauncherProfiles::default()
    };

    let local_versions = scan_local_versions(root).await?;
    for version in local_versions {
        let already_known = launcher_profiles
            .profiles
            .values()
            .any(|profile| profile.lastVersionId == version.id);
        if already_known {
            continue;
        }

        launcher_profiles.profiles.insert(
            version.id.clone(),
            Profile {
                name: version.id.clone(),
                r#type: "custom".to_owned(),
                lastVersionId: version.id,
                icon: Some(PROFILE_ICON_DEFAULT.to_owned()),
                created: version.release_time.clone(),
                lastUsed: version.release_time,
                other: BTreeMap::new(),
            },
        );
    }

    if launcher_profiles.version.is_none() {
        launcher_profiles.version = Some(PROFILES_FORMAT_VERSION);
    }

    info!("Writing launcher profiles into {path:?}");
    let json = serde_json::to_string_pretty(&launcher_profiles).json_to()?;
    tokio::fs::write(&path, json).await.path(&path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_version(root: &GameRoot, id: &str) {
        let path = root.version_json_path(id);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            path,
            format!(r#"{{"id": "{id}", "type": "release", "releaseTime": "2022-02-28T10:42:45+00:00"}}"#),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn local_versions_become_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let root = GameRoot::new(dir.path());
        write_version(&root, "1.18.2");

        write_profiles(&root).await.unwrap();

        let json = std::fs::read_to_string(root.launcher_profiles_path()).unwrap();
        let profiles: LauncherProfiles = serde_json::from_str(&json).unwrap();
        let profile = profiles.profiles.get("1.18.2").unwrap();
        assert_eq!(profile.lastVersionId, "1.18.2");
        assert_eq!(profile.r#type, "custom");
        assert_eq!(profiles.version, Some(3));
    }

    #[tokio::test]
    async fn existing_profiles_survive_rewrites() {
        let dir = tempfile::tempdir().unwrap();
        let root = GameRoot::new(dir.path());
        write_version(&root, "1.18.2");

        std::fs::write(
            root.launcher_profiles_path(),
            r#"{
                "profiles": {
                    "custom-forge": {
                        "name": "forge",
                        "type": "custom",
                        "lastVersionId": "1.18.2-forge-40.2.4",
                        "javaArgs": "-Xmx4G"
                    }
                },
                "clientToken": "abc"
            }"#,
        )
        .unwrap();

        write_profiles(&root).await.unwrap();

        let json = std::fs::read_to_string(root.launcher_profiles_path()).unwrap();
        let profiles: LauncherProfiles = serde_json::from_str(&json).unwrap();
        assert_eq!(profiles.profiles.len(), 2);
        let forge = profiles.profiles.get("custom-forge").unwrap();
        assert_eq!(forge.lastVersionId, "1.18.2-forge-40.2.4");
        // Unknown fields round-trip.
        assert_eq!(
            forge.other.get("javaArgs").and_then(Value::as_str),
            Some("-Xmx4G")
        );
        assert_eq!(profiles.clientToken.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn versions_referenced_by_profiles_are_not_duplicated() {
        let dir = tempfile::tempdir().unwrap();
        let root = GameRoot::new(dir.path());
        write_version(&root, "1.18.2");

        write_profiles(&root).await.unwrap();
        write_profiles(&root).await.unwrap();

        let json = std::fs::read_to_string(root.launcher_profiles_path()).unwrap();
        let profiles: LauncherProfiles = serde_json::from_str(&json).unwrap();
        assert_eq!(profiles.profiles.len(), 1);
    }
}
