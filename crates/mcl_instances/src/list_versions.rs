//! Merges locally installed versions with the official manifest.

use mcl_core::{err, json::Manifest, GameRoot, IntoIoError, IoError};

use crate::version_graph::VersionError;

/// One entry of the merged version list.
#[derive(Debug, Clone)]
pub struct ListedVersion {
    pub id: String,
    pub version_type: String,
    pub release_time: Option<String>,
    /// True when `versions/<id>/<id>.json` exists and parses.
    pub local: bool,
}

/// Scans `versions/*/` for installed versions. A directory counts
/// only when it contains a matching `<id>.json` whose `id` field
/// agrees with the directory name.
///
/// # Errors
/// Only on an unreadable versions directory; broken entries are
/// skipped.
pub async fn scan_local_versions(root: &GameRoot) -> Result<Vec<ListedVersion>, IoError> {
    let versions_dir = root.versions_dir();
    if !versions_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    let mut entries = tokio::fs::read_dir(&versions_dir)
        .await
        .dir(&versions_dir)?;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let Some(id) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        let json_path = root.version_json_path(&id);
        let Ok(json) = tokio::fs::read_to_string(&json_path).await else {
            continue;
        };
        let Ok(details) =
            serde_json::from_str::<mcl_core::json::VersionDetails>(&json)
        else {
            err!("Skipping local version {id}: broken descriptor");
            continue;
        };
        if details.id != id {
            err!("Skipping local version {id}: descriptor id mismatch");
            continue;
        }
        found.push(ListedVersion {
            id,
            version_type: details.r#type.unwrap_or_else(|| "custom".to_owned()),
            release_time: details.releaseTime,
            local: true,
        });
    }
    Ok(found)
}

/// The merged list: local versions first (shadowing official entries
/// with the same id), then everything the official manifest knows,
/// sorted newest first. Official manifest failures degrade to the
/// local list only.
///
/// # Errors
/// Only local filesystem errors; the network is best-effort here.
pub async fn list_versions(root: &GameRoot) -> Result<Vec<ListedVersion>, VersionError> {
    let mut versions = scan_local_versions(root).await?;

    match Manifest::download().await {
        Ok(manifest) => {
            for entry in &manifest.versions {
                if versions.iter().any(|v| v.id == entry.id) {
                    continue;
                }
                versions.push(ListedVersion {
                    id: entry.id.clone(),
                    version_type: entry.r#type.clone(),
                    release_time: Some(entry.releaseTime.clone()),
                    local: false,
                });
            }
        }
        Err(error) => {
            err!("Unable to fetch the official version list: {error}");
        }
    }

    versions.sort_by(|a, b| release_key(b).cmp(&release_key(a)));
    Ok(versions)
}

fn release_key(version: &ListedVersion) -> i64 {
    version
        .release_time
        .as_deref()
        .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.timestamp())
        .unwrap_or(i64::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scan_skips_broken_and_mismatched_entries() {
        let dir = tempfile::tempdir().unwrap();
        let root = GameRoot::new(dir.path());

        let write = |id: &str, json: &str| {
            let path = root.version_json_path(id);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, json).unwrap();
        };
        write(
            "1.21",
            r#"{"id": "1.21", "type": "release", "releaseTime": "2024-06-13T08:24:03+00:00"}"#,
        );
        write("broken", "{ nope");
        write("renamed", r#"{"id": "other", "type": "release"}"#);
        // A directory without a descriptor at all.
        std::fs::create_dir_all(dir.path().join("versions/empty")).unwrap();

        let found = scan_local_versions(&root).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "1.21");
        assert!(found[0].local);
    }

    #[tokio::test]
    async fn missing_versions_dir_is_empty_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = GameRoot::new(dir.path());
        assert!(scan_local_versions(&root).await.unwrap().is_empty());
    }
}
