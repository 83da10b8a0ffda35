use std::collections::BTreeMap;

use serde::Deserialize;

use crate::{file_utils, JsonDownloadError};

pub const JAVA_LIST_URL: &str = "https://launchermeta.mojang.com/v1/products/java-runtime/2ec0cc96c44e5a76b9c8b7c39df7210883d12871/all.json";

/// The `java-runtime` product index: per-platform lists of runtime
/// components and the URLs of their file manifests.
///
/// Platform keys are e.g. `linux`, `linux-i386`, `mac-os`,
/// `mac-os-arm64`, `windows-x64`, `windows-x86`, `windows-arm64`;
/// component keys are e.g. `jre-legacy`, `java-runtime-gamma`.
#[derive(Deserialize, Debug)]
pub struct JavaListJson(pub BTreeMap<String, BTreeMap<String, Vec<JavaRuntimeListing>>>);

impl JavaListJson {
    /// Downloads the runtime product index.
    ///
    /// # Errors
    /// Returns an error if the index cannot be downloaded or parsed.
    pub async fn download() -> Result<Self, JsonDownloadError> {
        file_utils::download_file_to_json(JAVA_LIST_URL).await
    }

    /// URL of the file manifest for `component` on this host,
    /// or `None` when the platform/component combination has no build.
    #[must_use]
    pub fn manifest_url(&self, component: &str) -> Option<String> {
        let platform = self.0.get(host_platform_key()?)?;
        let listing = platform.get(component)?.first()?;
        Some(listing.manifest.url.clone())
    }
}

/// Platform key of the current host in the product index,
/// `None` on platforms Mojang ships no runtime for.
#[must_use]
pub fn host_platform_key() -> Option<&'static str> {
    if cfg!(target_os = "linux") {
        if cfg!(target_arch = "x86_64") {
            Some("linux")
        } else if cfg!(target_arch = "x86") {
            Some("linux-i386")
        } else {
            None
        }
    } else if cfg!(target_os = "macos") {
        if cfg!(target_arch = "aarch64") {
            Some("mac-os-arm64")
        } else if cfg!(target_arch = "x86_64") {
            Some("mac-os")
        } else {
            None
        }
    } else if cfg!(target_os = "windows") {
        if cfg!(target_arch = "x86_64") {
            Some("windows-x64")
        } else if cfg!(target_arch = "x86") {
            Some("windows-x86")
        } else if cfg!(target_arch = "aarch64") {
            Some("windows-arm64")
        } else {
            None
        }
    } else {
        None
    }
}

/// Runtime component name for a required Java major version.
#[must_use]
pub fn component_for_major(major: u32) -> &'static str {
    match major {
        0..=8 => "jre-legacy",
        9..=16 => "java-runtime-alpha",
        17..=20 => "java-runtime-gamma",
        _ => "java-runtime-delta",
    }
}

#[derive(Deserialize, Debug)]
pub struct JavaRuntimeListing {
    pub manifest: JavaRuntimeManifestRef,
    pub version: Option<JavaRuntimeVersion>,
}

#[derive(Deserialize, Debug)]
pub struct JavaRuntimeManifestRef {
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

#[derive(Deserialize, Debug)]
pub struct JavaRuntimeVersion {
    pub name: String,
    pub released: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_selection() {
        assert_eq!(component_for_major(8), "jre-legacy");
        assert_eq!(component_for_major(16), "java-runtime-alpha");
        assert_eq!(component_for_major(17), "java-runtime-gamma");
        assert_eq!(component_for_major(21), "java-runtime-delta");
    }

    #[test]
    fn parses_product_index_shape() {
        let json = r#"{
            "linux": {
                "jre-legacy": [
                    {
                        "manifest": {
                            "sha1": "0000000000000000000000000000000000000000",
                            "size": 10,
                            "url": "https://example.com/manifest.json"
                        },
                        "version": {"name": "8u202", "released": "2021-01-01T00:00:00+00:00"}
                    }
                ],
                "java-runtime-gamma": []
            },
            "gamecore": {}
        }"#;
        let list: JavaListJson = serde_json::from_str(json).unwrap();
        let linux = list.0.get("linux").unwrap();
        assert_eq!(linux.get("jre-legacy").unwrap().len(), 1);
        assert!(linux.get("java-runtime-gamma").unwrap().is_empty());
    }
}
