use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rules::Rule;

/// A per-version descriptor (`versions/<id>/<id>.json`).
///
/// Modded descriptors (Forge, Fabric, ...) leave most fields to the
/// vanilla version named by `inheritsFrom`, so nearly everything here
/// is optional.
#[allow(non_snake_case)]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VersionDetails {
    /// Name of the version.
    pub id: String,
    /// Base version this descriptor merges over (used by mod loaders).
    pub inheritsFrom: Option<String>,
    /// Type of version, such as release or snapshot.
    pub r#type: Option<String>,
    /// Which is the main class in the jar that has the main function.
    pub mainClass: Option<String>,
    /// Name of the asset index.
    pub assets: Option<String>,
    /// Where to download the index of assets (music/sounds) from.
    pub assetIndex: Option<AssetIndexRef>,
    /// Where to download the client/server jar.
    pub downloads: Option<Downloads>,
    /// Library dependencies of the version that need to be downloaded.
    pub libraries: Option<Vec<Library>>,
    /// The list of command line arguments.
    ///
    /// Used in new Minecraft versions, compared to
    /// `minecraftArguments` used in old versions.
    pub arguments: Option<Arguments>,
    /// The list of command line arguments (old format).
    pub minecraftArguments: Option<String>,
    /// Version of Java required.
    pub javaVersion: Option<JavaVersionRef>,
    /// Details regarding console logging with log4j.
    pub logging: Option<Logging>,
    pub releaseTime: Option<String>,
    pub time: Option<String>,
    pub minimumLauncherVersion: Option<u32>,
    pub complianceLevel: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<ArgumentEntry>,
    #[serde(default)]
    pub jvm: Vec<ArgumentEntry>,
}

/// One entry of `arguments.jvm` / `arguments.game`: either a literal
/// token or a rule-gated value.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum ArgumentEntry {
    Plain(String),
    Conditional {
        rules: Vec<Rule>,
        #[serde(alias = "values")]
        value: ArgumentValue,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum ArgumentValue {
    Single(String),
    List(Vec<String>),
}

#[allow(non_snake_case)]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AssetIndexRef {
    pub id: String,
    pub sha1: String,
    pub size: u64,
    pub totalSize: Option<u64>,
    pub url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Downloads {
    pub client: Option<DownloadEntry>,
    pub server: Option<DownloadEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DownloadEntry {
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

#[allow(non_snake_case)]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JavaVersionRef {
    pub component: Option<String>,
    pub majorVersion: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Library {
    /// Maven coordinates `group:artifact:version[:classifier]`.
    pub name: Option<String>,
    pub downloads: Option<LibraryDownloads>,
    /// Fabric-style base repository URL for libraries without
    /// explicit `downloads`.
    pub url: Option<String>,
    /// OS name -> natives classifier template (may contain `${arch}`).
    pub natives: Option<BTreeMap<String, String>>,
    pub extract: Option<LibraryExtract>,
    pub rules: Option<Vec<Rule>>,
    // Fabric-style flat checksum/size:
    pub sha1: Option<String>,
    pub size: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LibraryDownloads {
    pub artifact: Option<LibraryArtifact>,
    /// Keyed by classifier (`natives-linux`, `natives-windows`, ...).
    pub classifiers: Option<BTreeMap<String, LibraryArtifact>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LibraryArtifact {
    pub path: Option<String>,
    pub url: Option<String>,
    pub sha1: Option<String>,
    pub size: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LibraryExtract {
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Logging {
    pub client: Option<LoggingClient>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoggingClient {
    pub argument: String,
    pub file: LoggingFile,
    pub r#type: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoggingFile {
    pub id: String,
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

impl Library {
    /// Dedup key: coordinates without the version
    /// (`group:artifact[:classifier]`).
    #[must_use]
    pub fn key(&self) -> Option<String> {
        let name = self.name.as_deref()?;
        let parts: Vec<&str> = name.split(':').collect();
        match parts.as_slice() {
            [group, artifact, _version] => Some(format!("{group}:{artifact}")),
            [group, artifact, _version, classifier] => {
                Some(format!("{group}:{artifact}:{classifier}"))
            }
            _ => None,
        }
    }

    /// Natives classifier for the given OS/arch, with `${arch}`
    /// substituted (`64` on 64-bit hosts, `32` otherwise).
    #[must_use]
    pub fn native_classifier(&self, os_name: &str) -> Option<String> {
        let template = self.natives.as_ref()?.get(os_name)?;
        let arch_bits = if cfg!(target_pointer_width = "32") {
            "32"
        } else {
            "64"
        };
        Some(template.replace("${arch}", arch_bits))
    }

    /// True when the entry only carries native classifiers and no
    /// regular artifact (so it contributes nothing to the classpath).
    #[must_use]
    pub fn is_natives_only(&self) -> bool {
        match &self.downloads {
            Some(downloads) => downloads.artifact.is_none() && downloads.classifiers.is_some(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_key_ignores_version() {
        let lib: Library =
            serde_json::from_str(r#"{"name": "com.google.guava:guava:21.0"}"#).unwrap();
        assert_eq!(lib.key().as_deref(), Some("com.google.guava:guava"));

        let lib: Library =
            serde_json::from_str(r#"{"name": "org.lwjgl:lwjgl:3.3.3:natives-linux"}"#).unwrap();
        assert_eq!(lib.key().as_deref(), Some("org.lwjgl:lwjgl:natives-linux"));
    }

    #[test]
    fn argument_entry_shapes() {
        let plain: ArgumentEntry = serde_json::from_str(r#""--username""#).unwrap();
        assert!(matches!(plain, ArgumentEntry::Plain(_)));

        let conditional: ArgumentEntry = serde_json::from_str(
            r#"{
                "rules": [{"action": "allow", "features": {"has_custom_resolution": true}}],
                "value": ["--width", "${resolution_width}"]
            }"#,
        )
        .unwrap();
        match conditional {
            ArgumentEntry::Conditional {
                value: ArgumentValue::List(values),
                ..
            } => assert_eq!(values.len(), 2),
            other => panic!("expected conditional list entry, got {other:?}"),
        }
    }

    #[test]
    fn natives_classifier_arch_substitution() {
        let lib: Library = serde_json::from_str(
            r#"{
                "name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.4",
                "natives": {"linux": "natives-linux", "windows": "natives-windows-${arch}"}
            }"#,
        )
        .unwrap();
        assert_eq!(
            lib.native_classifier("linux").as_deref(),
            Some("natives-linux")
        );
        let windows = lib.native_classifier("windows").unwrap();
        assert!(windows == "natives-windows-64" || windows == "natives-windows-32");
        assert_eq!(lib.native_classifier("osx"), None);
    }

    #[test]
    fn parses_modded_descriptor_without_downloads() {
        let json = r#"{
            "id": "1.18.2-forge-40.2.4",
            "inheritsFrom": "1.18.2",
            "type": "release",
            "mainClass": "cpw.mods.bootstraplauncher.BootstrapLauncher",
            "libraries": []
        }"#;
        let details: VersionDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.inheritsFrom.as_deref(), Some("1.18.2"));
        assert!(details.downloads.is_none());
    }
}
