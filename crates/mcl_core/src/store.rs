//! Content store: maps logical coordinates (versions, libraries, assets,
//! runtimes) to paths under the game root, in the layout the official
//! launcher uses. Read-only queries never create directories; writers
//! create parents on demand.

use std::path::{Path, PathBuf};

/// Default base URL for libraries that carry no explicit download URL.
pub const LIBRARIES_BASE_URL: &str = "https://libraries.minecraft.net/";

/// A game directory (`.minecraft` style root).
#[derive(Debug, Clone)]
pub struct GameRoot {
    root: PathBuf,
}

impl GameRoot {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    #[must_use]
    pub fn version_dir(&self, id: &str) -> PathBuf {
        self.versions_dir().join(id)
    }

    #[must_use]
    pub fn version_json_path(&self, id: &str) -> PathBuf {
        self.version_dir(id).join(format!("{id}.json"))
    }

    #[must_use]
    pub fn client_jar_path(&self, id: &str) -> PathBuf {
        self.version_dir(id).join(format!("{id}.jar"))
    }

    #[must_use]
    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    /// Path of a library artifact, `rel` being its Maven-style
    /// relative path from the descriptor.
    #[must_use]
    pub fn library_path(&self, rel: &str) -> PathBuf {
        self.libraries_dir().join(rel)
    }

    #[must_use]
    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    #[must_use]
    pub fn asset_index_path(&self, index_id: &str) -> PathBuf {
        self.assets_dir()
            .join("indexes")
            .join(format!("{index_id}.json"))
    }

    /// Content-addressed object path: `assets/objects/<xx>/<hash>`.
    #[must_use]
    pub fn asset_object_path(&self, hash: &str) -> PathBuf {
        self.assets_dir()
            .join("objects")
            .join(&hash[..2.min(hash.len())])
            .join(hash)
    }

    /// Root for materialized logical paths of `virtual` asset indexes.
    #[must_use]
    pub fn virtual_assets_dir(&self, index_id: &str) -> PathBuf {
        self.assets_dir().join("virtual").join(index_id)
    }

    /// Root for `map_to_resources` asset indexes.
    #[must_use]
    pub fn resources_dir(&self) -> PathBuf {
        self.root.join("resources")
    }

    #[must_use]
    pub fn log_configs_dir(&self) -> PathBuf {
        self.assets_dir().join("log_configs")
    }

    /// Root of a downloaded Java runtime component.
    #[must_use]
    pub fn runtime_dir(&self, component: &str) -> PathBuf {
        self.root
            .join("runtime")
            .join(component)
            .join(crate::OS_NAME)
            .join(component)
    }

    /// Run-scoped natives staging directory for a version.
    #[must_use]
    pub fn natives_dir(&self, id: &str, token: &str) -> PathBuf {
        self.version_dir(id).join(format!("natives-{token}"))
    }

    #[must_use]
    pub fn launcher_profiles_path(&self) -> PathBuf {
        self.root.join("launcher_profiles.json")
    }
}

/// Converts a Maven coordinate `group:artifact:version[:classifier]`
/// into the relative repository path of its jar.
///
/// Ex.: `net.fabricmc:sponge-mixin:0.13.3` ->
/// `net/fabricmc/sponge-mixin/0.13.3/sponge-mixin-0.13.3.jar`
#[must_use]
pub fn maven_to_path(name: &str) -> Option<String> {
    let parts: Vec<&str> = name.split(':').collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let group = parts[0].replace('.', "/");
    let artifact = parts[1];
    let version = parts[2];
    let file = match parts.get(3) {
        Some(classifier) => format!("{artifact}-{version}-{classifier}.jar"),
        None => format!("{artifact}-{version}.jar"),
    };
    Some(format!("{group}/{artifact}/{version}/{file}"))
}

/// Download URL of a bare Maven-coordinate library.
/// `base` defaults to [`LIBRARIES_BASE_URL`] when the descriptor has none.
#[must_use]
pub fn maven_to_url(name: &str, base: Option<&str>) -> Option<String> {
    let rel = maven_to_path(name)?;
    let base = base.unwrap_or(LIBRARIES_BASE_URL);
    if base.ends_with('/') {
        Some(format!("{base}{rel}"))
    } else {
        Some(format!("{base}/{rel}"))
    }
}

/// Default game directory of the host (`~/.minecraft` style).
#[must_use]
pub fn default_game_dir() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        dirs::config_dir().map(|appdata| appdata.join(".minecraft"))
    } else if cfg!(target_os = "macos") {
        dirs::home_dir().map(|home| home.join("Library/Application Support/minecraft"))
    } else {
        dirs::home_dir().map(|home| home.join(".minecraft"))
    }
}
