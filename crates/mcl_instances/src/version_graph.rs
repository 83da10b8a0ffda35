//! Loads version descriptors and flattens `inheritsFrom` chains into a
//! single launchable view, children overriding parents.

use std::collections::HashSet;

use mcl_core::{
    file_utils,
    json::{
        version::{
            ArgumentEntry, AssetIndexRef, DownloadEntry, JavaVersionRef, Library, Logging,
            VersionDetails,
        },
        Manifest,
    },
    FetchError, GameRoot, IntoIoError, IntoJsonError, IoError, JsonDownloadError, JsonError,
    RequestError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("version not found locally or in the official manifest: {0}")]
    NotFound(String),
    #[error("inheritance chain revisits version {0}")]
    CyclicInheritance(String),
    #[error("malformed descriptor for {id}: {source}")]
    MalformedDescriptor { id: String, source: JsonError },
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Io(#[from] IoError),
}

impl From<JsonDownloadError> for VersionError {
    fn from(value: JsonDownloadError) -> Self {
        match value {
            JsonDownloadError::Request(err) => Self::Request(err),
            JsonDownloadError::Serde(err) => Self::MalformedDescriptor {
                id: "version manifest".to_owned(),
                source: err,
            },
        }
    }
}

/// The flattened, launchable view of a version: the result of merging
/// an `inheritsFrom` chain child-over-parent.
#[derive(Debug, Clone)]
pub struct FlatVersion {
    /// The requested (child-most) version id.
    pub id: String,
    /// Id of the descriptor that supplied the client download; modded
    /// versions launch the vanilla jar of their base version.
    pub jar_id: String,
    pub version_type: String,
    pub main_class: Option<String>,
    pub assets: Option<String>,
    pub asset_index: Option<AssetIndexRef>,
    pub client: Option<DownloadEntry>,
    pub java_version: Option<JavaVersionRef>,
    /// Parent libraries first, children appended, deduped by
    /// `group:artifact[:classifier]` with the child-most entry winning.
    pub libraries: Vec<Library>,
    pub jvm_args: Vec<ArgumentEntry>,
    pub game_args: Vec<ArgumentEntry>,
    pub minecraft_arguments: Option<String>,
    pub logging: Option<Logging>,
    pub release_time: Option<String>,
}

/// Loads and flattens version descriptors. Caches the official
/// manifest in memory so it is fetched at most once per run.
pub struct VersionGraph {
    root: GameRoot,
    manifest: Option<Manifest>,
}

impl VersionGraph {
    #[must_use]
    pub fn new(root: GameRoot) -> Self {
        Self {
            root,
            manifest: None,
        }
    }

    /// The official version manifest, downloading it on first use.
    ///
    /// # Errors
    /// Network or parse errors from the manifest endpoint.
    pub async fn manifest(&mut self) -> Result<&Manifest, VersionError> {
        if self.manifest.is_none() {
            self.manifest = Some(Manifest::download().await?);
        }
        // Will not panic, it was just set above.
        Ok(self.manifest.as_ref().unwrap())
    }

    /// Loads one descriptor: from `versions/<id>/<id>.json` when
    /// present, otherwise fetched (and kept) from the official
    /// manifest.
    ///
    /// # Errors
    /// - [`VersionError::NotFound`] when the id is neither local nor
    ///   official
    /// - [`VersionError::MalformedDescriptor`] on broken JSON
    pub async fn load(&mut self, id: &str) -> Result<VersionDetails, VersionError> {
        let json_path = self.root.version_json_path(id);

        if !json_path.is_file() {
            let (url, sha1) = {
                let manifest = self.manifest().await?;
                let entry = manifest
                    .find_name(id)
                    .ok_or_else(|| VersionError::NotFound(id.to_owned()))?;
                (entry.url.clone(), entry.sha1.clone())
            };
            file_utils::fetch_to_file(&url, &json_path, sha1.as_deref(), None).await?;
        }

        let json = tokio::fs::read_to_string(&json_path)
            .await
            .path(&json_path)?;
        serde_json::from_str(&json)
            .json(json)
            .map_err(|source| VersionError::MalformedDescriptor {
                id: id.to_owned(),
                source,
            })
    }

    /// Flattens the `inheritsFrom` chain of `id` into a [`FlatVersion`].
    ///
    /// # Errors
    /// - [`VersionError::CyclicInheritance`] when the chain revisits an id
    /// - everything [`VersionGraph::load`] can return
    pub async fn flatten(&mut self, id: &str) -> Result<FlatVersion, VersionError> {
        // Child-most first.
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = id.to_owned();
        loop {
            if !visited.insert(current.clone()) {
                return Err(VersionError::CyclicInheritance(current));
            }
            let details = self.load(&current).await?;
            let parent = details.inheritsFrom.clone();
            chain.push(details);
            match parent {
                Some(parent_id) => current = parent_id,
                None => break,
            }
        }

        let root = chain
            .pop()
            .ok_or_else(|| VersionError::NotFound(id.to_owned()))?;
        let mut flat = flat_from_root(root);
        while let Some(child) = chain.pop() {
            merge_child(&mut flat, child);
        }
        flat.id = id.to_owned();
        flat.libraries = dedup_libraries(std::mem::take(&mut flat.libraries));
        Ok(flat)
    }
}

fn flat_from_root(root: VersionDetails) -> FlatVersion {
    let (jvm_args, game_args) = match root.arguments {
        Some(args) => (args.jvm, args.game),
        None => (Vec::new(), Vec::new()),
    };
    FlatVersion {
        jar_id: root.id.clone(),
        id: root.id,
        version_type: root.r#type.unwrap_or_else(|| "release".to_owned()),
        main_class: root.mainClass,
        assets: root.assets,
        asset_index: root.assetIndex,
        client: root.downloads.and_then(|d| d.client),
        java_version: root.javaVersion,
        libraries: root.libraries.unwrap_or_default(),
        jvm_args,
        game_args,
        minecraft_arguments: root.minecraftArguments,
        logging: root.logging,
        release_time: root.releaseTime,
    }
}

/// Merges one child descriptor over the accumulated parent view:
/// lists concatenate child-after-parent, scalars are overridden by the
/// child when present.
fn merge_child(flat: &mut FlatVersion, child: VersionDetails) {
    if let Some(libraries) = child.libraries {
        flat.libraries.extend(libraries);
    }
    if let Some(arguments) = child.arguments {
        flat.jvm_args.extend(arguments.jvm);
        flat.game_args.extend(arguments.game);
    }
    if let Some(main_class) = child.mainClass {
        flat.main_class = Some(main_class);
    }
    if let Some(assets) = child.assets {
        flat.assets = Some(assets);
    }
    if let Some(asset_index) = child.assetIndex {
        flat.asset_index = Some(asset_index);
    }
    if let Some(client) = child.downloads.and_then(|d| d.client) {
        flat.client = Some(client);
        flat.jar_id = child.id.clone();
    }
    if let Some(java_version) = child.javaVersion {
        flat.java_version = Some(java_version);
    }
    if let Some(minecraft_arguments) = child.minecraftArguments {
        flat.minecraft_arguments = Some(minecraft_arguments);
    }
    if let Some(logging) = child.logging {
        flat.logging = Some(logging);
    }
    if let Some(version_type) = child.r#type {
        flat.version_type = version_type;
    }
    if let Some(release_time) = child.releaseTime {
        flat.release_time = Some(release_time);
    }
}

/// Keeps at most one library per `group:artifact[:classifier]`. The
/// later (child-most) occurrence wins and keeps its position, so a
/// loader's override of a vanilla library loads where the loader
/// listed it. Unnamed entries pass through untouched.
#[must_use]
pub fn dedup_libraries(libraries: Vec<Library>) -> Vec<Library> {
    let mut seen = HashSet::new();
    let mut deduped: Vec<Library> = Vec::with_capacity(libraries.len());
    for library in libraries.into_iter().rev() {
        match library.key() {
            Some(key) => {
                if seen.insert(key) {
                    deduped.push(library);
                }
            }
            None => deduped.push(library),
        }
    }
    deduped.reverse();
    deduped
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcl_core::json::version::ArgumentValue;

    fn lib(name: &str) -> Library {
        serde_json::from_str(&format!(r#"{{"name": "{name}"}}"#)).unwrap()
    }

    #[test]
    fn dedup_keeps_child_most_and_its_position() {
        let libs = vec![
            lib("a.b:one:1.0"),
            lib("a.b:two:1.0"),
            lib("a.b:one:2.0"),
        ];
        let deduped = dedup_libraries(libs);
        let names: Vec<&str> = deduped.iter().filter_map(|l| l.name.as_deref()).collect();
        assert_eq!(names, ["a.b:two:1.0", "a.b:one:2.0"]);
    }

    #[test]
    fn dedup_is_idempotent() {
        let libs = vec![
            lib("a.b:one:1.0"),
            lib("a.b:one:2.0"),
            lib("c.d:three:1.0"),
        ];
        let once = dedup_libraries(libs);
        let names_once: Vec<&str> = once.iter().filter_map(|l| l.name.as_deref()).collect();
        let twice = dedup_libraries(once.clone());
        let names_twice: Vec<&str> = twice.iter().filter_map(|l| l.name.as_deref()).collect();
        assert_eq!(names_once, names_twice);
    }

    #[test]
    fn classifier_is_part_of_the_key() {
        let libs = vec![
            lib("org.lwjgl:lwjgl:3.3.3"),
            lib("org.lwjgl:lwjgl:3.3.3:natives-linux"),
        ];
        assert_eq!(dedup_libraries(libs).len(), 2);
    }

    fn write_version(root: &GameRoot, id: &str, json: &str) {
        let path = root.version_json_path(id);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, json).unwrap();
    }

    #[tokio::test]
    async fn flatten_merges_child_over_parent() {
        let dir = tempfile::tempdir().unwrap();
        let root = GameRoot::new(dir.path());

        write_version(
            &root,
            "1.18.2",
            r#"{
                "id": "1.18.2",
                "type": "release",
                "mainClass": "net.minecraft.client.main.Main",
                "assets": "1.18",
                "downloads": {"client": {
                    "sha1": "145ff0858209bcfc164859ba735d4199aafa1eea",
                    "size": 1,
                    "url": "https://example.com/client.jar"
                }},
                "libraries": [
                    {"name": "com.mojang:datafixerupper:4.0.26"},
                    {"name": "org.ow2.asm:asm:9.1"}
                ],
                "arguments": {"jvm": ["-Dbase=1"], "game": ["--username", "${auth_player_name}"]}
            }"#,
        );
        write_version(
            &root,
            "1.18.2-forge-40.2.4",
            r#"{
                "id": "1.18.2-forge-40.2.4",
                "inheritsFrom": "1.18.2",
                "mainClass": "cpw.mods.bootstraplauncher.BootstrapLauncher",
                "libraries": [
                    {"name": "net.minecraftforge:fmlloader:1.18.2-40.2.4"},
                    {"name": "org.ow2.asm:asm:9.2"}
                ],
                "arguments": {"jvm": ["-Dforge=1"], "game": ["--launchTarget", "forgeclient"]}
            }"#,
        );

        let mut graph = VersionGraph::new(root);
        let flat = graph.flatten("1.18.2-forge-40.2.4").await.unwrap();

        assert_eq!(flat.id, "1.18.2-forge-40.2.4");
        // The client jar stays the vanilla one.
        assert_eq!(flat.jar_id, "1.18.2");
        assert_eq!(
            flat.main_class.as_deref(),
            Some("cpw.mods.bootstraplauncher.BootstrapLauncher")
        );

        // Parent libraries first, loader libraries appended; the asm
        // override took the loader's (later) slot.
        let names: Vec<&str> = flat.libraries.iter().filter_map(|l| l.name.as_deref()).collect();
        assert_eq!(
            names,
            [
                "com.mojang:datafixerupper:4.0.26",
                "net.minecraftforge:fmlloader:1.18.2-40.2.4",
                "org.ow2.asm:asm:9.2",
            ]
        );

        // Argument lists concatenate child-after-parent.
        let jvm: Vec<String> = flat
            .jvm_args
            .iter()
            .filter_map(|a| match a {
                ArgumentEntry::Plain(s) => Some(s.clone()),
                ArgumentEntry::Conditional { value, .. } => match value {
                    ArgumentValue::Single(s) => Some(s.clone()),
                    ArgumentValue::List(_) => None,
                },
            })
            .collect();
        assert_eq!(jvm, ["-Dbase=1", "-Dforge=1"]);
    }

    #[tokio::test]
    async fn flatten_is_deterministic_and_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let root = GameRoot::new(dir.path());
        write_version(
            &root,
            "base",
            r#"{"id": "base", "type": "release", "libraries": [{"name": "a.b:c:1"}]}"#,
        );
        write_version(
            &root,
            "child",
            r#"{"id": "child", "inheritsFrom": "base", "libraries": [{"name": "a.b:c:2"}]}"#,
        );

        let mut graph = VersionGraph::new(root);
        let first = graph.flatten("child").await.unwrap();
        let second = graph.flatten("child").await.unwrap();
        let names = |flat: &FlatVersion| -> Vec<String> {
            flat.libraries
                .iter()
                .filter_map(|l| l.name.clone())
                .collect()
        };
        assert_eq!(names(&first), names(&second));
        assert_eq!(names(&first), ["a.b:c:2"]);

        // Re-deduping a flattened library list changes nothing.
        assert_eq!(
            names(&first),
            dedup_libraries(first.libraries.clone())
                .iter()
                .filter_map(|l| l.name.clone())
                .collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn cyclic_inheritance_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let root = GameRoot::new(dir.path());
        write_version(&root, "a", r#"{"id": "a", "inheritsFrom": "b"}"#);
        write_version(&root, "b", r#"{"id": "b", "inheritsFrom": "a"}"#);

        let mut graph = VersionGraph::new(root);
        match graph.flatten("a").await {
            Err(VersionError::CyclicInheritance(id)) => assert_eq!(id, "a"),
            other => panic!("expected CyclicInheritance, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_descriptor_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let root = GameRoot::new(dir.path());
        write_version(&root, "broken", "{ not json");

        let mut graph = VersionGraph::new(root);
        assert!(matches!(
            graph.load("broken").await,
            Err(VersionError::MalformedDescriptor { .. })
        ));
    }
}
