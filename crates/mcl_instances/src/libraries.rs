//! Turns the flattened library list into download tasks and the
//! classpath, filtered by the host's rules.

use std::{collections::BTreeMap, path::PathBuf};

use mcl_core::{
    json::version::Library,
    rules::{self, HostFacts},
    store, FetchTask, GameRoot,
};

use crate::version_graph::FlatVersion;

/// What the rule-filtered library set means for this host: the jars
/// to fetch, the classpath entries, and the natives archives to stage.
#[derive(Debug, Default)]
pub struct LibraryPlan {
    pub tasks: Vec<FetchTask>,
    /// Library jars for the classpath, in descriptor order.
    pub classpath: Vec<PathBuf>,
    /// `(local archive, extraction exclude prefixes)` for every
    /// natives jar of this OS.
    pub natives: Vec<(PathBuf, Vec<String>)>,
}

/// Plans downloads for every library the rules allow.
///
/// Libraries come in three shapes: modern entries with explicit
/// `downloads.artifact`, natives entries with per-OS `classifiers`,
/// and bare Maven coordinates with an optional repository `url`
/// (Fabric and older Forge). All three resolve into
/// `libraries/<maven-path>` targets.
#[must_use]
pub fn plan_libraries(
    root: &GameRoot,
    flat: &FlatVersion,
    facts: &HostFacts,
    features: &BTreeMap<String, bool>,
) -> LibraryPlan {
    let mut plan = LibraryPlan::default();

    for library in &flat.libraries {
        let allowed = library
            .rules
            .as_ref()
            .map_or(true, |rules| rules::eval(rules, facts, features));
        if !allowed {
            continue;
        }

        plan_main_artifact(root, library, &mut plan);
        plan_native_artifact(root, library, facts, &mut plan);
    }

    plan
}

fn plan_main_artifact(root: &GameRoot, library: &Library, plan: &mut LibraryPlan) {
    let artifact = library.downloads.as_ref().and_then(|d| d.artifact.as_ref());

    let (rel, url, sha1, size) = if let Some(artifact) = artifact {
        let rel = match (&artifact.path, &library.name) {
            (Some(path), _) => path.clone(),
            (None, Some(name)) => match store::maven_to_path(name) {
                Some(rel) => rel,
                None => return,
            },
            (None, None) => return,
        };
        let Some(url) = artifact.url.clone() else {
            // No URL: the artifact is expected to already exist
            // locally (installer-provided). Only the classpath entry
            // is recorded.
            plan.classpath.push(root.library_path(&rel));
            return;
        };
        (rel, url, artifact.sha1.clone(), artifact.size)
    } else if let Some(name) = &library.name {
        if library.is_natives_only() {
            return;
        }
        let Some(rel) = store::maven_to_path(name) else {
            return;
        };
        let Some(url) = store::maven_to_url(name, library.url.as_deref()) else {
            return;
        };
        (rel, url, library.sha1.clone(), library.size)
    } else {
        return;
    };

    let target = root.library_path(&rel);
    plan.classpath.push(target.clone());
    plan.tasks.push(FetchTask::verified(url, target, sha1, size));
}

fn plan_native_artifact(
    root: &GameRoot,
    library: &Library,
    facts: &HostFacts,
    plan: &mut LibraryPlan,
) {
    let Some(classifier) = library.native_classifier(&facts.os_name) else {
        return;
    };
    let Some(classifiers) = library
        .downloads
        .as_ref()
        .and_then(|d| d.classifiers.as_ref())
    else {
        return;
    };
    let Some(artifact) = classifiers.get(&classifier) else {
        return;
    };

    let rel = match (&artifact.path, &library.name) {
        (Some(path), _) => path.clone(),
        (None, Some(name)) => {
            let coordinate = format!("{name}:{classifier}");
            match store::maven_to_path(&coordinate) {
                Some(rel) => rel,
                None => return,
            }
        }
        (None, None) => return,
    };

    let target = root.library_path(&rel);
    if let Some(url) = artifact.url.clone() {
        plan.tasks.push(FetchTask::verified(
            url,
            target.clone(),
            artifact.sha1.clone(),
            artifact.size,
        ));
    }

    let exclude = library
        .extract
        .as_ref()
        .map(|e| e.exclude.clone())
        .unwrap_or_default();
    plan.natives.push((target, exclude));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version_graph::dedup_libraries;

    fn facts() -> HostFacts {
        HostFacts {
            os_name: "linux".to_owned(),
            os_version: None,
            arch: "x86_64".to_owned(),
        }
    }

    fn flat_with_libraries(json: &str) -> FlatVersion {
        let libraries: Vec<Library> = serde_json::from_str(json).unwrap();
        FlatVersion {
            id: "test".to_owned(),
            jar_id: "test".to_owned(),
            version_type: "release".to_owned(),
            main_class: None,
            assets: None,
            asset_index: None,
            client: None,
            java_version: None,
            libraries: dedup_libraries(libraries),
            jvm_args: Vec::new(),
            game_args: Vec::new(),
            minecraft_arguments: None,
            logging: None,
            release_time: None,
        }
    }

    #[test]
    fn modern_artifact_lands_on_classpath() {
        let flat = flat_with_libraries(
            r#"[{
                "name": "com.mojang:brigadier:1.0.18",
                "downloads": {"artifact": {
                    "path": "com/mojang/brigadier/1.0.18/brigadier-1.0.18.jar",
                    "url": "https://libraries.minecraft.net/com/mojang/brigadier/1.0.18/brigadier-1.0.18.jar",
                    "sha1": "c1e1d9e1e8d023d152dd8a0f9a3f1a39a2c956a3",
                    "size": 77116
                }}
            }]"#,
        );
        let plan = plan_libraries(&GameRoot::new("/game"), &flat, &facts(), &BTreeMap::new());
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(
            plan.classpath,
            [PathBuf::from(
                "/game/libraries/com/mojang/brigadier/1.0.18/brigadier-1.0.18.jar"
            )]
        );
        assert!(plan.natives.is_empty());
    }

    #[test]
    fn bare_maven_entry_uses_repository_url() {
        let flat = flat_with_libraries(
            r#"[{
                "name": "net.fabricmc:sponge-mixin:0.13.3",
                "url": "https://maven.fabricmc.net/"
            }]"#,
        );
        let plan = plan_libraries(&GameRoot::new("/game"), &flat, &facts(), &BTreeMap::new());
        match &plan.tasks[..] {
            [FetchTask::Download { url, .. }] => assert_eq!(
                url,
                "https://maven.fabricmc.net/net/fabricmc/sponge-mixin/0.13.3/sponge-mixin-0.13.3.jar"
            ),
            other => panic!("expected one download task, got {other:?}"),
        }
    }

    #[test]
    fn disallowed_library_is_dropped() {
        let flat = flat_with_libraries(
            r#"[{
                "name": "ca.weblite:java-objc-bridge:1.0.0",
                "rules": [{"action": "allow", "os": {"name": "osx"}}],
                "downloads": {"artifact": {
                    "path": "ca/weblite/java-objc-bridge/1.0.0/java-objc-bridge-1.0.0.jar",
                    "url": "https://libraries.minecraft.net/ca/weblite/java-objc-bridge/1.0.0/java-objc-bridge-1.0.0.jar",
                    "sha1": "1227f9e0666314f9de41477e3ec277e542ed7f7b",
                    "size": 1
                }}
            }]"#,
        );
        let plan = plan_libraries(&GameRoot::new("/game"), &flat, &facts(), &BTreeMap::new());
        assert!(plan.tasks.is_empty());
        assert!(plan.classpath.is_empty());
    }

    #[test]
    fn natives_classifier_is_fetched_but_kept_off_classpath() {
        let flat = flat_with_libraries(
            r#"[{
                "name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.4",
                "natives": {"linux": "natives-linux"},
                "extract": {"exclude": ["META-INF/"]},
                "downloads": {"classifiers": {
                    "natives-linux": {
                        "path": "org/lwjgl/lwjgl/lwjgl-platform/2.9.4/lwjgl-platform-2.9.4-natives-linux.jar",
                        "url": "https://libraries.minecraft.net/org/lwjgl/lwjgl/lwjgl-platform/2.9.4/lwjgl-platform-2.9.4-natives-linux.jar",
                        "sha1": "931074f46c795d2f7b30ed6395df5715cfd7675b",
                        "size": 578680
                    }
                }}
            }]"#,
        );
        let plan = plan_libraries(&GameRoot::new("/game"), &flat, &facts(), &BTreeMap::new());
        assert_eq!(plan.tasks.len(), 1);
        assert!(plan.classpath.is_empty());
        assert_eq!(plan.natives.len(), 1);
        assert_eq!(plan.natives[0].1, ["META-INF/"]);
    }

    #[test]
    fn classpath_has_no_duplicate_coordinates() {
        let flat = flat_with_libraries(
            r#"[
                {"name": "org.ow2.asm:asm:9.1", "url": "https://maven.example.com/"},
                {"name": "org.ow2.asm:asm:9.2", "url": "https://maven.example.com/"}
            ]"#,
        );
        let plan = plan_libraries(&GameRoot::new("/game"), &flat, &facts(), &BTreeMap::new());
        assert_eq!(
            plan.classpath,
            [PathBuf::from(
                "/game/libraries/org/ow2/asm/asm/9.2/asm-9.2.jar"
            )]
        );
    }
}
