//! Resolves the asset index of a version into a concrete fetch plan.

use std::path::PathBuf;

use mcl_core::{
    file_utils, info, json::AssetIndexFile, FetchTask, GameRoot, IntoIoError, IntoJsonError,
};

use crate::{launch::GameLaunchError, version_graph::FlatVersion};

const OBJECTS_URL: &str = "https://resources.download.minecraft.net";

/// Fetch plan for all assets of one version.
#[derive(Debug)]
pub struct AssetPlan {
    pub index_id: String,
    /// Where `virtual` indexes materialize logical paths, when they do.
    pub virtual_dir: Option<PathBuf>,
    pub tasks: Vec<FetchTask>,
    /// Copies materializing logical paths for `virtual` /
    /// `map_to_resources` layouts. Their sources are the downloaded
    /// objects, so these must only run after `tasks` has fully
    /// resolved.
    pub copy_tasks: Vec<FetchTask>,
}

/// Downloads and parses the asset index, then plans one download task
/// per object (plus copy tasks for `virtual` / `map_to_resources`
/// layouts, kept separate so they can run once the objects exist).
///
/// # Errors
/// - the index can't be fetched or fails its hash check
/// - the index is not valid JSON
pub async fn plan_assets(root: &GameRoot, flat: &FlatVersion) -> Result<AssetPlan, GameLaunchError> {
    let Some(index_ref) = &flat.asset_index else {
        info!("No asset index specified, skipping assets");
        return Ok(AssetPlan {
            index_id: flat.assets.clone().unwrap_or_default(),
            virtual_dir: None,
            tasks: Vec::new(),
            copy_tasks: Vec::new(),
        });
    };

    let index_path = root.asset_index_path(&index_ref.id);
    file_utils::fetch_to_file(
        &index_ref.url,
        &index_path,
        Some(&index_ref.sha1),
        Some(index_ref.size),
    )
    .await?;

    let json = tokio::fs::read_to_string(&index_path)
        .await
        .path(&index_path)?;
    let index: AssetIndexFile = serde_json::from_str(&json).json(json)?;

    let virtual_dir = index
        .is_virtual
        .then(|| root.virtual_assets_dir(&index_ref.id));
    let resources_dir = index.map_to_resources.then(|| root.resources_dir());

    let mut tasks = Vec::new();
    let mut copy_tasks = Vec::new();
    for (logical_path, object) in &index.objects {
        let hash = &object.hash;
        let target = root.asset_object_path(hash);
        tasks.push(FetchTask::verified(
            format!("{OBJECTS_URL}/{}/{hash}", &hash[..2.min(hash.len())]),
            target.clone(),
            Some(hash.clone()),
            Some(object.size),
        ));

        if let Some(virtual_dir) = &virtual_dir {
            copy_tasks.push(FetchTask::Copy {
                source: target.clone(),
                target: virtual_dir.join(logical_path),
            });
        }
        if let Some(resources_dir) = &resources_dir {
            copy_tasks.push(FetchTask::Copy {
                source: target.clone(),
                target: resources_dir.join(logical_path),
            });
        }
    }

    Ok(AssetPlan {
        index_id: index_ref.id.clone(),
        virtual_dir,
        tasks,
        copy_tasks,
    })
}
