//! Stages platform-native libraries into a run-scoped directory.

use std::{
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use mcl_core::{FetchTask, GameRoot};

use crate::libraries::LibraryPlan;

/// A planned natives staging: a fresh per-run directory plus the
/// unpack tasks that fill it.
#[derive(Debug)]
pub struct NativesStage {
    pub dir: PathBuf,
    pub tasks: Vec<FetchTask>,
}

/// Short token making the staging directory unique per run, so a
/// crashed previous run can't leave half-extracted files behind.
#[must_use]
pub fn run_token() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    format!("{:x}{:05x}", std::process::id() & 0xffff, nanos & 0xfffff)
}

/// Plans extraction of every staged natives jar from the library plan
/// into `versions/<id>/natives-<token>/`.
///
/// Entries matching an `extract.exclude` prefix are skipped during
/// unpacking, and directories are never materialized as files.
#[must_use]
pub fn plan_natives(root: &GameRoot, id: &str, token: &str, libraries: &LibraryPlan) -> NativesStage {
    let dir = root.natives_dir(id, token);
    let tasks = libraries
        .natives
        .iter()
        .map(|(archive, exclude)| FetchTask::UnpackExclude {
            archive: archive.clone(),
            target_dir: dir.clone(),
            strip_prefix: None,
            exclude: exclude.clone(),
        })
        .collect();
    NativesStage { dir, tasks }
}
