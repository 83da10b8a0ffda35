use mcl_core::{FetchError, IoError, JavaInstallError, JsonError};
use thiserror::Error;

use crate::{resolver::ResolveError, version_graph::VersionError};

#[derive(Debug, Error)]
pub enum GameLaunchError {
    #[error(transparent)]
    Version(#[from] VersionError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    JavaInstall(#[from] JavaInstallError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Json(#[from] JsonError),
    #[error("version {0} has no client download and no local jar")]
    NoClientDownload(String),
    #[error("couldn't extract natives:\n{0}")]
    NativesExtraction(ResolveError),
    #[error("couldn't start java: {0}")]
    Spawn(String),
    #[error("game exited with code {0}")]
    ChildExit(i32),
}
