use std::path::PathBuf;

/// One unit of work for the resolver pool.
///
/// Tasks are idempotent and only touch their declared target paths.
/// Tasks handed to one pool run must be mutually independent; work
/// that reads another task's output (asset copies, natives unpacks)
/// belongs in a later run, after the producing run has drained.
#[derive(Debug, Clone)]
pub enum FetchTask {
    /// Download `url` into `target`, verifying against `sha1`/`size`
    /// when known. `executable` marks the file 0755 afterwards (Unix).
    Download {
        url: String,
        target: PathBuf,
        sha1: Option<String>,
        size: Option<u64>,
        executable: bool,
    },
    /// Copy an already-resolved file to a second location.
    Copy { source: PathBuf, target: PathBuf },
    /// Unpack a local ZIP archive into `target_dir`, dropping
    /// `strip_prefix` from entry names and skipping entries under any
    /// of the `exclude` prefixes.
    UnpackExclude {
        archive: PathBuf,
        target_dir: PathBuf,
        strip_prefix: Option<String>,
        exclude: Vec<String>,
    },
}

impl FetchTask {
    #[must_use]
    pub fn download(url: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self::Download {
            url: url.into(),
            target: target.into(),
            sha1: None,
            size: None,
            executable: false,
        }
    }

    #[must_use]
    pub fn verified(
        url: impl Into<String>,
        target: impl Into<PathBuf>,
        sha1: Option<String>,
        size: Option<u64>,
    ) -> Self {
        Self::Download {
            url: url.into(),
            target: target.into(),
            sha1,
            size,
            executable: false,
        }
    }

    /// Short human-readable label for progress reporting.
    #[must_use]
    pub fn label(&self) -> String {
        let path = match self {
            FetchTask::Download { target, .. } | FetchTask::Copy { target, .. } => target,
            FetchTask::UnpackExclude { archive, .. } => archive,
        };
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned())
    }
}
