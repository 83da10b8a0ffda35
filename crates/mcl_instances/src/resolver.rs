//! A bounded pool of workers draining a shared queue of fetch tasks.
//!
//! Tasks are independent: idempotent, commutative, each writing only
//! its declared target paths. A failing task never cancels its
//! siblings; failures are collected and surfaced together after the
//! queue drains.

use std::{
    collections::VecDeque,
    io::Read,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc::Sender,
        Arc, Mutex,
    },
};

use mcl_core::{file_utils, FetchError, FetchTask, GenericProgress, IntoIoError, IoError};
use thiserror::Error;

pub const DEFAULT_WORKERS: usize = 4;

/// All failures of one resolver run, aggregated.
#[derive(Debug, Error)]
#[error("{} file(s) failed to resolve:\n{}", .failures.len(), describe(.failures))]
pub struct ResolveError {
    pub failures: Vec<TaskFailure>,
}

#[derive(Debug)]
pub struct TaskFailure {
    pub label: String,
    pub error: String,
}

fn describe(failures: &[TaskFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("- {}: {}", f.label, f.error))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Error)]
enum TaskError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Io(#[from] IoError),
    #[error("couldn't unpack {archive:?}: {error}")]
    Unpack { archive: PathBuf, error: String },
}

/// Runs fetch tasks on a fixed number of concurrent workers.
pub struct ResolverPool {
    workers: usize,
    cancel: Arc<AtomicBool>,
    progress: Option<Sender<GenericProgress>>,
}

impl ResolverPool {
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            cancel: Arc::new(AtomicBool::new(false)),
            progress: None,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, sender: Sender<GenericProgress>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Shared cancellation flag; setting it makes every worker stop
    /// before picking up its next task.
    #[must_use]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Drains the given tasks and returns once all workers are done.
    ///
    /// # Errors
    /// [`ResolveError`] carrying every individual task failure; the
    /// queue is always fully drained first.
    pub async fn run(&self, tasks: Vec<FetchTask>) -> Result<(), ResolveError> {
        let total = tasks.len();
        if total == 0 {
            return Ok(());
        }

        let queue = Arc::new(Mutex::new(VecDeque::from(tasks)));
        let done = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(Mutex::new(Vec::new()));

        let workers = (0..self.workers.min(total)).map(|_| {
            let queue = Arc::clone(&queue);
            let done = Arc::clone(&done);
            let failures = Arc::clone(&failures);
            let cancel = Arc::clone(&self.cancel);
            let progress = self.progress.clone();
            async move {
                loop {
                    if cancel.load(Ordering::Relaxed) {
                        break;
                    }
                    let task = match queue.lock() {
                        Ok(mut queue) => queue.pop_front(),
                        Err(_) => break,
                    };
                    let Some(task) = task else { break };

                    let label = task.label();
                    if let Err(err) = run_task(task).await {
                        if let Ok(mut failures) = failures.lock() {
                            failures.push(TaskFailure {
                                label: label.clone(),
                                error: err.to_string(),
                            });
                        }
                    }

                    let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(sender) = &progress {
                        _ = sender.send(GenericProgress {
                            done: finished,
                            total,
                            message: Some(label),
                            has_finished: finished == total,
                        });
                    }
                }
            }
        });
        futures::future::join_all(workers).await;

        let failures = match Arc::try_unwrap(failures) {
            Ok(mutex) => mutex
                .into_inner()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
            Err(arc) => match arc.lock() {
                Ok(mut guard) => std::mem::take(&mut *guard),
                Err(poison) => std::mem::take(&mut *poison.into_inner()),
            },
        };
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ResolveError { failures })
        }
    }
}

async fn run_task(task: FetchTask) -> Result<(), TaskError> {
    match task {
        FetchTask::Download {
            url,
            target,
            sha1,
            size,
            executable,
        } => {
            file_utils::fetch_to_file(&url, &target, sha1.as_deref(), size).await?;
            if executable {
                file_utils::set_executable(&target).await?;
            }
            Ok(())
        }
        FetchTask::Copy { source, target } => {
            if target.exists() {
                return Ok(());
            }
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await.path(parent)?;
            }
            tokio::fs::copy(&source, &target).await.path(&source)?;
            Ok(())
        }
        FetchTask::UnpackExclude {
            archive,
            target_dir,
            strip_prefix,
            exclude,
        } => {
            let archive_clone = archive.clone();
            let result = tokio::task::spawn_blocking(move || {
                extract_zip(&archive_clone, &target_dir, strip_prefix.as_deref(), &exclude)
            })
            .await;
            match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(err)) => Err(err),
                Err(join_err) => Err(TaskError::Unpack {
                    archive,
                    error: join_err.to_string(),
                }),
            }
        }
    }
}

/// Extracts a ZIP archive into `target_dir`, skipping directories and
/// any entry whose name starts with one of the `exclude` prefixes.
/// `strip_prefix` drops a leading path component from entry names.
/// Shared objects get the executable bit on Unix.
fn extract_zip(
    archive: &Path,
    target_dir: &Path,
    strip_prefix: Option<&str>,
    exclude: &[String],
) -> Result<(), TaskError> {
    let unpack = |archive: &Path| -> Result<(), ZipUnpackError> {
        let file = std::fs::File::open(archive).path(archive)?;
        let mut zip = zip::ZipArchive::new(file)?;

        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_owned();
            if exclude.iter().any(|prefix| name.starts_with(prefix)) {
                continue;
            }

            let Some(rel) = entry.enclosed_name() else {
                return Err(ZipUnpackError::Io(IoError::DirEscape(name)));
            };
            let rel = match strip_prefix {
                Some(prefix) => rel.strip_prefix(prefix).unwrap_or(&rel).to_owned(),
                None => rel,
            };
            if rel.as_os_str().is_empty() {
                continue;
            }

            let out_path = target_dir.join(&rel);
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent).path(parent)?;
            }
            let mut out = std::fs::File::create(&out_path).path(&out_path)?;
            let mut buf = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
            entry.read_to_end(&mut buf).path(&out_path)?;
            std::io::Write::write_all(&mut out, &buf).path(&out_path)?;

            #[cfg(unix)]
            if name.ends_with(".so") || name.ends_with(".dylib") {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(0o755))
                    .path(&out_path)?;
            }
        }
        Ok(())
    };

    unpack(archive).map_err(|err| match err {
        ZipUnpackError::Io(io) => TaskError::Io(io),
        ZipUnpackError::Zip(zip_err) => TaskError::Unpack {
            archive: archive.to_owned(),
            error: zip_err.to_string(),
        },
    })
}

#[derive(Debug, Error)]
enum ZipUnpackError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}
