use std::path::PathBuf;

use thiserror::Error;

use crate::{
    file_utils, info,
    json::{component_for_major, JavaFile, JavaFilesJson, JavaListJson},
    FetchTask, GameRoot, IntoIoError, IoError, JsonDownloadError,
};

/// A planned (or already present) Java installation under
/// `runtime/<component>/<os>/<component>/`.
///
/// The caller runs `tasks` through the resolver pool, then calls
/// [`JavaRuntime::finalize`] to create directories and links and get
/// the executable path.
pub struct JavaRuntime {
    pub component: &'static str,
    pub install_dir: PathBuf,
    pub tasks: Vec<FetchTask>,
    directories: Vec<PathBuf>,
    links: Vec<(PathBuf, String)>,
    lock_file: Option<PathBuf>,
}

/// Plans the download of a Java runtime matching `major`.
///
/// A complete prior installation is detected by its executable and the
/// absence of an install lock, and yields an empty task list.
///
/// # Errors
/// - [`JavaInstallError::JavaUnavailable`] when Mojang ships no build
///   for this platform/version combination
/// - network/JSON errors from the product index
pub async fn plan_runtime(major: u32, root: &GameRoot) -> Result<JavaRuntime, JavaInstallError> {
    let component = component_for_major(major);
    let install_dir = root.runtime_dir(component);
    let lock_file = install_dir.join("install.lock");

    if find_java_exe(&install_dir).is_some() && !lock_file.exists() {
        return Ok(JavaRuntime {
            component,
            install_dir,
            tasks: Vec::new(),
            directories: Vec::new(),
            links: Vec::new(),
            lock_file: None,
        });
    }

    info!("Installing Java runtime: {component}");
    let java_list = JavaListJson::download().await?;
    let manifest_url = java_list
        .manifest_url(component)
        .ok_or(JavaInstallError::JavaUnavailable { major })?;
    let manifest: JavaFilesJson = file_utils::download_file_to_json(&manifest_url).await?;

    let mut tasks = Vec::new();
    let mut directories = Vec::new();
    let mut links = Vec::new();
    for (name, file) in &manifest.files {
        let target = install_dir.join(name);
        match file {
            JavaFile::file {
                downloads,
                executable,
            } => tasks.push(FetchTask::Download {
                url: downloads.raw.url.clone(),
                target,
                sha1: downloads.raw.sha1.clone(),
                size: downloads.raw.size,
                executable: *executable,
            }),
            JavaFile::directory {} => directories.push(target),
            JavaFile::link { target: link_to } => links.push((target, link_to.clone())),
        }
    }

    tokio::fs::create_dir_all(&install_dir)
        .await
        .path(&install_dir)?;
    tokio::fs::write(&lock_file, "If you see this, java hasn't finished installing.")
        .await
        .path(&lock_file)?;

    Ok(JavaRuntime {
        component,
        install_dir,
        tasks,
        directories,
        links,
        lock_file: Some(lock_file),
    })
}

impl JavaRuntime {
    /// Creates directories and links, removes the install lock and
    /// returns the path of the `java` executable.
    ///
    /// Call after every task from [`JavaRuntime::tasks`] resolved.
    ///
    /// # Errors
    /// - [`JavaInstallError::NoJavaBinFound`] when the installed tree
    ///   has no executable at the expected location
    /// - filesystem errors creating directories or links
    pub async fn finalize(self) -> Result<PathBuf, JavaInstallError> {
        for dir in &self.directories {
            tokio::fs::create_dir_all(dir).await.path(dir)?;
        }
        for (link, target) in &self.links {
            if link.exists() {
                continue;
            }
            if let Some(parent) = link.parent() {
                tokio::fs::create_dir_all(parent).await.path(parent)?;
                file_utils::symlink_or_copy(&parent.join(target), link).await?;
            }
        }
        if let Some(lock_file) = &self.lock_file {
            tokio::fs::remove_file(lock_file).await.path(lock_file)?;
            info!("Finished installing Java runtime: {}", self.component);
        }

        find_java_exe(&self.install_dir).ok_or(JavaInstallError::NoJavaBinFound)
    }
}

fn find_java_exe(install_dir: &std::path::Path) -> Option<PathBuf> {
    let candidates: &[&str] = if cfg!(target_os = "windows") {
        &["bin/javaw.exe", "bin/java.exe"]
    } else if cfg!(target_os = "macos") {
        &["bin/java", "jre.bundle/Contents/Home/bin/java"]
    } else {
        &["bin/java"]
    };
    candidates
        .iter()
        .map(|rel| install_dir.join(rel))
        .find(|path| path.is_file())
}

#[derive(Debug, Error)]
pub enum JavaInstallError {
    #[error("couldn't install java: {0}")]
    JsonDownload(#[from] JsonDownloadError),
    #[error("couldn't install java: {0}")]
    Io(#[from] IoError),
    #[error("java {major} unavailable on this platform")]
    JavaUnavailable { major: u32 },
    #[error("could not find java binary after install")]
    NoJavaBinFound,
}
