use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
};

use futures::StreamExt;
use serde::de::DeserializeOwned;
use sha1::{Digest, Sha1};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::{
    error::{FetchError, IoError},
    retry, IntoIoError, IntoJsonError, JsonDownloadError, Retryable, CLIENT,
};

const NETWORK_ERROR_MSG: &str = r"
- Check your internet connection
- Check if you are behind a firewall/proxy
- Try doing the action again

";

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Download Error (code {code}){NETWORK_ERROR_MSG}Url: {url}")]
    Status {
        code: reqwest::StatusCode,
        url: reqwest::Url,
    },
    #[error("Network Request Error{NETWORK_ERROR_MSG}{0}")]
    Reqwest(#[from] reqwest::Error),
}

impl Retryable for RequestError {
    fn retryable(&self) -> bool {
        match self {
            // 4xx is terminal, 5xx may be transient.
            RequestError::Status { code, .. } => code.is_server_error(),
            RequestError::Reqwest(_) => true,
        }
    }
}

/// What [`fetch_to_file`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The target already existed and verified against the manifest.
    Skipped,
    /// The file was downloaded (or resumed) and verified.
    Downloaded,
}

/// Downloads a file from the given URL into a `String`.
///
/// # Errors
/// Returns an error if:
/// - Error sending request
/// - Request is rejected (HTTP status code)
pub async fn download_file_to_string(url: &str) -> Result<String, RequestError> {
    async fn inner(url: &str) -> Result<String, RequestError> {
        let response = CLIENT.get(url).send().await?;
        if response.status().is_success() {
            Ok(response.text().await?)
        } else {
            Err(RequestError::Status {
                code: response.status(),
                url: response.url().clone(),
            })
        }
    }

    retry(|| inner(url)).await
}

/// Downloads a file from the given URL into a `Vec<u8>`.
///
/// # Errors
/// Returns an error if:
/// - Error sending request
/// - Request is rejected (HTTP status code)
pub async fn download_file_to_bytes(url: &str) -> Result<Vec<u8>, RequestError> {
    async fn inner(url: &str) -> Result<Vec<u8>, RequestError> {
        let response = CLIENT.get(url).send().await?;
        if response.status().is_success() {
            Ok(response.bytes().await?.to_vec())
        } else {
            Err(RequestError::Status {
                code: response.status(),
                url: response.url().clone(),
            })
        }
    }

    retry(|| inner(url)).await
}

/// Downloads a file from the given URL and parses it into anything
/// implementing `serde::Deserialize`.
///
/// # Errors
/// Returns an error if:
/// - Error sending request
/// - Request is rejected (HTTP status code)
/// - The response is not valid JSON for `T`
pub async fn download_file_to_json<T: DeserializeOwned>(
    url: &str,
) -> Result<T, JsonDownloadError> {
    let text = download_file_to_string(url).await?;
    Ok(serde_json::from_str(&text).json(text)?)
}

/// Resolves a remote artifact to a verified local file.
///
/// If `target` already exists and its SHA-1 matches `expected_sha1`
/// (or, when no hash is known, its size matches `expected_size`),
/// nothing is downloaded. Otherwise the body is streamed into
/// `<target>.partial` while being hashed, then atomically renamed into
/// place. A partial file left over from an interrupted run is resumed
/// with an HTTP `Range` request when the server supports it.
///
/// Transient network errors are retried with exponential backoff.
/// A hash mismatch after download deletes the file and refetches once;
/// a second mismatch is fatal.
///
/// # Errors
/// - [`FetchError::Request`] after retries are exhausted
/// - [`FetchError::HashMismatch`] on persistent corruption
/// - [`FetchError::Io`] on filesystem failures
pub async fn fetch_to_file(
    url: &str,
    target: &Path,
    expected_sha1: Option<&str>,
    expected_size: Option<u64>,
) -> Result<FetchOutcome, FetchError> {
    if target_is_valid(target, expected_sha1, expected_size).await? {
        return Ok(FetchOutcome::Skipped);
    }

    let partial = partial_path(target);
    if let Some(parent) = target.parent() {
        if !parent.is_dir() {
            tokio::fs::create_dir_all(parent).await.path(parent)?;
        }
    }

    let mut hash_retried = false;
    loop {
        let result = retry(|| download_once(url, target, &partial, expected_sha1)).await;
        match result {
            Ok(()) => return Ok(FetchOutcome::Downloaded),
            Err(FetchError::HashMismatch { .. }) if !hash_retried => {
                hash_retried = true;
                if partial.exists() {
                    tokio::fs::remove_file(&partial).await.path(&partial)?;
                }
            }
            Err(err) => return Err(err),
        }
    }
}

async fn target_is_valid(
    target: &Path,
    expected_sha1: Option<&str>,
    expected_size: Option<u64>,
) -> Result<bool, FetchError> {
    let Ok(metadata) = tokio::fs::metadata(target).await else {
        return Ok(false);
    };
    if !metadata.is_file() {
        return Ok(false);
    }
    if let Some(expected) = expected_sha1 {
        let actual = sha1_of_file(target).await?;
        return Ok(actual.eq_ignore_ascii_case(expected));
    }
    if let Some(size) = expected_size {
        return Ok(metadata.len() == size);
    }
    Ok(true)
}

async fn download_once(
    url: &str,
    target: &Path,
    partial: &Path,
    expected_sha1: Option<&str>,
) -> Result<(), FetchError> {
    let resume_from = match tokio::fs::metadata(partial).await {
        Ok(metadata) if metadata.len() > 0 => Some(metadata.len()),
        _ => None,
    };

    let mut request = CLIENT.get(url);
    if let Some(offset) = resume_from {
        request = request.header(reqwest::header::RANGE, format!("bytes={offset}-"));
    }
    let response = request.send().await.map_err(RequestError::Reqwest)?;

    let status = response.status();
    if !status.is_success() {
        return Err(RequestError::Status {
            code: status,
            url: response.url().clone(),
        }
        .into());
    }

    let mut hasher = Sha1::new();
    let mut file = if resume_from.is_some() && status == reqwest::StatusCode::PARTIAL_CONTENT {
        // The server honoured the range; hash the prefix we already have.
        let existing = tokio::fs::read(partial).await.path(partial)?;
        hasher.update(&existing);
        tokio::fs::OpenOptions::new()
            .append(true)
            .open(partial)
            .await
            .path(partial)?
    } else {
        tokio::fs::File::create(partial).await.path(partial)?
    };

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(RequestError::Reqwest)?;
        hasher.update(&chunk);
        file.write_all(&chunk).await.path(partial)?;
    }
    file.flush().await.path(partial)?;
    drop(file);

    if let Some(expected) = expected_sha1 {
        let actual = hex_string(&hasher.finalize());
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(FetchError::HashMismatch {
                path: target.to_owned(),
                expected: expected.to_owned(),
                actual,
            });
        }
    }

    tokio::fs::rename(partial, target).await.path(target)?;
    Ok(())
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".partial");
    target.with_file_name(name)
}

/// Streams a file through SHA-1 and returns the lowercase hex digest.
///
/// # Errors
/// - the file does not exist or can't be read
pub async fn sha1_of_file(path: &Path) -> Result<String, IoError> {
    let bytes = tokio::fs::read(path).await.path(path)?;
    let mut hasher = Sha1::new();
    hasher.update(&bytes);
    Ok(hex_string(&hasher.finalize()))
}

pub(crate) fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().fold(String::new(), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

/// Sets the executable bit on a file (rwxr-xr-x).
///
/// # Errors
/// Returns an error if:
/// - the file does not exist
/// - the user doesn't have permission to change the file metadata
#[cfg(target_family = "unix")]
pub async fn set_executable(path: &Path) -> Result<(), IoError> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = tokio::fs::metadata(path).await.path(path)?.permissions();
    perms.set_mode(0o755);
    tokio::fs::set_permissions(path, perms).await.path(path)
}

#[cfg(not(target_family = "unix"))]
pub async fn set_executable(_path: &Path) -> Result<(), IoError> {
    Ok(())
}

/// Creates a symbolic link at `link` pointing to `original`,
/// falling back to a plain copy where symlinks are unsupported.
///
/// # Errors
/// - `link` already exists
/// - the user doesn't have permission for `link`
pub async fn symlink_or_copy(original: &Path, link: &Path) -> Result<(), IoError> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(original, link).path(link)
    }

    #[cfg(not(unix))]
    {
        tokio::fs::copy(original, link).await.path(link)?;
        Ok(())
    }
}
