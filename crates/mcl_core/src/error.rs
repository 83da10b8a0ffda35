use std::path::PathBuf;

use thiserror::Error;

use crate::RequestError;

#[derive(Clone, Debug, Error)]
pub enum IoError {
    #[error("at path {path:?}, error: {error}")]
    Io { error: String, path: PathBuf },
    #[error("couldn't read directory {parent:?}, error {error}")]
    ReadDir { error: String, parent: PathBuf },
    #[error("config directory not found")]
    ConfigDirNotFound,
    #[error("archive entry escapes the target directory: {0}")]
    DirEscape(String),
}

pub trait IntoIoError<T> {
    #[allow(clippy::missing_errors_doc)]
    fn path(self, p: impl Into<PathBuf>) -> Result<T, IoError>;
    #[allow(clippy::missing_errors_doc)]
    fn dir(self, p: impl Into<PathBuf>) -> Result<T, IoError>;
}

impl<T> IntoIoError<T> for std::io::Result<T> {
    fn path(self, p: impl Into<PathBuf>) -> Result<T, IoError> {
        self.map_err(|err: std::io::Error| IoError::Io {
            error: err.to_string(),
            path: p.into(),
        })
    }

    fn dir(self, p: impl Into<PathBuf>) -> Result<T, IoError> {
        self.map_err(|err: std::io::Error| IoError::ReadDir {
            error: err.to_string(),
            parent: p.into(),
        })
    }
}

#[derive(Debug, Error)]
pub enum JsonError {
    #[error("while parsing JSON:\n{error}\n\n{json}")]
    From {
        error: serde_json::Error,
        json: String,
    },
    #[error("while converting object to JSON:\n{error}")]
    To { error: serde_json::Error },
}

pub trait IntoJsonError<T> {
    #[allow(clippy::missing_errors_doc)]
    fn json(self, p: String) -> Result<T, JsonError>;
    #[allow(clippy::missing_errors_doc)]
    fn json_to(self) -> Result<T, JsonError>;
}

impl<T> IntoJsonError<T> for Result<T, serde_json::Error> {
    fn json(self, json: String) -> Result<T, JsonError> {
        self.map_err(|error: serde_json::Error| JsonError::From { error, json })
    }

    fn json_to(self) -> Result<T, JsonError> {
        self.map_err(|error: serde_json::Error| JsonError::To { error })
    }
}

#[derive(Debug, Error)]
pub enum JsonDownloadError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Serde(#[from] JsonError),
}

impl From<reqwest::Error> for JsonDownloadError {
    fn from(value: reqwest::Error) -> Self {
        Self::Request(RequestError::Reqwest(value))
    }
}

#[derive(Debug, Error)]
pub enum JsonFileError {
    #[error(transparent)]
    Serde(#[from] JsonError),
    #[error(transparent)]
    Io(#[from] IoError),
}

/// Error while resolving a single artifact to a verified on-disk file.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Io(#[from] IoError),
    #[error("hash mismatch for {path:?}: expected {expected}, got {actual}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

impl crate::Retryable for FetchError {
    fn retryable(&self) -> bool {
        match self {
            FetchError::Request(err) => err.retryable(),
            FetchError::Io(_) | FetchError::HashMismatch { .. } => false,
        }
    }
}
