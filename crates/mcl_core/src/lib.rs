//! Core utilities shared between the launcher crates.
//!
//! # Contains
//! - File download / verification primitives
//! - Content store (game root path layout)
//! - Rule evaluator for OS/arch/feature gated entries
//! - Java runtime auto-installer
//! - JSON structs for version descriptors, manifests, asset indexes
//! - Logging macros

mod error;
/// Common utilities for downloading and working with files.
pub mod file_utils;
mod java_install;
/// JSON structs for version descriptors, manifests, asset indexes etc.
pub mod json;
/// Logging macros.
pub mod print;
mod progress;
pub mod rules;
pub mod store;
mod task;

use std::{future::Future, sync::LazyLock, time::Duration};

// Used by the logging macros via `$crate::`, so invoking crates don't
// need their own `colored` dependency.
#[doc(hidden)]
pub use colored;

pub use error::{
    FetchError, IntoIoError, IntoJsonError, IoError, JsonDownloadError, JsonError, JsonFileError,
};
pub use file_utils::{FetchOutcome, RequestError};
pub use java_install::{plan_runtime, JavaInstallError, JavaRuntime};
pub use print::logger_finish;
pub use progress::GenericProgress;
pub use store::GameRoot;
pub use task::FetchTask;

pub const LAUNCHER_NAME: &str = "microcraft-launcher";
pub const LAUNCHER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Java classpath separator of the host platform.
pub const CLASSPATH_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };

/// OS name as spelled in Mojang metadata.
pub const OS_NAME: &str = if cfg!(target_os = "windows") {
    "windows"
} else if cfg!(target_os = "macos") {
    "osx"
} else {
    "linux"
};

/// Architecture name as spelled in Mojang metadata.
pub const ARCH_NAME: &str = if cfg!(target_arch = "x86") {
    "x86"
} else if cfg!(target_arch = "aarch64") {
    "arm64"
} else {
    "x86_64"
};

/// Shared HTTP client. Connect/read timeouts apply per request,
/// not per artifact.
pub static CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(240))
        .user_agent(concat!("microcraft-launcher/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
});

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Errors that may be worth another download attempt.
pub(crate) trait Retryable {
    fn retryable(&self) -> bool;
}

/// Retries a fallible async operation up to [`RETRY_ATTEMPTS`] times
/// with exponential backoff, starting at [`RETRY_BASE_DELAY`].
///
/// Only errors whose [`Retryable::retryable`] returns true are retried;
/// anything else (HTTP 4xx, hash mismatches, local IO) fails immediately.
pub(crate) async fn retry<T, E, Fut, F>(mut f: F) -> Result<T, E>
where
    E: Retryable,
    Fut: Future<Output = Result<T, E>>,
    F: FnMut() -> Fut,
{
    let mut delay = RETRY_BASE_DELAY;
    let mut attempt = 1;
    loop {
        match f().await {
            Ok(n) => return Ok(n),
            Err(err) if attempt < RETRY_ATTEMPTS && err.retryable() => {
                attempt += 1;
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(err) => return Err(err),
        }
    }
}
