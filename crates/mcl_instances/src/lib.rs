//! Version resolution, artifact fetching and game launching.
//!
//! # Contains
//! - Version graph: loads descriptors and flattens `inheritsFrom` chains
//! - Asset indexer: turns an asset index into a fetch plan
//! - Resolver pool: bounded workers downloading/copying/unpacking artifacts
//! - Natives stager: run-scoped extraction of platform libraries
//! - Argument composer: final JVM + game argument vectors
//! - Launch orchestrator
//! - Version listing and `launcher_profiles.json` writing

pub mod arguments;
pub mod assets;
mod launch;
mod libraries;
mod list_versions;
pub mod natives;
pub mod profiles;
pub mod resolver;
pub mod version_graph;

pub use launch::{launch, GameLaunchError, LaunchOptions};
pub use libraries::{plan_libraries, LibraryPlan};
pub use list_versions::{list_versions, scan_local_versions, ListedVersion};
pub use resolver::{ResolveError, ResolverPool, DEFAULT_WORKERS};
pub use version_graph::{FlatVersion, VersionError, VersionGraph};
