//! The launcher's JSON configuration file. Every key mirrors a CLI
//! flag; the CLI wins per key, `env_variables` merge with the CLI
//! winning on collisions, and arg lists concatenate config-first.

use std::{collections::BTreeMap, path::Path};

use mcl_core::{IntoIoError, IntoJsonError, IoError, JsonError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE_DEFAULT: &str = ".microcraft-launcher.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unreadable config: {0}")]
    Io(#[from] IoError),
    #[error("malformed config: {0}")]
    Malformed(#[from] JsonError),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isolate_profile: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_access_token: Option<String>,
    /// `msa`, `legacy` or `mojang`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java_path: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env_variables: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub jvm_args: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub game_args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolver_processes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_profiles: Option<bool>,
    /// Command to shell-exec in the game dir before launching.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_before: Option<String>,
    /// Java major version for a `java ...` run_before command.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_before_java: Option<u32>,
    /// Glob patterns removed before launching.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub delete_files: Vec<String>,
    /// Extra feature flags for rule evaluation.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, bool>,
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

impl Config {
    /// Loads the config file; a missing file is an empty config.
    ///
    /// # Errors
    /// [`ConfigError`] on unreadable or malformed JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path).path(path)?;
        Ok(serde_json::from_str::<Config>(&json).json(json)?)
    }

    /// Saves the config back, preserving unknown keys.
    ///
    /// # Errors
    /// [`ConfigError`] on serialization or write failure.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self).json_to()?;
        std::fs::write(path, json).path(path)?;
        Ok(())
    }
}

/// Splits `KEY=VALUE` pairs from the command line; a later value for
/// the same key wins.
#[must_use]
pub fn key_value_pairs(pairs: &[String]) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for pair in pairs {
        match pair.split_once('=') {
            Some((key, value)) => out.insert(key.trim().to_owned(), value.to_owned()),
            None => out.insert(pair.trim().to_owned(), String::new()),
        };
    }
    out
}
