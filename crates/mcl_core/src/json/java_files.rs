use std::collections::BTreeMap;

use serde::Deserialize;

/// Per-component runtime file manifest: every file, directory and link
/// of one Java installation.
#[derive(Deserialize, Debug)]
pub struct JavaFilesJson {
    pub files: BTreeMap<String, JavaFile>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
#[allow(non_camel_case_types)]
pub enum JavaFile {
    file {
        downloads: JavaFileDownload,
        #[serde(default)]
        executable: bool,
    },
    directory {},
    link {
        target: String,
    },
}

#[derive(Deserialize, Debug)]
pub struct JavaFileDownload {
    pub raw: JavaFileDownloadDetails,
}

#[derive(Deserialize, Debug)]
pub struct JavaFileDownloadDetails {
    pub sha1: Option<String>,
    pub size: Option<u64>,
    pub url: String,
}
