use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Name of the optional settings file looked up in the project directory.
pub const CONFIG_FILE_NAME: &str = "relink.json5";

/// Settings for the coordination layer. Every field has a default, so a
/// missing or empty settings file yields a working configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Name or path of the version-control binary to invoke.
    #[serde(default = "default_vcs_binary")]
    pub vcs_binary: String,

    /// Mount prefix that logical asset ids are rooted under, e.g. `/Game`.
    #[serde(default = "default_content_mount")]
    pub content_mount: String,

    /// File extensions (without the leading dot) recognized as assets when
    /// scanning the content root or resolving changed files.
    #[serde(default = "default_asset_extensions")]
    pub asset_extensions: Vec<String>,

    /// Message attached to stashes created before a sync, so they can be
    /// told apart from stashes the user made themselves.
    #[serde(default = "default_stash_tag")]
    pub stash_tag: String,
}

fn default_vcs_binary() -> String {
    "git".to_owned()
}

fn default_content_mount() -> String {
    "/Game".to_owned()
}

fn default_asset_extensions() -> Vec<String> {
    vec!["uasset".to_owned(), "umap".to_owned()]
}

fn default_stash_tag() -> String {
    "relink: pre-sync stash".to_owned()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vcs_binary: default_vcs_binary(),
            content_mount: default_content_mount(),
            asset_extensions: default_asset_extensions(),
            stash_tag: default_stash_tag(),
        }
    }
}

impl Config {
    /// Loads settings from the given JSON5 file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            fs_err::read_to_string(path).map_err(|source| ConfigError::Read { source })?;

        json5::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Loads `relink.json5` from the given directory, falling back to
    /// defaults if the file does not exist. Parse errors are still reported.
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            log::debug!("No {} found, using default settings", CONFIG_FILE_NAME);
            return Ok(Self::default());
        }
        Self::load(&path)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read settings file")]
    Read {
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings file {path}")]
    Parse {
        path: String,
        #[source]
        source: json5::Error,
    },
}
