use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use thiserror::Error;

use crate::config::Config;

/// Stable, engine-level identifier for an asset, derived from its path under
/// the content root. Ids look like `/Game/Maps/Arena` — mount-prefixed,
/// slash-separated, extension stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(Arc<str>);

impl AssetId {
    #[inline]
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The directory that asset files live under, plus the rules for mapping
/// file paths to [`AssetId`]s and back.
///
/// The mapping is total and injective for valid asset files as long as each
/// logical asset is stored under exactly one recognized extension, which the
/// engine's save path guarantees.
#[derive(Debug, Clone)]
pub struct ContentRoot {
    root: PathBuf,
    mount: String,
    extensions: Vec<String>,
}

impl ContentRoot {
    pub fn new(root: PathBuf, config: &Config) -> Self {
        Self {
            root,
            mount: config.content_mount.clone(),
            extensions: config.asset_extensions.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the path has a recognized asset extension.
    pub fn is_asset_file(&self, path: &Path) -> bool {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => self.extensions.iter().any(|known| known == ext),
            None => false,
        }
    }

    /// Converts an absolute file path to its logical asset id.
    pub fn id_for_path(&self, path: &Path) -> Result<AssetId, AssetIdError> {
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| AssetIdError::NotUnderContentRoot {
                path: path.to_path_buf(),
            })?;

        if !self.is_asset_file(path) {
            return Err(AssetIdError::UnrecognizedExtension {
                path: path.to_path_buf(),
            });
        }

        let mut id = self.mount.clone();
        let without_extension = relative.with_extension("");
        for component in without_extension.components() {
            let part = component
                .as_os_str()
                .to_str()
                .ok_or_else(|| AssetIdError::NonUnicodePath {
                    path: path.to_path_buf(),
                })?;
            id.push('/');
            id.push_str(part);
        }

        Ok(AssetId::new(id))
    }

    /// Converts a logical asset id back to a file path, given the extension
    /// the asset is stored under.
    pub fn path_for_id(&self, id: &AssetId, extension: &str) -> Result<PathBuf, AssetIdError> {
        let remainder = id
            .as_str()
            .strip_prefix(&self.mount)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| AssetIdError::MountMismatch {
                id: id.clone(),
                mount: self.mount.clone(),
            })?;

        let mut path = self.root.clone();
        let mut parts = remainder.split('/').peekable();
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                path.push(part);
            } else {
                // The extension is appended rather than set, since asset
                // names may themselves contain dots.
                path.push(format!("{}.{}", part, extension));
            }
        }
        Ok(path)
    }
}

#[derive(Debug, Error)]
pub enum AssetIdError {
    #[error("{path} is not under the content root")]
    NotUnderContentRoot { path: PathBuf },

    #[error("{path} does not have a recognized asset extension")]
    UnrecognizedExtension { path: PathBuf },

    #[error("{path} is not valid unicode and cannot name an asset")]
    NonUnicodePath { path: PathBuf },

    #[error("asset id {id} is not rooted under mount {mount}")]
    MountMismatch { id: AssetId, mount: String },
}
