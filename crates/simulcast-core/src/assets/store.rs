//! Cue storage backends
//!
//! A store turns a manifest name into a location once, then reads the raw
//! bytes of that location on the loader thread.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::{AssetError, AssetResult};

/// Where the bytes of a cue live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLocation {
    Url(String),
    Path(PathBuf),
}

impl std::fmt::Display for AssetLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetLocation::Url(url) => write!(f, "{}", url),
            AssetLocation::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Asset storage boundary
pub trait AssetStore: Send + Sync {
    /// Resolve a cue name to a fetchable location
    fn locate(&self, name: &str) -> AssetLocation;

    /// Read the encoded bytes at a location
    fn read(&self, location: &AssetLocation) -> AssetResult<Vec<u8>>;
}

/// Reads a location of either kind
///
/// Shared by both stores so a manifest resolved against one can still be
/// read if it mixes locations.
fn read_location(location: &AssetLocation, timeout: Duration) -> AssetResult<Vec<u8>> {
    match location {
        AssetLocation::Path(path) => std::fs::read(path).map_err(|e| AssetError::Io {
            path: path.clone(),
            source: e,
        }),
        AssetLocation::Url(url) => {
            let response = ureq::get(url)
                .timeout(timeout)
                .call()
                .map_err(|e| AssetError::Http {
                    url: url.clone(),
                    message: e.to_string(),
                })?;

            let mut bytes = Vec::new();
            response
                .into_reader()
                .read_to_end(&mut bytes)
                .map_err(|e| AssetError::Http {
                    url: url.clone(),
                    message: e.to_string(),
                })?;
            Ok(bytes)
        }
    }
}

/// Cues served over HTTP under a base URL
#[derive(Debug, Clone)]
pub struct HttpAssetStore {
    base_url: String,
    timeout: Duration,
}

impl HttpAssetStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, timeout }
    }
}

impl AssetStore for HttpAssetStore {
    fn locate(&self, name: &str) -> AssetLocation {
        AssetLocation::Url(format!("{}/{}", self.base_url, name))
    }

    fn read(&self, location: &AssetLocation) -> AssetResult<Vec<u8>> {
        read_location(location, self.timeout)
    }
}

/// Cues in a local directory
#[derive(Debug, Clone)]
pub struct DirAssetStore {
    root: PathBuf,
}

impl DirAssetStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetStore for DirAssetStore {
    fn locate(&self, name: &str) -> AssetLocation {
        AssetLocation::Path(self.root.join(name))
    }

    fn read(&self, location: &AssetLocation) -> AssetResult<Vec<u8>> {
        read_location(location, Duration::from_secs(30))
    }
}
