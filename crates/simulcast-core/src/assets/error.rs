//! Asset loading error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving, reading or decoding a cue
#[derive(Error, Debug)]
pub enum AssetError {
    /// The name is not part of the cue manifest
    #[error("Asset not in manifest: {0}")]
    NotInManifest(String),

    /// Failed to read a local asset file
    #[error("Failed to read asset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to download an asset
    #[error("Failed to download asset from {url}: {message}")]
    Http { url: String, message: String },

    /// The container was recognized but decoding failed
    #[error("Failed to decode asset: {0}")]
    Decode(String),

    /// Unknown container or codec
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),
}

/// Result type for asset operations
pub type AssetResult<T> = Result<T, AssetError>;
