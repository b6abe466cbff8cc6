//! Cue assets: manifest, storage, decoding and the decoded-buffer cache

mod cache;
mod decode;
mod error;
mod loader;
mod manifest;
mod store;

pub use cache::{AssetCache, CacheStats};
pub use decode::{decode_bytes, DecodedAudio};
pub use error::{AssetError, AssetResult};
pub use loader::{AssetLoader, LoadRequest, LoadResult};
pub use manifest::{manifest, ResolvedManifest, MANIFEST_LEN};
pub use store::{AssetLocation, AssetStore, DirAssetStore, HttpAssetStore};
