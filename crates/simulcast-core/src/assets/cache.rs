//! Decoded cue cache
//!
//! Maps a cue filename to its decoded buffer. Decoding is lazy and happens on
//! the [`AssetLoader`] thread; entries are never evicted. A cue that fails to
//! load is remembered and never requested again.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use basedrop::Shared;

use super::decode::DecodedAudio;
use super::error::AssetError;
use super::loader::{AssetLoader, LoadRequest, LoadResult};
use super::manifest::ResolvedManifest;
use super::store::AssetStore;
use crate::audio::gc_handle;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Cues ready to play
    pub cached: usize,
    /// Cues queued or being decoded
    pub in_flight: usize,
    /// Cues that will never be available
    pub failed: usize,
    /// Successful decodes since startup
    pub decoded: u64,
}

pub struct AssetCache {
    manifest: ResolvedManifest,
    loader: AssetLoader,
    buffers: HashMap<String, Shared<DecodedAudio>>,
    in_flight: HashSet<String>,
    failed: HashSet<String>,
    decoded: u64,
}

impl AssetCache {
    /// Resolve the manifest against `store` and start the loader
    pub fn new(store: Arc<dyn AssetStore>) -> std::io::Result<Self> {
        let manifest = ResolvedManifest::resolve(store.as_ref());
        Self::with_manifest(store, manifest)
    }

    pub fn with_manifest(
        store: Arc<dyn AssetStore>,
        manifest: ResolvedManifest,
    ) -> std::io::Result<Self> {
        Ok(Self {
            manifest,
            loader: AssetLoader::spawn(store)?,
            buffers: HashMap::new(),
            in_flight: HashSet::new(),
            failed: HashSet::new(),
            decoded: 0,
        })
    }

    /// Queue a decode for every name not cached, in flight or failed
    ///
    /// Returns how many decodes were queued.
    pub fn ensure<I, S>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut queued = 0;
        for name in names {
            let name = name.as_ref();
            if self.buffers.contains_key(name)
                || self.in_flight.contains(name)
                || self.failed.contains(name)
            {
                continue;
            }

            let Some(location) = self.manifest.location(name) else {
                self.mark_failed(name, &AssetError::NotInManifest(name.to_string()));
                continue;
            };

            let request = LoadRequest {
                name: name.to_string(),
                location: location.clone(),
            };
            if self.loader.request(request) {
                self.in_flight.insert(name.to_string());
                queued += 1;
            } else {
                log::error!("Asset loader is gone, cannot load {}", name);
            }
        }
        queued
    }

    /// Drain finished loads; returns how many were applied
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Some(result) = self.loader.try_recv() {
            self.apply(result);
            applied += 1;
        }
        applied
    }

    /// Ensure `names` and wait until each of them is cached or failed
    ///
    /// Returns false if the timeout elapsed first.
    pub fn ensure_blocking<I, S>(&mut self, names: I, timeout: Duration) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names.into_iter().map(|n| n.as_ref().to_string()).collect();
        self.ensure(&names);
        self.poll();

        let deadline = Instant::now() + timeout;
        while names.iter().any(|n| self.in_flight.contains(n)) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.loader.recv_timeout(remaining) {
                Some(result) => self.apply(result),
                None => return !names.iter().any(|n| self.in_flight.contains(n)),
            }
        }
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.buffers.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Shared<DecodedAudio>> {
        self.buffers.get(name).cloned()
    }

    pub fn is_failed(&self, name: &str) -> bool {
        self.failed.contains(name)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            cached: self.buffers.len(),
            in_flight: self.in_flight.len(),
            failed: self.failed.len(),
            decoded: self.decoded,
        }
    }

    /// Cache with an empty manifest, filled through `insert_decoded`
    #[cfg(test)]
    pub(crate) fn preloaded(cues: &[(&str, DecodedAudio)]) -> Self {
        use super::store::DirAssetStore;

        let store: Arc<dyn AssetStore> = Arc::new(DirAssetStore::new(std::env::temp_dir()));
        let manifest = ResolvedManifest::resolve_names(store.as_ref(), std::iter::empty());
        let mut cache = Self::with_manifest(store, manifest).expect("spawn asset loader");
        for (name, audio) in cues {
            cache.insert_decoded(name, audio.clone());
        }
        cache
    }

    #[cfg(test)]
    pub(crate) fn insert_decoded(&mut self, name: &str, audio: DecodedAudio) {
        self.buffers
            .insert(name.to_string(), Shared::new(&gc_handle(), audio));
    }

    fn apply(&mut self, LoadResult { name, result }: LoadResult) {
        self.in_flight.remove(&name);
        match result {
            Ok(audio) => {
                self.decoded += 1;
                self.buffers.insert(name, Shared::new(&gc_handle(), audio));
            }
            Err(e) => self.mark_failed(&name, &e),
        }
    }

    fn mark_failed(&mut self, name: &str, error: &AssetError) {
        log::warn!("Cue {} unavailable: {}", name, error);
        self.failed.insert(name.to_string());
    }
}
