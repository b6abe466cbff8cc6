//! The fixed cue manifest
//!
//! Every cue the scheduler can ever reference. Names outside this list are
//! rejected by the cache without touching storage.

use std::collections::HashMap;

use super::store::{AssetLocation, AssetStore};
use crate::schedule::{bass_file, beep_file, numeric_file, rotation_file, voice_file, IPA_TABLE};

/// Number of entries in [`manifest`]
pub const MANIFEST_LEN: usize = 68;

/// Bass and beep cues exist for selectors 1..=4
const TONE_VARIANTS: i32 = 4;

/// Numeric cues exist for magnitudes 0..=16
const NUMERIC_MAGNITUDES: i32 = 16;

/// All cue filenames in manifest order
pub fn manifest() -> Vec<String> {
    let mut names = Vec::with_capacity(MANIFEST_LEN);
    names.extend((1..=TONE_VARIANTS).map(bass_file));
    names.extend((1..=TONE_VARIANTS).map(beep_file));
    names.extend(IPA_TABLE.iter().map(|word| voice_file(word)));
    for magnitude in 0..=NUMERIC_MAGNITUDES {
        names.push(numeric_file(magnitude + 1));
        names.push(numeric_file(-(magnitude + 1)));
    }
    names.extend((1..=8).map(rotation_file));
    names.push(rotation_file(10));
    names
}

/// Manifest entries resolved to fetchable locations
///
/// Resolution happens once at startup; afterwards lookups never touch the
/// store.
#[derive(Debug, Clone, Default)]
pub struct ResolvedManifest {
    locations: HashMap<String, AssetLocation>,
}

impl ResolvedManifest {
    /// Resolve every manifest entry against a store
    pub fn resolve(store: &dyn AssetStore) -> Self {
        Self::resolve_names(store, manifest())
    }

    pub fn resolve_names(store: &dyn AssetStore, names: impl IntoIterator<Item = String>) -> Self {
        let locations: HashMap<String, AssetLocation> = names
            .into_iter()
            .map(|name| {
                let location = store.locate(&name);
                (name, location)
            })
            .collect();
        log::info!("Resolved {} cue locations", locations.len());
        Self { locations }
    }

    pub fn location(&self, name: &str) -> Option<&AssetLocation> {
        self.locations.get(name)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
