//! Simulcast configuration
//!
//! One YAML file with a section per concern. Every field has a default, so
//! a partial file (or none at all) is always valid.
//!
//! ```yaml
//! endpoint:
//!   url: http://localhost:3000/getSimulcast
//!   sleep: { start_hour: 0, end_hour: 7 }
//! assets:
//!   directory: /srv/simulcast/audio
//! audio:
//!   buffer_size: !Fixed 1024
//! ```

mod io;
mod paths;

pub use io::{load_config, save_config};
pub use paths::{config_dir, default_config_path};

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::assets::{AssetStore, DirAssetStore, HttpAssetStore};
use crate::audio::AudioConfig;
use crate::engine::EngineSettings;
use crate::fetch::{HttpTurnSource, SleepWindow};
use crate::types::{
    CHUNK_SIZE, OUTPUT_GAIN_ON, SETTLE_DELAY_MS, TURN_DELAY_MS, TURN_INTERVAL_SECS,
    VOICE_LIFETIME_MS,
};

pub const DEFAULT_ENDPOINT_URL: &str = "http://localhost:3000/getSimulcast";
pub const DEFAULT_ASSET_BASE_URL: &str = "http://localhost:3000/audio/";

/// Remote turn endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub url: String,
    pub timeout_secs: u64,
    /// Daily off-hours window sent with every request
    pub sleep: SleepWindow,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT_URL.to_string(),
            timeout_secs: 10,
            sleep: SleepWindow::default(),
        }
    }
}

/// Where cue files come from
///
/// A local `directory` wins over `base_url` when both are set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub base_url: String,
    pub directory: Option<std::path::PathBuf>,
    pub timeout_secs: u64,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ASSET_BASE_URL.to_string(),
            directory: None,
            timeout_secs: 30,
        }
    }
}

impl AssetsConfig {
    pub fn store(&self) -> Arc<dyn AssetStore> {
        match &self.directory {
            Some(dir) => {
                log::info!("Cues from directory {:?}", dir);
                Arc::new(DirAssetStore::new(dir))
            }
            None => {
                log::info!("Cues from {}", self.base_url);
                Arc::new(HttpAssetStore::new(
                    self.base_url.clone(),
                    Duration::from_secs(self.timeout_secs),
                ))
            }
        }
    }
}

/// Cadence and cue timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub turn_interval_secs: f64,
    pub chunk_size: u32,
    pub turn_delay_ms: u32,
    pub settle_delay_ms: u32,
    pub voice_lifetime_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            turn_interval_secs: TURN_INTERVAL_SECS,
            chunk_size: CHUNK_SIZE,
            turn_delay_ms: TURN_DELAY_MS,
            settle_delay_ms: SETTLE_DELAY_MS,
            voice_lifetime_ms: VOICE_LIFETIME_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulcastConfig {
    pub endpoint: EndpointConfig,
    pub assets: AssetsConfig,
    pub timing: TimingConfig,
    pub audio: AudioConfig,
    /// Master gain while audio is on
    pub output_gain: f32,
}

impl Default for SimulcastConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::default(),
            assets: AssetsConfig::default(),
            timing: TimingConfig::default(),
            audio: AudioConfig::default(),
            output_gain: OUTPUT_GAIN_ON,
        }
    }
}

impl SimulcastConfig {
    pub fn engine_settings(&self) -> EngineSettings {
        let interval = if self.timing.turn_interval_secs.is_finite() && self.timing.turn_interval_secs > 0.0 {
            self.timing.turn_interval_secs
        } else {
            log::warn!(
                "Invalid turn interval {}, using {}",
                self.timing.turn_interval_secs,
                TURN_INTERVAL_SECS
            );
            TURN_INTERVAL_SECS
        };

        EngineSettings {
            turn_interval: Duration::from_secs_f64(interval),
            chunk_size: self.timing.chunk_size.max(1),
            turn_delay_ms: self.timing.turn_delay_ms,
            settle_delay_ms: self.timing.settle_delay_ms,
            voice_lifetime: Duration::from_millis(self.timing.voice_lifetime_ms as u64),
            output_gain: self.output_gain.clamp(0.0, 1.0),
            sleep: self.endpoint.sleep,
        }
    }

    pub fn turn_source(&self) -> HttpTurnSource {
        HttpTurnSource::new(
            self.endpoint.url.clone(),
            Duration::from_secs(self.endpoint.timeout_secs),
        )
    }
}
