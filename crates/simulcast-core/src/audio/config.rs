//! Audio backend configuration
//!
//! Device selection and stream settings for the cue output.

use serde::{Deserialize, Serialize};

/// Maximum buffer size to pre-allocate (frames)
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Default buffer size when no preference is specified (frames)
///
/// Cue playback is scheduled seconds ahead, so latency barely matters; 512
/// frames works on most systems.
pub const DEFAULT_BUFFER_SIZE: u32 = 512;

/// Default sample rate for the output stream (48kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Preferred buffer size for the output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BufferSize {
    #[default]
    Default,
    /// Request a specific buffer size in frames (clamped to 64..=MAX_BUFFER_SIZE)
    Fixed(u32),
}

impl BufferSize {
    /// Buffer size in frames to request from the device
    pub fn frames(&self) -> u32 {
        match self {
            BufferSize::Default => DEFAULT_BUFFER_SIZE,
            BufferSize::Fixed(frames) => (*frames).clamp(64, MAX_BUFFER_SIZE as u32),
        }
    }

    /// Latency in milliseconds for a given sample rate
    pub fn latency_ms(&self, sample_rate: u32) -> f32 {
        (self.frames() as f32 / sample_rate as f32) * 1000.0
    }
}

/// Audio device identifier
///
/// Includes both the device name and the host backend (ALSA, PipeWire, ...)
/// so a device can be picked from a specific host when several are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    /// Device name as reported by the system
    pub name: String,
    /// Audio host identifier (e.g. "ALSA", "CoreAudio"); None searches all hosts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DeviceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }

    pub fn with_host(name: &str, host: &str) -> Self {
        Self {
            name: name.to_string(),
            host: Some(host.to_string()),
        }
    }

    /// Display label that includes the host if available
    pub fn display_label(&self) -> String {
        match &self.host {
            Some(host) => format!("[{}] {}", host, self.name),
            None => self.name.clone(),
        }
    }
}

/// Configuration for the cue output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device (None = system default)
    pub device: Option<DeviceId>,

    /// Preferred buffer size
    pub buffer_size: BufferSize,

    /// Preferred sample rate (None = 48kHz, or the device maximum if unsupported)
    pub sample_rate: Option<u32>,
}

impl AudioConfig {
    pub fn with_device(mut self, device: DeviceId) -> Self {
        self.device = Some(device);
        self
    }

    pub fn with_buffer_frames(mut self, frames: u32) -> Self {
        self.buffer_size = BufferSize::Fixed(frames);
        self
    }

    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = Some(rate);
        self
    }
}
