//! Audio output errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No audio output devices found")]
    NoDevices,

    #[error("No default audio output device")]
    NoDefaultDevice,

    /// The device named in the config is not present
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to query device configs: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("Device has no usable output configuration")]
    NoUsableConfig,

    #[error("Failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

pub type AudioResult<T> = Result<T, AudioError>;
