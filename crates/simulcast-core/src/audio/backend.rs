//! cpal output backend
//!
//! ```text
//! ┌──────────────────┐   push()   ┌─────────────────────┐
//! │  Engine thread   │───────────►│   Command Queue     │
//! │  (AudioSession)  │            │  (lock-free SPSC)   │
//! └──────────────────┘            └──────────┬──────────┘
//!          ▲                                 │ pop()
//!          │ relaxed atomics                 ▼
//! ┌──────────────────┐            ┌─────────────────────┐
//! │    AudioClock    │◄───────────│  cpal audio thread  │
//! │  (frames, state) │  advance   │  (owns VoiceMixer)  │
//! └──────────────────┘            └─────────────────────┘
//! ```

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};

use super::config::{AudioConfig, DEFAULT_SAMPLE_RATE};
use super::device::{find_device_by_id, get_cpal_default_device};
use super::error::{AudioError, AudioResult};
use super::mixer::VoiceMixer;
use super::session::AudioSession;
use crate::types::interleaved;

/// Keeps the output stream alive; drop it to stop audio
///
/// cpal streams are not `Send` on every platform, so this stays on the thread
/// that created it while the [`AudioSession`] goes to the engine.
pub struct AudioOutput {
    _stream: Stream,
    device_name: String,
    sample_rate: u32,
    buffer_size: u32,
}

impl AudioOutput {
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    /// One-way output latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_size as f32 / self.sample_rate as f32) * 1000.0
    }
}

/// Open the configured output device and start streaming
///
/// The session starts suspended and muted; the engine resumes it on the
/// first user enable.
pub fn start_audio_output(config: &AudioConfig) -> AudioResult<(AudioOutput, AudioSession)> {
    let device = match &config.device {
        Some(id) => find_device_by_id(id)?,
        None => get_cpal_default_device()?,
    };

    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    log::info!("Using audio device: {}", device_name);

    let supported_config = get_output_config(&device, config)?;
    let sample_rate = supported_config.sample_rate().0;
    let buffer_size = config.buffer_size.frames();

    let stream_config = StreamConfig {
        channels: supported_config.channels(),
        sample_rate: supported_config.sample_rate(),
        buffer_size: cpal::BufferSize::Fixed(buffer_size),
    };

    log::info!(
        "Audio config: {} channels, {}Hz, {} frames (~{:.1}ms latency)",
        stream_config.channels,
        sample_rate,
        buffer_size,
        config.buffer_size.latency_ms(sample_rate)
    );

    let (session, mixer) = AudioSession::pair(sample_rate);
    let stream = build_output_stream(&device, &stream_config, mixer)?;
    stream.play()?;

    log::info!("Audio stream started");

    Ok((
        AudioOutput {
            _stream: stream,
            device_name,
            sample_rate,
            buffer_size,
        },
        session,
    ))
}

/// Pick the best output configuration for a device
///
/// Prefers f32 stereo at the requested rate, then any stereo configuration,
/// then anything at all.
fn get_output_config(
    device: &cpal::Device,
    config: &AudioConfig,
) -> AudioResult<cpal::SupportedStreamConfig> {
    let supported_configs: Vec<_> = device
        .supported_output_configs()?
        .collect();

    let target_sample_rate = config.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE);

    let best_config = supported_configs
        .iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .filter(|c| c.channels() >= 2)
        .find(|c| {
            target_sample_rate >= c.min_sample_rate().0 && target_sample_rate <= c.max_sample_rate().0
        })
        .or_else(|| supported_configs.iter().find(|c| c.channels() >= 2))
        .or_else(|| supported_configs.first())
        .ok_or(AudioError::NoUsableConfig)?;

    let sample_rate = if target_sample_rate >= best_config.min_sample_rate().0
        && target_sample_rate <= best_config.max_sample_rate().0
    {
        cpal::SampleRate(target_sample_rate)
    } else {
        let fallback = best_config.max_sample_rate();
        log::warn!(
            "Audio device doesn't support {}Hz, falling back to {}Hz (cues will be resampled)",
            target_sample_rate,
            fallback.0
        );
        fallback
    };

    Ok(best_config.clone().with_sample_rate(sample_rate))
}

/// Build the output stream; the callback owns the mixer
fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut mixer: VoiceMixer,
) -> AudioResult<Stream> {
    let channels = config.channels as usize;

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
            let n_frames = data.len() / channels;
            let samples = mixer.process(n_frames);

            if channels == 2 && samples.len() == n_frames {
                data[..n_frames * 2].copy_from_slice(interleaved(samples));
                return;
            }

            for (i, frame) in data.chunks_mut(channels).enumerate() {
                frame.fill(0.0);
                if let Some(sample) = samples.get(i) {
                    frame[0] = sample.left;
                    if channels > 1 {
                        frame[1] = sample.right;
                    }
                }
            }
        },
        move |err| {
            log::error!("Audio stream error: {}", err);
        },
        None,
    )?;
    Ok(stream)
}
