//! Cue decoding via symphonia
//!
//! Turns the encoded bytes of a cue (m4a/AAC, WAV, ...) into interleaved f32
//! frames. Cues are short, so the whole file is decoded in one go.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::error::{AssetError, AssetResult};

/// A fully decoded cue
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Interleaved samples
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels: channels.max(1),
        }
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_mono(&self) -> bool {
        self.channels == 1
    }

    /// Left/right pair of one frame; mono is duplicated, extra channels ignored
    #[inline]
    pub fn frame(&self, index: usize) -> (f32, f32) {
        let channels = self.channels as usize;
        let base = index * channels;
        match self.samples.get(base..base + channels) {
            Some(frame) if channels == 1 => (frame[0], frame[0]),
            Some(frame) => (frame[0], frame[1]),
            None => (0.0, 0.0),
        }
    }
}

/// Decode an in-memory cue
///
/// `extension` is a probe hint (e.g. "m4a"); the container is still sniffed
/// when it is missing or wrong.
pub fn decode_bytes(bytes: Vec<u8>, extension: Option<&str>) -> AssetResult<DecodedAudio> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AssetError::UnsupportedFormat(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AssetError::UnsupportedFormat("No audio track found".to_string()))?;

    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AssetError::UnsupportedFormat("Unknown sample rate".to_string()))?;

    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AssetError::UnsupportedFormat(e.to_string()))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                log::warn!("Error reading packet: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                log::warn!("Error decoding packet: {}", e);
                continue;
            }
            Err(e) => return Err(AssetError::Decode(e.to_string())),
        };

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            // AAC tracks in mp4 often leave the channel layout to the decoder
            if channels == 0 {
                channels = spec.channels.count() as u16;
            }
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }

        if let Some(ref mut buf) = sample_buf {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    if samples.is_empty() {
        return Err(AssetError::Decode("No audio frames decoded".to_string()));
    }

    Ok(DecodedAudio::new(samples, sample_rate, channels))
}

/// Extension of a cue filename, used as the probe hint
pub fn extension_of(name: &str) -> Option<&str> {
    std::path::Path::new(name).extension().and_then(|e| e.to_str())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encode a short 16-bit WAV in memory
    pub(crate) fn wav_bytes(channels: u16, sample_rate: u32, frames: usize) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..frames {
                for ch in 0..channels {
                    let value = if ch == 0 { 8192 } else { -8192 };
                    writer.write_sample((value * (i % 2) as i32) as i16).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_stereo_wav() {
        let audio = decode_bytes(wav_bytes(2, 48000, 480), Some("wav")).unwrap();
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.sample_rate, 48000);
        assert_eq!(audio.frames(), 480);
        assert!((audio.duration_secs() - 0.01).abs() < 1e-9);

        let (left, right) = audio.frame(1);
        assert!((left - 0.25).abs() < 1e-3);
        assert!((right + 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_decode_mono_wav_duplicates_channel() {
        let audio = decode_bytes(wav_bytes(1, 22050, 100), None).unwrap();
        assert!(audio.is_mono());
        let (left, right) = audio.frame(1);
        assert_eq!(left, right);
        assert_eq!(audio.frame(100), (0.0, 0.0));
    }

    #[test]
    fn test_garbage_is_unsupported() {
        let err = decode_bytes(vec![0u8; 64], Some("m4a")).unwrap_err();
        assert!(matches!(err, AssetError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("turn8.m4a"), Some("m4a"));
        assert_eq!(extension_of("noext"), None);
    }
}
