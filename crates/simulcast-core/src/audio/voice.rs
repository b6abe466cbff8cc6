//! A single playing cue inside the mixer

use std::f32::consts::FRAC_PI_2;

use basedrop::Shared;

use super::command::{VoiceId, VoiceSpec};
use crate::assets::DecodedAudio;
use crate::types::StereoSample;

/// Equal-power stereo panner
///
/// Mono sources are spread across both channels; stereo sources keep their
/// own image and have the opposite channel folded in. A pan of exactly 0
/// bypasses the stage and returns the input unchanged.
#[inline]
pub fn apply_pan(left: f32, right: f32, mono: bool, pan: f32) -> (f32, f32) {
    if pan == 0.0 {
        return (left, right);
    }
    let pan = pan.clamp(-1.0, 1.0);

    if mono {
        let x = (pan + 1.0) * 0.5;
        let (gain_l, gain_r) = ((x * FRAC_PI_2).cos(), (x * FRAC_PI_2).sin());
        return (left * gain_l, left * gain_r);
    }

    if pan <= 0.0 {
        let x = pan + 1.0;
        let (gain_l, gain_r) = ((x * FRAC_PI_2).cos(), (x * FRAC_PI_2).sin());
        (left + right * gain_l, right * gain_r)
    } else {
        let (gain_l, gain_r) = ((pan * FRAC_PI_2).cos(), (pan * FRAC_PI_2).sin());
        (left * gain_l, right + left * gain_r)
    }
}

/// A scheduled cue, owned by the audio thread
pub struct Voice {
    id: VoiceId,
    buffer: Shared<DecodedAudio>,
    start_frame: u64,
    release_frame: u64,
    /// Read position in source frames
    position: f64,
    /// Source frames per output frame
    step: f64,
    pan: f32,
    gain: f32,
}

impl Voice {
    /// Place a voice on an output clock running at `output_rate`
    pub fn from_spec(spec: VoiceSpec, output_rate: u32) -> Self {
        let rate = output_rate.max(1) as f64;
        let start_frame = (spec.start_at.max(0.0) * rate).round() as u64;
        let release_frame = (spec.release_at.max(0.0) * rate).round() as u64;
        let step = spec.buffer.sample_rate as f64 / rate;

        Self {
            id: spec.id,
            buffer: spec.buffer,
            start_frame,
            release_frame,
            position: 0.0,
            step,
            pan: spec.pan,
            gain: spec.gain,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    /// Mix this voice into `out`, whose first sample is output frame `block_start`
    ///
    /// Returns false once the voice has finished (end of cue or lifetime
    /// reached) and can be dropped.
    pub fn render_into(&mut self, out: &mut [StereoSample], block_start: u64) -> bool {
        let source_frames = self.buffer.frames();
        let mono = self.buffer.is_mono();

        for (i, sample) in out.iter_mut().enumerate() {
            let frame = block_start + i as u64;
            if frame < self.start_frame {
                continue;
            }
            if frame >= self.release_frame {
                return false;
            }

            let index = self.position as usize;
            if index >= source_frames {
                return false;
            }

            // Linear interpolation between neighbouring source frames
            let frac = (self.position - index as f64) as f32;
            let (l0, r0) = self.buffer.frame(index);
            let (l1, r1) = if index + 1 < source_frames {
                self.buffer.frame(index + 1)
            } else {
                (l0, r0)
            };
            let left = l0 + (l1 - l0) * frac;
            let right = r0 + (r1 - r0) * frac;

            let (left, right) = apply_pan(left, right, mono, self.pan);
            *sample += StereoSample::new(left * self.gain, right * self.gain);

            self.position += self.step;
        }

        let next_frame = block_start + out.len() as u64;
        next_frame < self.release_frame && (self.position as usize) < source_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::gc_handle;

    fn spec(samples: Vec<f32>, channels: u16, start_at: f64, release_at: f64) -> VoiceSpec {
        VoiceSpec {
            id: 1,
            buffer: Shared::new(&gc_handle(), DecodedAudio::new(samples, 1000, channels)),
            start_at,
            release_at,
            pan: 0.0,
            gain: 1.0,
        }
    }

    #[test]
    fn test_zero_pan_bypasses() {
        assert_eq!(apply_pan(0.3, -0.2, false, 0.0), (0.3, -0.2));
    }

    #[test]
    fn test_mono_pan_is_equal_power() {
        let (l, r) = apply_pan(1.0, 1.0, true, -0.7);
        assert!(l > r);
        assert!((l * l + r * r - 1.0).abs() < 1e-5);

        let (l, r) = apply_pan(1.0, 1.0, true, 1.0);
        assert!(l.abs() < 1e-6);
        assert!((r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_stereo_pan_folds_opposite_channel() {
        // Hard left: right channel folds fully into the left
        let (l, r) = apply_pan(0.5, 0.25, false, -1.0);
        assert!((l - 0.75).abs() < 1e-6);
        assert!(r.abs() < 1e-6);

        let (l, r) = apply_pan(0.5, 0.25, false, 0.3);
        assert!(l < 0.5);
        assert!(r > 0.25);
    }

    #[test]
    fn test_voice_waits_for_start_frame() {
        // 1 kHz source on a 1 kHz clock: one source frame per output frame
        let mut voice = Voice::from_spec(spec(vec![1.0; 8], 1, 0.004, 1.0), 1000);
        let mut out = vec![StereoSample::silence(); 6];

        assert!(voice.render_into(&mut out, 0));
        assert_eq!(out[3], StereoSample::silence());
        assert_eq!(out[4], StereoSample::mono(1.0));
        assert_eq!(out[5], StereoSample::mono(1.0));
    }

    #[test]
    fn test_voice_released_at_lifetime() {
        let mut voice = Voice::from_spec(spec(vec![1.0; 100], 1, 0.0, 0.003), 1000);
        let mut out = vec![StereoSample::silence(); 8];

        assert!(!voice.render_into(&mut out, 0));
        assert_eq!(out[2], StereoSample::mono(1.0));
        assert_eq!(out[3], StereoSample::silence());
    }

    #[test]
    fn test_voice_ends_with_source() {
        let mut voice = Voice::from_spec(spec(vec![0.5, 0.5, 0.5, 0.5], 2, 0.0, 9.0), 1000);
        let mut out = vec![StereoSample::silence(); 4];

        assert!(!voice.render_into(&mut out, 0));
        assert_eq!(out[1], StereoSample::new(0.5, 0.5));
        assert_eq!(out[2], StereoSample::silence());
    }

    #[test]
    fn test_resampling_step() {
        // 1 kHz source on a 2 kHz clock plays each source frame twice (interpolated)
        let mut voice = Voice::from_spec(spec(vec![0.0, 1.0], 1, 0.0, 9.0), 2000);
        let mut out = vec![StereoSample::silence(); 3];
        voice.render_into(&mut out, 0);

        assert_eq!(out[0].left, 0.0);
        assert!((out[1].left - 0.5).abs() < 1e-6);
        assert_eq!(out[2].left, 1.0);
    }
}
