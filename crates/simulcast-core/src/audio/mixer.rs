//! Real-time voice mixer
//!
//! Owned exclusively by the audio callback. Every block it drains the command
//! queue, mixes all live voices into a pre-allocated buffer, applies the
//! master gain and advances the shared clock. While the clock is suspended it
//! outputs silence and time stands still.

use std::sync::Arc;

use super::clock::AudioClock;
use super::command::MixerCommand;
use super::config::MAX_BUFFER_SIZE;
use super::voice::Voice;
use crate::types::{StereoBuffer, StereoSample};

/// Upper bound on simultaneously live voices
///
/// Two overlapping turns hold at most twenty; the rest is headroom.
pub const MAX_VOICES: usize = 64;

pub struct VoiceMixer {
    commands: rtrb::Consumer<MixerCommand>,
    clock: Arc<AudioClock>,
    voices: Vec<Voice>,
    master_gain: f32,
    buffer: StereoBuffer,
}

impl VoiceMixer {
    pub fn new(commands: rtrb::Consumer<MixerCommand>, clock: Arc<AudioClock>) -> Self {
        Self {
            commands,
            clock,
            voices: Vec::with_capacity(MAX_VOICES),
            master_gain: 0.0,
            buffer: StereoBuffer::silence(MAX_BUFFER_SIZE),
        }
    }

    /// Apply every pending command
    pub fn process_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            match command {
                MixerCommand::StartVoice(spec) => {
                    if self.voices.len() < MAX_VOICES {
                        self.voices
                            .push(Voice::from_spec(spec, self.clock.sample_rate()));
                    } else {
                        self.clock.record_dropped_voice();
                    }
                }
                MixerCommand::StopVoice { id } => self.voices.retain(|v| v.id() != id),
                MixerCommand::StopAll => self.voices.clear(),
                MixerCommand::SetMasterGain(gain) => self.master_gain = gain,
            }
        }
    }

    /// Render one block of `n_frames` (at most `MAX_BUFFER_SIZE`)
    pub fn process(&mut self, n_frames: usize) -> &[StereoSample] {
        let n_frames = n_frames.min(MAX_BUFFER_SIZE);
        self.buffer.clear_to(n_frames);

        self.process_commands();

        if self.clock.is_suspended() {
            return self.buffer.as_slice();
        }

        let block_start = self.clock.frames();
        let out = self.buffer.as_mut_slice();
        // Finished voices are dropped here; their buffers go to the GC thread
        self.voices.retain_mut(|voice| voice.render_into(out, block_start));

        self.buffer.scale(self.master_gain);
        self.clock.advance(n_frames);

        self.buffer.as_slice()
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }
}
