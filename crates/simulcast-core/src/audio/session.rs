//! The engine-side handle to the audio output
//!
//! `AudioSession` is `Send`: it only holds the producer end of the mixer's
//! command queue and the shared clock. The cpal stream itself stays wherever
//! it was created (see [`AudioOutput`](super::AudioOutput)).

use std::sync::Arc;

use super::clock::AudioClock;
use super::command::{command_channel, MixerCommand, VoiceId, VoiceSpec};
use super::mixer::VoiceMixer;
use crate::schedule::PlaybackSink;

pub struct AudioSession {
    commands: rtrb::Producer<MixerCommand>,
    clock: Arc<AudioClock>,
}

impl AudioSession {
    /// Create a session and the mixer it drives
    ///
    /// The mixer goes to whoever renders audio: a device callback, or a test.
    pub fn pair(sample_rate: u32) -> (Self, VoiceMixer) {
        let (tx, rx) = command_channel();
        let clock = AudioClock::new(sample_rate);
        let mixer = VoiceMixer::new(rx, clock.clone());
        (
            Self {
                commands: tx,
                clock,
            },
            mixer,
        )
    }

    pub fn clock(&self) -> &Arc<AudioClock> {
        &self.clock
    }

    pub fn sample_rate(&self) -> u32 {
        self.clock.sample_rate()
    }

    fn push(&mut self, command: MixerCommand) -> bool {
        match self.commands.push(command) {
            Ok(()) => true,
            Err(rtrb::PushError::Full(command)) => {
                log::warn!("Mixer command queue full, dropping {:?}", command);
                false
            }
        }
    }
}

impl PlaybackSink for AudioSession {
    fn current_time(&self) -> f64 {
        self.clock.now_secs()
    }

    fn is_suspended(&self) -> bool {
        self.clock.is_suspended()
    }

    fn resume(&mut self) {
        if self.clock.is_suspended() {
            log::info!("Resuming audio session");
            self.clock.set_suspended(false);
        }
    }

    fn start(&mut self, voice: VoiceSpec) -> bool {
        self.push(MixerCommand::StartVoice(voice))
    }

    fn stop(&mut self, id: VoiceId) {
        self.push(MixerCommand::StopVoice { id });
    }

    fn stop_all(&mut self) {
        self.push(MixerCommand::StopAll);
    }

    fn set_output_gain(&mut self, gain: f32) {
        self.push(MixerCommand::SetMasterGain(gain));
    }
}
