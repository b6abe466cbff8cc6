//! Lock-free command queue to the voice mixer
//!
//! The engine thread pushes commands into an `rtrb` ringbuffer and the audio
//! callback pops them at the start of every block. Both sides are wait-free
//! and nothing is allocated once the queue exists.

use basedrop::Shared;

use crate::assets::DecodedAudio;

/// Identifies one scheduled voice
pub type VoiceId = u64;

/// Capacity of the command queue
///
/// A turn schedules at most ten voices; this leaves room for a full reset
/// (one stop per live voice) on top of several queued turns.
pub const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Everything the mixer needs to play one cue
///
/// Times are on the audio clock, in seconds.
#[derive(Clone)]
pub struct VoiceSpec {
    pub id: VoiceId,
    pub buffer: Shared<DecodedAudio>,
    pub start_at: f64,
    /// The voice is silenced and released at this time even if the cue is longer
    pub release_at: f64,
    /// 0 bypasses the pan stage
    pub pan: f32,
    pub gain: f32,
}

impl std::fmt::Debug for VoiceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceSpec")
            .field("id", &self.id)
            .field("frames", &self.buffer.frames())
            .field("start_at", &self.start_at)
            .field("release_at", &self.release_at)
            .field("pan", &self.pan)
            .field("gain", &self.gain)
            .finish()
    }
}

/// Commands sent from the engine thread to the audio thread
#[derive(Debug)]
pub enum MixerCommand {
    StartVoice(VoiceSpec),
    /// Release a voice early; unknown ids are ignored
    StopVoice { id: VoiceId },
    StopAll,
    /// Output gain applied after mixing (0.0 mutes)
    SetMasterGain(f32),
}

/// Create a new command channel
pub fn command_channel() -> (rtrb::Producer<MixerCommand>, rtrb::Consumer<MixerCommand>) {
    rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}
