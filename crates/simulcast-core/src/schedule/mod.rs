//! Playback scheduling
//!
//! - [`events`]: the deterministic cue list of a turn
//! - [`PlaybackScheduler`]: places those cues on the audio clock through a
//!   [`PlaybackSink`]

pub mod events;
mod scheduler;

pub use events::{
    bass_file, beep_file, events_for_turn, numeric_file, phonetic_word, rotation_file,
    unique_files, voice_file, CueKind, PlaybackEvent, IPA_TABLE, SOUND_OFFSETS_MS,
};
pub use scheduler::{PlaybackScheduler, PlaybackSink, SchedulerStats};

#[cfg(test)]
pub(crate) use scheduler::tests::{cue, RecordingSink};
