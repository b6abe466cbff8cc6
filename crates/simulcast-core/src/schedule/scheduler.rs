//! Turns cue lists into scheduled voices
//!
//! The scheduler owns no audio. It reads the cache, asks a [`PlaybackSink`]
//! for the audio clock and hands it fully-positioned [`VoiceSpec`]s. It keeps
//! a handle for every voice until its lifetime is over so that an early
//! cancel can stop exactly the voices that are still alive.

use std::time::{Duration, Instant};

use super::events::{events_for_turn, unique_files};
use crate::assets::AssetCache;
use crate::audio::{VoiceId, VoiceSpec};
use crate::turn::Turn;
use crate::types::{TURN_DELAY_MS, VOICE_LIFETIME_MS};

/// Where scheduled voices go
///
/// Implemented by [`AudioSession`](crate::audio::AudioSession); tests use a
/// recording sink.
pub trait PlaybackSink: Send {
    /// Audio clock time in seconds
    fn current_time(&self) -> f64;
    fn is_suspended(&self) -> bool;
    fn resume(&mut self);
    /// Returns false if the voice could not be queued
    fn start(&mut self, voice: VoiceSpec) -> bool;
    fn stop(&mut self, id: VoiceId);
    fn stop_all(&mut self);
    fn set_output_gain(&mut self, gain: f32);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub turns_played: u64,
    pub voices_started: u64,
    /// Cues skipped because they were not decoded yet (or never will be)
    pub voices_skipped: u64,
    pub voices_cancelled: u64,
}

#[derive(Debug, Clone, Copy)]
struct ScheduledVoice {
    id: VoiceId,
    release_at: Instant,
}

pub struct PlaybackScheduler {
    turn_delay_ms: u32,
    voice_lifetime: Duration,
    enabled_once: bool,
    suppressed: bool,
    voices: Vec<ScheduledVoice>,
    next_id: VoiceId,
    stats: SchedulerStats,
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self::new(TURN_DELAY_MS, Duration::from_millis(VOICE_LIFETIME_MS as u64))
    }
}

impl PlaybackScheduler {
    pub fn new(turn_delay_ms: u32, voice_lifetime: Duration) -> Self {
        Self {
            turn_delay_ms,
            voice_lifetime,
            enabled_once: false,
            suppressed: false,
            voices: Vec::new(),
            next_id: 1,
            stats: SchedulerStats::default(),
        }
    }

    /// Record that the user enabled audio; playback is gated on this forever after
    pub fn enable(&mut self) {
        self.enabled_once = true;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled_once
    }

    /// Suppress playback while offline
    pub fn set_suppressed(&mut self, suppressed: bool) {
        self.suppressed = suppressed;
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    pub fn turn_delay_ms(&self) -> u32 {
        self.turn_delay_ms
    }

    /// Schedule every cue of `turn` relative to the sink's clock
    ///
    /// Returns how many voices were started.
    pub fn play_turn(
        &mut self,
        turn: &Turn,
        cache: &AssetCache,
        sink: &mut dyn PlaybackSink,
        now: Instant,
    ) -> usize {
        if !self.enabled_once || self.suppressed {
            return 0;
        }
        if sink.is_suspended() {
            sink.resume();
        }

        self.release_due(now);

        let base = sink.current_time();
        let release_at = base + self.voice_lifetime.as_secs_f64();
        let mut started = 0;

        for event in events_for_turn(turn, self.turn_delay_ms) {
            let Some(buffer) = cache.get(&event.file) else {
                log::trace!("Skipping {}: not in cache", event.file);
                self.stats.voices_skipped += 1;
                continue;
            };

            let id = self.next_id;
            self.next_id += 1;
            let voice = VoiceSpec {
                id,
                buffer,
                start_at: base + event.start_offset_ms as f64 / 1000.0,
                release_at,
                pan: event.pan,
                gain: event.kind.gain(),
            };

            if sink.start(voice) {
                self.voices.push(ScheduledVoice {
                    id,
                    release_at: now + self.voice_lifetime,
                });
                started += 1;
            }
        }

        self.stats.turns_played += 1;
        self.stats.voices_started += started as u64;
        log::debug!("Turn {} scheduled {} voices", turn, started);
        started
    }

    /// Queue decodes for everything the next turn will need
    pub fn prefetch(&self, next: &Turn, cache: &mut AssetCache) -> usize {
        cache.ensure(unique_files(next, self.turn_delay_ms))
    }

    /// Forget voices whose lifetime is over
    ///
    /// The mixer releases them itself at `release_at`; dropping the handle
    /// here means a later cancel will not touch them again.
    pub fn release_due(&mut self, now: Instant) -> usize {
        let before = self.voices.len();
        self.voices.retain(|v| v.release_at > now);
        before - self.voices.len()
    }

    /// Stop every voice that is still alive
    pub fn cancel_all(&mut self, sink: &mut dyn PlaybackSink) -> usize {
        let cancelled = self.voices.len();
        for voice in self.voices.drain(..) {
            sink.stop(voice.id);
        }
        self.stats.voices_cancelled += cancelled as u64;
        if cancelled > 0 {
            log::debug!("Cancelled {} scheduled voices", cancelled);
        }
        cancelled
    }

    /// Forget every handle without touching a sink (no session attached)
    pub fn forget_all(&mut self) {
        self.voices.clear();
    }

    pub fn live_voices(&self) -> usize {
        self.voices.len()
    }

    /// When the next voice handle expires
    pub fn next_release(&self) -> Option<Instant> {
        self.voices.iter().map(|v| v.release_at).min()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }
}
