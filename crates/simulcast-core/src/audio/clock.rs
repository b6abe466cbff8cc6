//! Shared audio clock
//!
//! The audio thread is the only writer: it advances the frame counter after
//! every rendered block. Everybody else reads relaxed atomics, the same way
//! UI code reads deck state without touching the engine.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct AudioClock {
    frames: AtomicU64,
    sample_rate: AtomicU32,
    suspended: AtomicBool,
    /// Voices rejected because the mixer was full
    dropped_voices: AtomicU64,
}

impl AudioClock {
    /// A new clock at frame 0
    ///
    /// Clocks start suspended, like an output that has not been unlocked by
    /// the user yet.
    pub fn new(sample_rate: u32) -> Arc<Self> {
        Arc::new(Self {
            frames: AtomicU64::new(0),
            sample_rate: AtomicU32::new(sample_rate.max(1)),
            suspended: AtomicBool::new(true),
            dropped_voices: AtomicU64::new(0),
        })
    }

    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    /// Current time in seconds
    pub fn now_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate() as f64
    }

    /// Convert a clock time in seconds to a frame index
    #[inline]
    pub fn frame_at(&self, secs: f64) -> u64 {
        (secs.max(0.0) * self.sample_rate() as f64).round() as u64
    }

    /// Called by the audio thread after rendering `n_frames`
    #[inline]
    pub fn advance(&self, n_frames: usize) {
        self.frames.fetch_add(n_frames as u64, Ordering::Release);
    }

    #[inline]
    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Relaxed)
    }

    pub fn set_suspended(&self, suspended: bool) {
        self.suspended.store(suspended, Ordering::Relaxed);
    }

    pub fn record_dropped_voice(&self) {
        self.dropped_voices.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_voices(&self) -> u64 {
        self.dropped_voices.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_time() {
        let clock = AudioClock::new(48000);
        assert!(clock.is_suspended());
        assert_eq!(clock.now_secs(), 0.0);

        clock.advance(24000);
        assert_eq!(clock.frames(), 24000);
        assert!((clock.now_secs() - 0.5).abs() < 1e-12);
        assert_eq!(clock.frame_at(1.5), 72000);
        assert_eq!(clock.frame_at(-1.0), 0);
    }
}
