//! Turn sequencer
//!
//! Owns the [`TurnBuffer`] and the published "current" turn. All mutation
//! happens from the engine's tick path; fetch results reach it only through
//! [`Sequencer::apply_batch`].

use super::{Turn, TurnBuffer};
use crate::types::NUM_DISKS;

/// A resolved batch of upcoming turns
#[derive(Debug, Clone, PartialEq)]
pub struct TurnBatch {
    pub turns: Vec<Turn>,
    pub diagnostics: Vec<Option<i64>>,
    /// Absolute disk position the first batch after a sync starts from
    pub initial_rotation: [i32; NUM_DISKS],
}

/// What a call to [`Sequencer::advance`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// A new turn was published
    Advanced,
    /// The turn queue was empty; the previous turn stays current
    Underrun,
    /// The new current turn is the sleep sentinel
    SleepSentinel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequencerStats {
    pub advances: u64,
    pub underruns: u64,
    pub batches: u64,
    pub resets: u64,
}

#[derive(Debug)]
pub struct Sequencer {
    buffer: TurnBuffer,
    current: Option<Turn>,
    diagnostic: Option<i64>,
    first_fetch: bool,
    stats: SequencerStats,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            buffer: TurnBuffer::new(),
            current: None,
            diagnostic: None,
            first_fetch: true,
            stats: SequencerStats::default(),
        }
    }

    /// Append a fetched batch
    ///
    /// On the first batch after a sync the head turn is replaced by
    /// [`Turn::initial`] unless it is the sleep sentinel. Returns whether this
    /// was the first batch.
    pub fn apply_batch(&mut self, batch: TurnBatch) -> bool {
        let TurnBatch {
            turns,
            diagnostics,
            initial_rotation,
        } = batch;

        log::debug!(
            "Sequencer: appending {} turns ({} buffered)",
            turns.len(),
            self.buffer.len()
        );
        self.buffer.append(turns, diagnostics);
        self.stats.batches += 1;

        let was_first = self.first_fetch;
        if was_first {
            if self.buffer.front().is_some_and(|head| !head.is_sleep()) {
                self.buffer.replace_head(Turn::initial(initial_rotation));
            }
            self.first_fetch = false;
        }
        was_first
    }

    /// Pop one turn and one diagnostic value and publish them
    ///
    /// An empty queue leaves the matching published value untouched.
    pub fn advance(&mut self) -> AdvanceOutcome {
        let (turn, diagnostic) = self.buffer.pop_front();

        if let Some(diagnostic) = diagnostic {
            self.diagnostic = diagnostic;
        }

        match turn {
            Some(turn) => {
                self.current = Some(turn);
                self.stats.advances += 1;
                if turn.is_sleep() {
                    AdvanceOutcome::SleepSentinel
                } else {
                    AdvanceOutcome::Advanced
                }
            }
            None => {
                self.stats.underruns += 1;
                log::debug!(
                    "Sequencer: turn buffer underrun, keeping {:?}",
                    self.current
                );
                AdvanceOutcome::Underrun
            }
        }
    }

    /// Drop everything and re-arm the first-fetch special case
    pub fn reset(&mut self) {
        self.buffer.reset();
        self.current = None;
        self.diagnostic = None;
        self.first_fetch = true;
        self.stats.resets += 1;
    }

    pub fn current(&self) -> Option<&Turn> {
        self.current.as_ref()
    }

    /// The turn that becomes current on the next advance
    pub fn next(&self) -> Option<&Turn> {
        self.buffer.front()
    }

    pub fn diagnostic(&self) -> Option<i64> {
        self.diagnostic
    }

    pub fn is_first_fetch(&self) -> bool {
        self.first_fetch
    }

    pub fn buffer(&self) -> &TurnBuffer {
        &self.buffer
    }

    pub fn stats(&self) -> SequencerStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(r: i32) -> Turn {
        Turn::Structured {
            rotations: [r, r, r, r],
            sounds: [1, 0, 0, 0, 0, 0],
        }
    }

    fn batch(turns: Vec<Turn>, diagnostics: Vec<Option<i64>>) -> TurnBatch {
        TurnBatch {
            turns,
            diagnostics,
            initial_rotation: [1, 2, 3, 4],
        }
    }

    #[test]
    fn test_first_batch_head_is_replaced() {
        let mut seq = Sequencer::new();
        assert!(seq.apply_batch(batch(vec![turn(5), turn(6)], vec![Some(1), Some(2)])));
        assert!(!seq.is_first_fetch());

        assert_eq!(seq.advance(), AdvanceOutcome::Advanced);
        assert_eq!(
            seq.current(),
            Some(&Turn::Structured {
                rotations: [1, 2, 3, 4],
                sounds: [-1, -1, -1, -1, -1, -1],
            })
        );
        assert_eq!(seq.diagnostic(), Some(1));

        seq.advance();
        assert_eq!(seq.current(), Some(&turn(6)));
    }

    #[test]
    fn test_later_batches_are_appended_untouched() {
        let mut seq = Sequencer::new();
        seq.apply_batch(batch(vec![turn(1)], vec![None]));
        assert!(!seq.apply_batch(batch(vec![turn(2), turn(3)], vec![Some(2), Some(3)])));

        let mut seen = Vec::new();
        while seq.advance() != AdvanceOutcome::Underrun {
            seen.push((*seq.current().unwrap(), seq.diagnostic()));
        }
        assert_eq!(
            seen,
            vec![
                (Turn::initial([1, 2, 3, 4]), None),
                (turn(2), Some(2)),
                (turn(3), Some(3)),
            ]
        );
    }

    #[test]
    fn test_sleep_head_is_not_replaced() {
        let mut seq = Sequencer::new();
        seq.apply_batch(batch(vec![Turn::Sleep, turn(1)], vec![None, None]));
        assert_eq!(seq.advance(), AdvanceOutcome::SleepSentinel);
        assert_eq!(seq.current(), Some(&Turn::Sleep));
    }

    #[test]
    fn test_underrun_keeps_previous_values() {
        let mut seq = Sequencer::new();
        seq.apply_batch(batch(vec![turn(1)], vec![Some(7)]));
        seq.advance();

        assert_eq!(seq.advance(), AdvanceOutcome::Underrun);
        assert_eq!(seq.current(), Some(&Turn::initial([1, 2, 3, 4])));
        assert_eq!(seq.diagnostic(), Some(7));
        assert_eq!(seq.stats().underruns, 1);
    }

    #[test]
    fn test_reset_clears_and_rearms_first_fetch() {
        let mut seq = Sequencer::new();
        seq.apply_batch(batch(vec![turn(1), turn(2)], vec![Some(1), Some(2)]));
        seq.advance();

        seq.reset();
        assert!(seq.current().is_none());
        assert!(seq.diagnostic().is_none());
        assert!(seq.next().is_none());
        assert!(seq.is_first_fetch());

        seq.apply_batch(batch(vec![turn(9)], vec![None]));
        assert_eq!(seq.next(), Some(&Turn::initial([1, 2, 3, 4])));
    }

    #[test]
    fn test_empty_first_batch_still_clears_flag() {
        let mut seq = Sequencer::new();
        assert!(seq.apply_batch(batch(Vec::new(), Vec::new())));
        assert!(!seq.is_first_fetch());
        assert_eq!(seq.advance(), AdvanceOutcome::Underrun);
    }
}
