//! Turns and the turn sequencer
//!
//! A turn is one discrete step of the display: a rotation delta for each of
//! the four disks plus up to six sound selectors. The endpoint also sends two
//! sentinel shapes, a reset cycle (empty sounds) and the `SLEEP` string. Both
//! are resolved into [`Turn`] variants once, when a batch is appended, so no
//! code downstream ever looks at the wire shape again.

mod buffer;
mod sequencer;

pub use buffer::TurnBuffer;
pub use sequencer::{AdvanceOutcome, Sequencer, SequencerStats, TurnBatch};

use crate::types::{NUM_DISKS, NUM_SOUND_SELECTORS};

/// Sound selectors used for the synthetic first turn after a (re)sync
pub const SILENT_SOUNDS: [i32; NUM_SOUND_SELECTORS] = [-1; NUM_SOUND_SELECTORS];

/// One step of the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    /// Rotation units per disk (±1..8, ×45°) and six sound selectors (0 = silence)
    Structured {
        rotations: [i32; NUM_DISKS],
        sounds: [i32; NUM_SOUND_SELECTORS],
    },
    /// Full-rotation reset with the fixed jingle
    Reset { rotations: [i32; NUM_DISKS] },
    /// The service entered off-hours
    Sleep,
}

impl Turn {
    /// Synthetic turn that moves the disks to an authoritative position
    ///
    /// Replaces the head of the first batch after a (re)sync.
    pub fn initial(rotations: [i32; NUM_DISKS]) -> Self {
        Turn::Structured {
            rotations,
            sounds: SILENT_SOUNDS,
        }
    }

    /// Rotation units, if this turn carries any
    pub fn rotations(&self) -> Option<&[i32; NUM_DISKS]> {
        match self {
            Turn::Structured { rotations, .. } | Turn::Reset { rotations } => Some(rotations),
            Turn::Sleep => None,
        }
    }

    /// Sound selectors of a structured turn
    pub fn sounds(&self) -> Option<&[i32; NUM_SOUND_SELECTORS]> {
        match self {
            Turn::Structured { sounds, .. } => Some(sounds),
            _ => None,
        }
    }

    pub fn is_sleep(&self) -> bool {
        matches!(self, Turn::Sleep)
    }

    pub fn is_reset(&self) -> bool {
        matches!(self, Turn::Reset { .. })
    }
}

impl std::fmt::Display for Turn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Turn::Structured { rotations, .. } => {
                let joined: Vec<String> = rotations.iter().map(|r| r.to_string()).collect();
                write!(f, "[{}]", joined.join(", "))
            }
            Turn::Reset { .. } => write!(f, "RESET"),
            Turn::Sleep => write!(f, "SLEEP"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_turn_is_silent() {
        let turn = Turn::initial([1, 2, 3, 4]);
        assert_eq!(turn.rotations(), Some(&[1, 2, 3, 4]));
        assert_eq!(turn.sounds(), Some(&[-1; 6]));
    }

    #[test]
    fn test_turn_display() {
        let turn = Turn::Structured {
            rotations: [1, -2, 3, 8],
            sounds: [0; 6],
        };
        assert_eq!(turn.to_string(), "[1, -2, 3, 8]");
        assert_eq!(Turn::Reset { rotations: [0; 4] }.to_string(), "RESET");
        assert_eq!(Turn::Sleep.to_string(), "SLEEP");
    }
}
