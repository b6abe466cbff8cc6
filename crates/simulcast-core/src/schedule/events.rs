//! Cue lists derived from a turn
//!
//! Every turn maps deterministically to at most ten playback events. The
//! sound selectors pick bass, beep, phonetic and numeric cues at fixed offsets;
//! the rotation units pick one confirmation tone per disk.

use crate::turn::Turn;
use crate::types::{DISK_PANS, NUM_DISKS};

/// Phonetic cue names, indexed by the voice selector
pub const IPA_TABLE: [&str; 17] = [
    "_Message", "Alpha", "Bravo", "Charlie", "Delta", "Echo", "Foxtrot", "Golf", "Hotel", "India",
    "Juliette", "Kilo", "Lima", "Mike", "November", "Oscar", "Pappa",
];

/// Start offsets of the six sound selectors (ms)
pub const SOUND_OFFSETS_MS: [u32; 6] = [0, 1400, 2100, 2800, 3500, 3700];

/// Rotation units used for every disk of a reset cycle
const RESET_ROTATION: u32 = 8;

/// What a cue is, which decides its gain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CueKind {
    Bass,
    Beep,
    Voice,
    Numeric,
    Rotation,
}

impl CueKind {
    pub fn gain(self) -> f32 {
        match self {
            CueKind::Voice => 0.6,
            CueKind::Rotation => 0.5,
            CueKind::Bass | CueKind::Beep | CueKind::Numeric => 1.0,
        }
    }
}

/// One scheduled, time-and-pan-positioned cue trigger
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackEvent {
    pub file: String,
    pub start_offset_ms: u32,
    /// Stereo position in [-1, 1]; 0 bypasses the pan stage
    pub pan: f32,
    pub kind: CueKind,
}

impl PlaybackEvent {
    fn centered(file: String, start_offset_ms: u32, kind: CueKind) -> Self {
        Self {
            file,
            start_offset_ms,
            pan: 0.0,
            kind,
        }
    }
}

/// Phonetic word for a voice selector, if it is inside the table
pub fn phonetic_word(selector: i32) -> Option<&'static str> {
    usize::try_from(selector)
        .ok()
        .and_then(|idx| IPA_TABLE.get(idx).copied())
}

pub fn bass_file(selector: i32) -> String {
    format!("Bass2-{}.m4a", selector)
}

pub fn beep_file(selector: i32) -> String {
    format!("Beep2-{}.m4a", selector)
}

pub fn voice_file(word: &str) -> String {
    format!("ipa_{}.m4a", word)
}

/// Numeric cue: magnitude `|v-1|` above zero, `|v+1|` below, L suffix for negatives
pub fn numeric_file(selector: i32) -> String {
    let magnitude = if selector > 0 {
        (selector - 1).unsigned_abs()
    } else {
        (selector + 1).unsigned_abs()
    };
    let suffix = if selector < 0 { 'L' } else { 'H' };
    format!("Num-{:02}{}.m4a", magnitude, suffix)
}

pub fn rotation_file(units: u32) -> String {
    format!("turn{}.m4a", units)
}

/// Ordered cue list for a turn
///
/// `turn_delay_ms` is the shared offset of the rotation-confirmation tones.
pub fn events_for_turn(turn: &Turn, turn_delay_ms: u32) -> Vec<PlaybackEvent> {
    match turn {
        Turn::Sleep => Vec::new(),
        Turn::Reset { .. } => {
            let mut events = Vec::with_capacity(1 + NUM_DISKS);
            events.push(PlaybackEvent::centered(
                voice_file(IPA_TABLE[0]),
                SOUND_OFFSETS_MS[2],
                CueKind::Voice,
            ));
            events.extend(rotation_tones([RESET_ROTATION; NUM_DISKS], turn_delay_ms));
            events
        }
        Turn::Structured { rotations, sounds } => {
            let mut events = Vec::with_capacity(sounds.len() + NUM_DISKS);

            for (slot, (&selector, &offset)) in sounds.iter().zip(SOUND_OFFSETS_MS.iter()).enumerate() {
                if selector == 0 {
                    continue;
                }
                let (file, kind) = match slot {
                    0 => (bass_file(selector), CueKind::Bass),
                    2 => match phonetic_word(selector) {
                        Some(word) => (voice_file(word), CueKind::Voice),
                        None => {
                            log::trace!("No phonetic cue for selector {}", selector);
                            continue;
                        }
                    },
                    3 => (numeric_file(selector), CueKind::Numeric),
                    _ => (beep_file(selector), CueKind::Beep),
                };
                events.push(PlaybackEvent::centered(file, offset, kind));
            }

            events.extend(rotation_tones(rotations.map(|r| r.unsigned_abs()), turn_delay_ms));
            events
        }
    }
}

fn rotation_tones(
    units: [u32; NUM_DISKS],
    turn_delay_ms: u32,
) -> impl Iterator<Item = PlaybackEvent> {
    units
        .into_iter()
        .zip(DISK_PANS)
        .map(move |(units, pan)| PlaybackEvent {
            file: rotation_file(units),
            start_offset_ms: turn_delay_ms,
            pan,
            kind: CueKind::Rotation,
        })
}

/// Distinct filenames referenced by a turn, in first-use order
pub fn unique_files(turn: &Turn, turn_delay_ms: u32) -> Vec<String> {
    let mut files: Vec<String> = Vec::new();
    for event in events_for_turn(turn, turn_delay_ms) {
        if !files.contains(&event.file) {
            files.push(event.file);
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: u32 = 3000;

    #[test]
    fn test_silent_turn_yields_only_rotation_tones() {
        let turn = Turn::Structured {
            rotations: [1, -2, 3, -8],
            sounds: [0; 6],
        };
        let events = events_for_turn(&turn, DELAY);

        assert_eq!(events.len(), 4);
        let files: Vec<&str> = events.iter().map(|e| e.file.as_str()).collect();
        assert_eq!(files, ["turn1.m4a", "turn2.m4a", "turn3.m4a", "turn8.m4a"]);
        assert!(events.iter().all(|e| e.start_offset_ms == DELAY));
        assert!(events.iter().all(|e| e.kind == CueKind::Rotation));
    }

    #[test]
    fn test_reset_turn_events() {
        let events = events_for_turn(&Turn::Reset { rotations: [0; 4] }, DELAY);

        assert_eq!(events.len(), 5);
        let pans: Vec<f32> = events.iter().map(|e| e.pan).collect();
        assert_eq!(pans, [0.0, -0.7, -0.3, 0.3, 0.7]);
        assert_eq!(events[0].file, "ipa__Message.m4a");
        assert_eq!(events[0].start_offset_ms, 2100);
        assert!(events[1..].iter().all(|e| e.file == "turn8.m4a"));
    }

    #[test]
    fn test_full_structured_turn() {
        let turn = Turn::Structured {
            rotations: [2, 2, -4, 10],
            sounds: [3, 2, 5, -3, 4, 1],
        };
        let events = events_for_turn(&turn, DELAY);

        let summary: Vec<(&str, u32)> = events
            .iter()
            .map(|e| (e.file.as_str(), e.start_offset_ms))
            .collect();
        assert_eq!(
            summary,
            [
                ("Bass2-3.m4a", 0),
                ("Beep2-2.m4a", 1400),
                ("ipa_Echo.m4a", 2100),
                ("Num-02L.m4a", 2800),
                ("Beep2-4.m4a", 3500),
                ("Beep2-1.m4a", 3700),
                ("turn2.m4a", DELAY),
                ("turn2.m4a", DELAY),
                ("turn4.m4a", DELAY),
                ("turn10.m4a", DELAY),
            ]
        );
        assert_eq!(events[2].kind, CueKind::Voice);
        assert_eq!(events[3].kind, CueKind::Numeric);
    }

    #[test]
    fn test_numeric_filenames() {
        assert_eq!(numeric_file(3), "Num-02H.m4a");
        assert_eq!(numeric_file(-3), "Num-02L.m4a");
        assert_eq!(numeric_file(1), "Num-00H.m4a");
        assert_eq!(numeric_file(-1), "Num-00L.m4a");
        assert_eq!(numeric_file(17), "Num-16H.m4a");
    }

    #[test]
    fn test_out_of_table_voice_is_dropped() {
        let turn = Turn::Structured {
            rotations: [1; 4],
            sounds: [0, 0, 17, 0, 0, 0],
        };
        assert_eq!(events_for_turn(&turn, DELAY).len(), 4);

        let turn = Turn::Structured {
            rotations: [1; 4],
            sounds: [0, 0, -1, 0, 0, 0],
        };
        assert_eq!(events_for_turn(&turn, DELAY).len(), 4);
    }

    #[test]
    fn test_sleep_has_no_events() {
        assert!(events_for_turn(&Turn::Sleep, DELAY).is_empty());
    }

    #[test]
    fn test_unique_files_dedups() {
        let files = unique_files(&Turn::Reset { rotations: [0; 4] }, DELAY);
        assert_eq!(files, ["ipa__Message.m4a", "turn8.m4a"]);
    }

    #[test]
    fn test_gain_by_kind() {
        assert_eq!(CueKind::Voice.gain(), 0.6);
        assert_eq!(CueKind::Rotation.gain(), 0.5);
        assert_eq!(CueKind::Numeric.gain(), 1.0);
    }
}
