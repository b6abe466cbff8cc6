//! Text rendering helpers for the console front-end

use crate::engine::{EngineMode, SimulcastStats};
use crate::rotation::DiskView;
use crate::schedule::phonetic_word;
use crate::turn::Turn;
use crate::types::DEGREES_PER_UNIT;

/// Wake countdown as `HH:MM:SS`; hours wrap at a day
pub fn format_countdown(secs: u64) -> String {
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// A one-character dial for an angle, snapped to the nearest 45°
pub fn dial_glyph(angle: f64) -> char {
    const GLYPHS: [char; 4] = ['|', '/', '-', '\\'];
    let step = (angle.rem_euclid(360.0) / DEGREES_PER_UNIT).round() as usize;
    GLYPHS[step % GLYPHS.len()]
}

/// One line with the four dials and their angles
pub fn render_disks(disks: &[DiskView]) -> String {
    disks
        .iter()
        .map(|d| format!("{} {:>6.0}°", dial_glyph(d.angle), d.angle))
        .collect::<Vec<_>>()
        .join("   ")
}

fn turn_units(turn: &Turn) -> String {
    match turn.rotations() {
        Some(rotations) if !turn.is_reset() => {
            let joined: Vec<String> = rotations.iter().map(|r| r.to_string()).collect();
            format!("[{}]", joined.join(", "))
        }
        _ => format!("[{}]", turn),
    }
}

fn turn_degrees(turn: &Turn) -> String {
    match turn {
        Turn::Structured { rotations, .. } => {
            let joined: Vec<String> = rotations
                .iter()
                .map(|r| format!("{}°", *r as f64 * DEGREES_PER_UNIT))
                .collect();
            format!("[{}]", joined.join(", "))
        }
        other => format!("[{}]", other),
    }
}

fn turn_word(turn: &Turn) -> String {
    match turn.sounds() {
        Some(sounds) => phonetic_word(sounds[2]).unwrap_or_default().to_string(),
        None => turn.to_string(),
    }
}

fn control_value(value: Option<i64>) -> String {
    value.map_or_else(|| "NULL".to_string(), |v| v.to_string())
}

/// The stats panel, already formatted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub mode: EngineMode,
    pub current_degrees: String,
    pub current_units: String,
    pub current_word: String,
    pub upcoming: String,
    pub next_word: String,
    pub control: String,
    pub upcoming_control: String,
}

impl From<&SimulcastStats> for StatsSnapshot {
    fn from(stats: &SimulcastStats) -> Self {
        let current = stats.current.as_ref();
        Self {
            mode: stats.mode,
            current_degrees: current.map(turn_degrees).unwrap_or_else(|| "[]".to_string()),
            current_units: current.map(turn_units).unwrap_or_default(),
            current_word: current.map(turn_word).unwrap_or_default(),
            upcoming: stats
                .upcoming
                .iter()
                .map(turn_units)
                .collect::<Vec<_>>()
                .join(" "),
            next_word: stats.upcoming.first().map(turn_word).unwrap_or_default(),
            control: control_value(stats.diagnostic),
            upcoming_control: stats
                .upcoming_diagnostics
                .iter()
                .map(|v| control_value(*v))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl StatsSnapshot {
    pub fn render(&self) -> String {
        format!(
            "MODE: {}\nCURRENT:\n  {}\n  {}\n  {}\nNEXT:\n  {}\n  {}\nCONTROL GROUP:\n  {}\n  {}",
            self.mode,
            self.current_degrees,
            self.current_units,
            self.current_word,
            self.upcoming,
            self.next_word,
            self.control,
            self.upcoming_control,
        )
    }
}
