//! Disk rotation state
//!
//! Each disk is a small time-driven state machine. A new turn schedules a
//! spin at `turn_delay` (when its confirmation tone sounds) and a settle
//! `settle_delay` later, where the angle is folded back into [0, 360) with a
//! zero-length transition so the correction is invisible.

use std::time::{Duration, Instant};

use crate::turn::Turn;
use crate::types::{DEGREES_PER_UNIT, NUM_DISKS};

/// Transition seconds by rotation magnitude (index 0..=10)
pub const ROTATION_DURATIONS: [f64; 11] = [0.0, 0.6, 0.9, 1.2, 1.5, 1.8, 2.1, 2.4, 2.7, 3.0, 3.3];

/// Absolute angle a reset cycle spins to
pub const RESET_ANGLE: f64 = -360.0;

/// Magnitude whose duration is used for a reset cycle
const RESET_DURATION_INDEX: usize = 8;

/// What a turn asks of one disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationInput {
    Delta(i32),
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationPhase {
    Idle,
    PendingSpin,
    Spinning,
    Settled,
}

/// What the renderer needs for one disk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskView {
    pub angle: f64,
    pub transition_secs: f64,
    pub phase: RotationPhase,
}

pub fn duration_for(units: i32) -> f64 {
    ROTATION_DURATIONS[(units.unsigned_abs() as usize).min(ROTATION_DURATIONS.len() - 1)]
}

#[derive(Debug, Clone)]
pub struct DiskRotation {
    angle: f64,
    transition_secs: f64,
    phase: RotationPhase,
    spin: Option<(Instant, RotationInput)>,
    settle_at: Option<Instant>,
    turn_delay: Duration,
    settle_delay: Duration,
}

impl DiskRotation {
    pub fn new(turn_delay: Duration, settle_delay: Duration) -> Self {
        Self {
            angle: 0.0,
            transition_secs: 0.0,
            phase: RotationPhase::Idle,
            spin: None,
            settle_at: None,
            turn_delay,
            settle_delay,
        }
    }

    /// Schedule the spin and settle for a new turn
    ///
    /// Anything still pending from the previous turn is dropped.
    pub fn on_turn(&mut self, input: RotationInput, now: Instant) {
        let spin_at = now + self.turn_delay;
        self.spin = Some((spin_at, input));
        self.settle_at = Some(spin_at + self.settle_delay);
        self.phase = RotationPhase::PendingSpin;
    }

    /// Apply due transitions; returns true if the view changed
    pub fn update(&mut self, now: Instant) -> bool {
        let mut changed = false;

        if let Some((at, input)) = self.spin {
            if now >= at {
                self.spin = None;
                match input {
                    RotationInput::Reset => {
                        self.transition_secs = ROTATION_DURATIONS[RESET_DURATION_INDEX];
                        self.angle = RESET_ANGLE;
                    }
                    RotationInput::Delta(units) => {
                        self.transition_secs = duration_for(units);
                        self.angle += DEGREES_PER_UNIT * units as f64;
                    }
                }
                self.phase = RotationPhase::Spinning;
                changed = true;
            }
        }

        if let Some(at) = self.settle_at {
            if now >= at && self.spin.is_none() {
                self.settle_at = None;
                self.transition_secs = 0.0;
                self.angle = self.angle.rem_euclid(360.0);
                self.phase = RotationPhase::Settled;
                changed = true;
            }
        }

        changed
    }

    /// Back to rest at 0°
    pub fn reset(&mut self) {
        self.angle = 0.0;
        self.transition_secs = 0.0;
        self.phase = RotationPhase::Idle;
        self.spin = None;
        self.settle_at = None;
    }

    /// Drop pending spin/settle but keep the current angle
    pub fn cancel(&mut self) {
        self.spin = None;
        self.settle_at = None;
        if self.phase == RotationPhase::PendingSpin {
            self.phase = RotationPhase::Idle;
        }
    }

    /// Earliest pending transition
    pub fn next_due(&self) -> Option<Instant> {
        match (self.spin.map(|(at, _)| at), self.settle_at) {
            (Some(spin), _) => Some(spin),
            (None, settle) => settle,
        }
    }

    pub fn view(&self) -> DiskView {
        DiskView {
            angle: self.angle,
            transition_secs: self.transition_secs,
            phase: self.phase,
        }
    }
}

/// The four disks of the display
#[derive(Debug, Clone)]
pub struct Disks {
    slots: [DiskRotation; NUM_DISKS],
}

impl Disks {
    pub fn new(turn_delay: Duration, settle_delay: Duration) -> Self {
        Self {
            slots: std::array::from_fn(|_| DiskRotation::new(turn_delay, settle_delay)),
        }
    }

    /// Feed a newly current turn to every disk; sleep turns are ignored
    pub fn on_turn(&mut self, turn: &Turn, now: Instant) {
        match turn {
            Turn::Structured { rotations, .. } => {
                for (slot, units) in self.slots.iter_mut().zip(rotations) {
                    slot.on_turn(RotationInput::Delta(*units), now);
                }
            }
            Turn::Reset { .. } => {
                for slot in &mut self.slots {
                    slot.on_turn(RotationInput::Reset, now);
                }
            }
            Turn::Sleep => {}
        }
    }

    pub fn update(&mut self, now: Instant) -> bool {
        self.slots
            .iter_mut()
            .fold(false, |changed, slot| slot.update(now) || changed)
    }

    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(DiskRotation::reset);
    }

    pub fn cancel(&mut self) {
        self.slots.iter_mut().for_each(DiskRotation::cancel);
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.slots.iter().filter_map(DiskRotation::next_due).min()
    }

    pub fn views(&self) -> [DiskView; NUM_DISKS] {
        std::array::from_fn(|i| self.slots[i].view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_secs(3);
    const SETTLE: Duration = Duration::from_secs(4);

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_spin_waits_for_turn_delay() {
        let t0 = Instant::now();
        let mut disk = DiskRotation::new(DELAY, SETTLE);
        disk.on_turn(RotationInput::Delta(2), t0);

        assert_eq!(disk.view().phase, RotationPhase::PendingSpin);
        assert!(!disk.update(t0 + secs(2.9)));
        assert_eq!(disk.view().angle, 0.0);

        assert!(disk.update(t0 + DELAY));
        let view = disk.view();
        assert_eq!(view.angle, 90.0);
        assert_eq!(view.transition_secs, ROTATION_DURATIONS[2]);
        assert_eq!(view.phase, RotationPhase::Spinning);
    }

    #[test]
    fn test_cumulative_targets_before_settle() {
        let t0 = Instant::now();
        let mut disk = DiskRotation::new(DELAY, SETTLE);
        let mut targets = Vec::new();

        for (i, units) in [1, -2, 1].into_iter().enumerate() {
            let at = t0 + secs(3.5 * i as f64);
            disk.on_turn(RotationInput::Delta(units), at);
            disk.update(at + DELAY);
            targets.push(disk.view().angle);
        }
        assert_eq!(targets, [45.0, -45.0, 0.0]);
    }

    #[test]
    fn test_settle_normalizes_angle() {
        let t0 = Instant::now();
        let mut disk = DiskRotation::new(DELAY, SETTLE);
        let mut settled = Vec::new();

        for (i, units) in [1, -2, 1].into_iter().enumerate() {
            let at = t0 + secs(7.25 * i as f64);
            disk.on_turn(RotationInput::Delta(units), at);
            disk.update(at + DELAY);
            assert!(disk.update(at + DELAY + SETTLE));
            let view = disk.view();
            assert_eq!(view.phase, RotationPhase::Settled);
            assert_eq!(view.transition_secs, 0.0);
            settled.push(view.angle);
        }
        assert_eq!(settled, [45.0, 315.0, 0.0]);
    }

    #[test]
    fn test_reset_spins_to_minus_360() {
        let t0 = Instant::now();
        let mut disk = DiskRotation::new(DELAY, SETTLE);
        disk.on_turn(RotationInput::Delta(3), t0);
        disk.update(t0 + DELAY);

        disk.on_turn(RotationInput::Reset, t0 + secs(7.25));
        disk.update(t0 + secs(7.25) + DELAY);
        assert_eq!(disk.view().angle, -360.0);
        assert_eq!(disk.view().transition_secs, ROTATION_DURATIONS[8]);

        disk.update(t0 + secs(7.25) + DELAY + SETTLE);
        assert_eq!(disk.view().angle, 0.0);
    }

    #[test]
    fn test_new_turn_cancels_pending_spin() {
        let t0 = Instant::now();
        let mut disk = DiskRotation::new(DELAY, SETTLE);
        disk.on_turn(RotationInput::Delta(4), t0);
        disk.on_turn(RotationInput::Delta(1), t0 + secs(1.0));

        disk.update(t0 + DELAY);
        assert_eq!(disk.view().angle, 0.0);
        disk.update(t0 + secs(1.0) + DELAY);
        assert_eq!(disk.view().angle, 45.0);
    }

    #[test]
    fn test_large_magnitudes_clamp_duration() {
        assert_eq!(duration_for(37), ROTATION_DURATIONS[10]);
        assert_eq!(duration_for(-3), ROTATION_DURATIONS[3]);
    }

    #[test]
    fn test_disks_follow_turns() {
        let t0 = Instant::now();
        let mut disks = Disks::new(DELAY, SETTLE);
        disks.on_turn(
            &Turn::Structured {
                rotations: [1, -1, 2, -2],
                sounds: [0; 6],
            },
            t0,
        );
        assert_eq!(disks.next_due(), Some(t0 + DELAY));

        assert!(disks.update(t0 + DELAY));
        let angles: Vec<f64> = disks.views().iter().map(|v| v.angle).collect();
        assert_eq!(angles, [45.0, -45.0, 90.0, -90.0]);
        assert_eq!(disks.next_due(), Some(t0 + DELAY + SETTLE));

        disks.on_turn(&Turn::Sleep, t0 + secs(5.0));
        disks.update(t0 + DELAY + SETTLE);
        let angles: Vec<f64> = disks.views().iter().map(|v| v.angle).collect();
        assert_eq!(angles, [45.0, 315.0, 90.0, 270.0]);

        disks.reset();
        assert!(disks.views().iter().all(|v| v.angle == 0.0 && v.phase == RotationPhase::Idle));
        assert_eq!(disks.next_due(), None);
    }
}
