//! Per-axis step bookkeeping: quantization and delta computation.

use core::fmt;

use crate::app::ports::Direction;

/// The two physical axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisKind {
    /// Lower motor: tilt/season, bounded 0–180°, never wraps.
    Orbit,
    /// Upper motor: spin relative to the orbit axis, wraps at 360°.
    Rotation,
}

impl AxisKind {
    pub const ALL: [AxisKind; 2] = [AxisKind::Orbit, AxisKind::Rotation];

    pub fn name(self) -> &'static str {
        match self {
            Self::Orbit => "orbit",
            Self::Rotation => "rotation",
        }
    }

    /// Whether moves may cross the 0/360 seam (always forward).
    pub fn wraps(self) -> bool {
        matches!(self, Self::Rotation)
    }
}

impl fmt::Display for AxisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Signed step difference for a non-wrapping axis.
pub fn orbit_delta(current: i64, target: i64) -> i64 {
    target - current
}

/// Forward-only step difference across the seam, in `[0, steps_per_rev)`.
///
/// `current = 199, target = 0, steps_per_rev = 200` gives `1`.
pub fn rotation_delta(current: i64, target: i64, steps_per_rev: u32) -> u32 {
    (target - current).rem_euclid(i64::from(steps_per_rev)) as u32
}

/// A planned move: `steps` single pulses in `direction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub direction: Direction,
    pub steps: u32,
}

impl Move {
    pub const NONE: Move = Move {
        direction: Direction::Forward,
        steps: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.steps == 0
    }
}

/// Position of one axis in whole steps from its homed zero.
///
/// The position only changes through [`AxisState::advance`], i.e. after
/// pulses were actually issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisState {
    kind: AxisKind,
    position: i64,
    steps_per_revolution: u32,
}

impl AxisState {
    /// Axis sitting at its homed zero.
    pub fn homed(kind: AxisKind, steps_per_revolution: u32) -> Self {
        Self {
            kind,
            position: 0,
            steps_per_revolution,
        }
    }

    pub fn kind(&self) -> AxisKind {
        self.kind
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn steps_per_revolution(&self) -> u32 {
        self.steps_per_revolution
    }

    pub fn degrees_per_step(&self) -> f64 {
        360.0 / f64::from(self.steps_per_revolution)
    }

    /// Unquantized step position for `degrees`.
    pub fn exact_steps(&self, degrees: f64) -> f64 {
        degrees / self.degrees_per_step()
    }

    /// Quantize an exact step value to a target step.
    ///
    /// While `exact` lies within `[position − h, position + 1 + h)` the
    /// target stays at the current position, so noise around a step
    /// boundary cannot flap the motor.  Outside the band the target is
    /// `floor(exact)`.  The band is measured modulo one revolution on the
    /// rotation axis.
    pub fn quantize(&self, exact: f64, hysteresis: f64) -> i64 {
        let h = hysteresis.max(0.0);
        let here = self.position as f64;
        if self.kind.wraps() {
            let rev = f64::from(self.steps_per_revolution);
            let ahead = (exact - here).rem_euclid(rev);
            if ahead < 1.0 + h || ahead >= rev - h {
                return self.position;
            }
            (exact.floor() as i64).rem_euclid(i64::from(self.steps_per_revolution))
        } else {
            if exact >= here - h && exact < here + 1.0 + h {
                return self.position;
            }
            exact.floor() as i64
        }
    }

    /// Move needed to reach `target` from the current position.
    pub fn plan(&self, target: i64) -> Move {
        if self.kind.wraps() {
            Move {
                direction: Direction::Forward,
                steps: rotation_delta(self.position, target, self.steps_per_revolution),
            }
        } else {
            let delta = orbit_delta(self.position, target);
            Move {
                direction: if delta < 0 { Direction::Backward } else { Direction::Forward },
                steps: delta.unsigned_abs() as u32,
            }
        }
    }

    /// Record `steps` pulses actually issued in `direction`.
    pub fn advance(&mut self, direction: Direction, steps: u32) {
        let next = self.position + direction.sign() * i64::from(steps);
        self.position = if self.kind.wraps() {
            next.rem_euclid(i64::from(self.steps_per_revolution))
        } else {
            next
        };
    }
}
