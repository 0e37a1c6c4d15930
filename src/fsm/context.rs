//! Shared mutable context threaded through every homing phase handler.
//!
//! `HomingContext` is the blackboard the phase handlers read from and write
//! to: the latest sensor poll, the step requested for this tick, the step
//! budget bookkeeping and the report being built.  The runner in
//! [`super::home_axis`] owns the actual stepper and sensor.

use crate::app::ports::Direction;
use crate::config::HomingConfig;
use crate::error::CalibrationError;
use crate::motion::axis::AxisKind;

// ---------------------------------------------------------------------------
// Calibration report
// ---------------------------------------------------------------------------

/// Steps consumed by each homing phase of one successful calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CalibrationReport {
    pub back_off_steps: u32,
    pub seek_steps: u32,
    /// Angular width of the sensor window, in steps.
    pub clear_steps: u32,
    /// `clear_steps / 2`, stepped back to the sensor midpoint.
    pub center_steps: u32,
}

impl CalibrationReport {
    pub fn total_steps(&self) -> u32 {
        self.back_off_steps + self.seek_steps + self.clear_steps + self.center_steps
    }
}

// ---------------------------------------------------------------------------
// HomingContext
// ---------------------------------------------------------------------------

/// The shared context passed to every phase handler.
pub struct HomingContext {
    // -- Axis --
    pub axis: AxisKind,
    pub config: HomingConfig,

    // -- Inputs --
    /// Latest hall sensor poll.  Written by the runner before each tick.
    pub sensing: bool,

    // -- Outputs --
    /// Step requested by the handler this tick; consumed by the runner.
    pub request: Option<Direction>,
    /// Steps issued since the current phase was entered.
    pub phase_steps: u32,
    /// Report under construction; each phase records its count on exit.
    pub report: CalibrationReport,
    /// Set once the machine lands in `Failed`.
    pub failure: Option<CalibrationError>,
}

impl HomingContext {
    pub fn new(axis: AxisKind, config: HomingConfig) -> Self {
        Self {
            axis,
            config,
            sensing: false,
            request: None,
            phase_steps: 0,
            report: CalibrationReport::default(),
            failure: None,
        }
    }

    /// Direction toward the sensor.
    pub fn seek_direction(&self) -> Direction {
        Direction::from_forward(self.config.forward)
    }

    /// Direction away from the sensor.
    pub fn back_off_direction(&self) -> Direction {
        self.seek_direction().opposite()
    }

    /// Record a failure; the handler then returns `Some(PhaseId::Failed)`.
    pub fn fail(&mut self, error: CalibrationError) {
        if self.failure.is_none() {
            self.failure = Some(error);
        }
    }
}
