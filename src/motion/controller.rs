//! Motion Controller: Earth model → quantized, direction-aware step commands.
//!
//! Axes are driven one after the other, orbit first, so pulses to the two
//! motors never interleave.  Every pulse is followed by the settle delay.

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use crate::app::ports::StepperPort;
use crate::astro::model::EarthModel;
use crate::config::SystemConfig;
use crate::error::ActuatorError;

use super::axis::{AxisKind, AxisState, Move};

/// Proof that both axes were homed successfully.
///
/// Only the calibration path can mint one, so a [`MotionController`] can
/// never be built on top of a failed or skipped calibration.
#[derive(Debug)]
pub struct Homed {
    _private: (),
}

impl Homed {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

/// Outcome of driving one axis for one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSample {
    pub degrees: f64,
    /// Unquantized step position.
    pub exact_steps: f64,
    /// Quantized target step.
    pub target: i64,
    /// Move planned from the previous position.
    pub planned: Move,
    /// Pulses actually issued (< `planned.steps` only on a fault).
    pub issued: u32,
    /// Position after the move.
    pub position: i64,
    pub fault: Option<ActuatorError>,
}

/// One sample of the tracking loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleReport {
    pub model: EarthModel,
    pub orbit: AxisSample,
    pub rotation: AxisSample,
}

impl SampleReport {
    pub fn axis(&self, kind: AxisKind) -> &AxisSample {
        match kind {
            AxisKind::Orbit => &self.orbit,
            AxisKind::Rotation => &self.rotation,
        }
    }

    pub fn moved(&self) -> bool {
        self.orbit.issued > 0 || self.rotation.issued > 0
    }
}

/// Tracks both axes from their homed zero.
pub struct MotionController {
    orbit: AxisState,
    rotation: AxisState,
    hysteresis: f64,
    settle_ms: u32,
}

impl MotionController {
    pub fn new(config: &SystemConfig, _homed: Homed) -> Self {
        Self {
            orbit: AxisState::homed(AxisKind::Orbit, config.steps_per_revolution),
            rotation: AxisState::homed(AxisKind::Rotation, config.steps_per_revolution),
            hysteresis: config.quantize_hysteresis_steps,
            settle_ms: config.step_settle_ms,
        }
    }

    pub fn axis(&self, kind: AxisKind) -> &AxisState {
        match kind {
            AxisKind::Orbit => &self.orbit,
            AxisKind::Rotation => &self.rotation,
        }
    }

    /// Bring both axes to `model`.  Actuator faults end that axis' move
    /// early; the position reflects the pulses actually issued.
    pub fn apply<O, R, D>(
        &mut self,
        model: &EarthModel,
        orbit: &mut O,
        rotation: &mut R,
        delay: &mut D,
    ) -> SampleReport
    where
        O: StepperPort + ?Sized,
        R: StepperPort + ?Sized,
        D: DelayNs + ?Sized,
    {
        let settle_ms = self.settle_ms;
        let hysteresis = self.hysteresis;
        let orbit_sample = drive(&mut self.orbit, model.orbit_degrees, hysteresis, settle_ms, orbit, delay);
        let rotation_sample = drive(
            &mut self.rotation,
            model.rotation_degrees,
            hysteresis,
            settle_ms,
            rotation,
            delay,
        );
        SampleReport {
            model: *model,
            orbit: orbit_sample,
            rotation: rotation_sample,
        }
    }
}

fn drive<S, D>(
    axis: &mut AxisState,
    degrees: f64,
    hysteresis: f64,
    settle_ms: u32,
    stepper: &mut S,
    delay: &mut D,
) -> AxisSample
where
    S: StepperPort + ?Sized,
    D: DelayNs + ?Sized,
{
    let exact_steps = axis.exact_steps(degrees);
    let target = axis.quantize(exact_steps, hysteresis);
    let planned = axis.plan(target);

    let mut issued = 0;
    let mut fault = None;
    for _ in 0..planned.steps {
        if let Err(e) = stepper.step(planned.direction) {
            warn!("{}: {e} after {issued}/{} steps", axis.kind(), planned.steps);
            fault = Some(e);
            break;
        }
        issued += 1;
        delay.delay_ms(settle_ms);
    }
    axis.advance(planned.direction, issued);

    if issued > 0 {
        debug!(
            "{}: {} {issued} steps -> {}",
            axis.kind(),
            planned.direction,
            axis.position()
        );
    }

    AxisSample {
        degrees,
        exact_steps,
        target,
        planned,
        issued,
        position: axis.position(),
        fault,
    }
}
