//! Safety layer: model range checks and the motor release guard.
//!
//! Two rules live here:
//!
//! 1. An [`EarthModel`] outside `orbit ∈ [0, 180]`, `rotation ∈ [0, 360)`
//!    is never handed to the motion controller.  [`check_model`] is called
//!    from the model constructor, so an out-of-range pair cannot exist.
//! 2. Both motors are de-energized whenever the firmware stops driving
//!    them, however it stops.  [`ReleaseGuard`] owns the rig for the whole
//!    run and releases it on `Drop`: normal return, `?` early exit and
//!    unwinding all pass through it.  Abort-on-panic builds use the raw
//!    GPIO path in the panic hook instead (see `diagnostics`).

use core::ops::{Deref, DerefMut};

use log::{error, info};

use crate::app::ports::MotorRig;
use crate::astro::model::EarthModel;
use crate::error::ModelError;

/// Upper bound of the orbit triangle wave (summer solstice).
pub const ORBIT_MAX_DEGREES: f64 = 180.0;
/// Rotation is half-open: 360 is reported as 0.
pub const ROTATION_LIMIT_DEGREES: f64 = 360.0;

/// Reject a model pair that escaped its declared ranges.
///
/// NaN fails both checks.
pub fn check_model(model: &EarthModel) -> Result<(), ModelError> {
    let orbit = model.orbit_degrees;
    if !(0.0..=ORBIT_MAX_DEGREES).contains(&orbit) {
        error!("SAFETY: orbit degrees out of range: {orbit}");
        return Err(ModelError::OrbitOutOfRange(orbit));
    }
    let rotation = model.rotation_degrees;
    if !(0.0..ROTATION_LIMIT_DEGREES).contains(&rotation) {
        error!("SAFETY: rotation degrees out of range: {rotation}");
        return Err(ModelError::RotationOutOfRange(rotation));
    }
    Ok(())
}

// ── Release guard ─────────────────────────────────────────────

/// Owns a [`MotorRig`] and releases both motors when dropped.
///
/// Derefs to the rig, so callers pass `&mut *guard` wherever a rig is
/// expected.
pub struct ReleaseGuard<R: MotorRig> {
    rig: R,
}

impl<R: MotorRig> ReleaseGuard<R> {
    pub fn new(rig: R) -> Self {
        Self { rig }
    }
}

impl<R: MotorRig> Deref for ReleaseGuard<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.rig
    }
}

impl<R: MotorRig> DerefMut for ReleaseGuard<R> {
    fn deref_mut(&mut self) -> &mut R {
        &mut self.rig
    }
}

impl<R: MotorRig> Drop for ReleaseGuard<R> {
    fn drop(&mut self) {
        match self.rig.release_all() {
            Ok(()) => info!("SAFETY: motors released"),
            Err(e) => error!("SAFETY: motor release failed: {e}"),
        }
    }
}
