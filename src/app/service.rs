//! Application service — the hexagonal core.
//!
//! [`OrreryService`] owns the almanac and configuration and exposes the two
//! things the firmware does: home both axes, then keep them on the Earth
//! model.  All I/O flows through port traits injected at call sites, making
//! the entire service testable with mock adapters.
//!
//! ```text
//!  AlmanacPort ──▶ ┌─────────────────────────┐ ──▶ EventSink
//!    ClockPort ──▶ │      OrreryService      │
//!                  │  homing · model · motion│ ──▶ MotorRig
//!                  └─────────────────────────┘
//! ```
//!
//! Tracking needs a [`MotionController`], which needs a [`Homed`] token,
//! which only [`OrreryService::calibrate`] hands out.

use log::{info, warn};

use crate::astro::model::earth_model;
use crate::astro::time::JulianDate;
use crate::config::{HomingConfig, SystemConfig};
use crate::error::{CalibrationError, Error, Result};
use crate::fsm::context::CalibrationReport;
use crate::fsm::home_axis;
use crate::motion::{AxisKind, Homed, MotionController, SampleReport};

use super::events::AppEvent;
use super::ports::{AlmanacPort, ClockPort, EventSink, MotorRig};

// ───────────────────────────────────────────────────────────────
// OrreryService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct OrreryService<A: AlmanacPort> {
    almanac: A,
    config: SystemConfig,
    sample_count: u64,
}

impl<A: AlmanacPort> OrreryService<A> {
    pub fn new(almanac: A, config: SystemConfig) -> Self {
        Self {
            almanac,
            config,
            sample_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Started {
            steps_per_revolution: self.config.steps_per_revolution,
        });
        info!(
            "OrreryService started ({} steps/rev, sample every {}s)",
            self.config.steps_per_revolution, self.config.sample_interval_secs
        );
    }

    // ── Calibration ───────────────────────────────────────────

    /// Home the orbit axis, then the rotation axis.
    ///
    /// Each axis gets `calibration_attempts` tries.  The first axis that
    /// runs out of attempts aborts calibration; no [`Homed`] token is
    /// produced and the caller must not drive the motors to absolute
    /// positions.
    pub fn calibrate<R: MotorRig>(&mut self, rig: &mut R, sink: &mut impl EventSink) -> Result<Homed> {
        let attempts = self.config.calibration_attempts.max(1);
        let settle_ms = self.config.step_settle_ms;
        let (orbit, rotation, delay) = rig.parts();

        home_with_retries(
            AxisKind::Orbit,
            self.config.orbit_homing,
            attempts,
            |cfg| home_axis(AxisKind::Orbit, cfg, settle_ms, orbit, delay),
            sink,
        )?;
        home_with_retries(
            AxisKind::Rotation,
            self.config.rotation_homing,
            attempts,
            |cfg| home_axis(AxisKind::Rotation, cfg, settle_ms, rotation, delay),
            sink,
        )?;

        Ok(Homed::new())
    }

    // ── Tracking ──────────────────────────────────────────────

    /// One tracking sample at the clock's current time.
    pub fn sample<R: MotorRig>(
        &mut self,
        motion: &mut MotionController,
        clock: &impl ClockPort,
        rig: &mut R,
        sink: &mut impl EventSink,
    ) -> Result<SampleReport> {
        let time = clock.now()?;
        self.sample_at(motion, time, rig, sink)
    }

    /// One tracking sample at `time`.
    ///
    /// Model errors are returned untouched and are fatal.  Actuator faults
    /// are reported as events; the axis keeps the steps it did take.
    pub fn sample_at<R: MotorRig>(
        &mut self,
        motion: &mut MotionController,
        time: JulianDate,
        rig: &mut R,
        sink: &mut impl EventSink,
    ) -> Result<SampleReport> {
        self.sample_count += 1;

        let model = match earth_model(&self.almanac, time) {
            Ok(m) => m,
            Err(e) => {
                let err = Error::from(e);
                sink.emit(&AppEvent::Fatal(err));
                return Err(err);
            }
        };

        let (orbit, rotation, delay) = rig.parts();
        let report = motion.apply(&model, orbit, rotation, delay);
        sink.emit(&AppEvent::Sample { time, report });

        for kind in AxisKind::ALL {
            if let Some(e) = report.axis(kind).fault {
                sink.emit(&AppEvent::Fault(Error::from(e)));
            }
        }
        Ok(report)
    }

    /// Route a sample error: fatal errors are returned, the rest are
    /// reported and swallowed so the loop carries on.
    pub fn triage(&self, err: Error, sink: &mut impl EventSink) -> Result<()> {
        if err.is_fatal() {
            return Err(err);
        }
        sink.emit(&AppEvent::Fault(err));
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn almanac(&self) -> &A {
        &self.almanac
    }

    /// Samples attempted since startup.
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }
}

fn home_with_retries<F>(
    axis: AxisKind,
    config: HomingConfig,
    attempts: u8,
    mut home: F,
    sink: &mut impl EventSink,
) -> core::result::Result<CalibrationReport, CalibrationError>
where
    F: FnMut(HomingConfig) -> core::result::Result<CalibrationReport, CalibrationError>,
{
    let mut attempt = 1;
    loop {
        match home(config) {
            Ok(report) => {
                sink.emit(&AppEvent::Calibrated { axis, report });
                return Ok(report);
            }
            Err(error) => {
                sink.emit(&AppEvent::CalibrationFailed {
                    axis,
                    attempt,
                    error,
                });
                if attempt >= attempts {
                    return Err(error);
                }
                warn!("{axis}: retrying calibration ({attempt}/{attempts} failed)");
                attempt += 1;
            }
        }
    }
}
