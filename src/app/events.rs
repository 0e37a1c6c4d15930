//! Outbound application events.
//!
//! The [`OrreryService`](super::service::OrreryService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, append to the
//! diagnostic journal, etc.

use crate::astro::time::JulianDate;
use crate::error::{CalibrationError, Error};
use crate::fsm::context::CalibrationReport;
use crate::motion::{AxisKind, SampleReport};

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The service has started.
    Started { steps_per_revolution: u32 },

    /// One axis finished homing and sits at its zero reference.
    Calibrated { axis: AxisKind, report: CalibrationReport },

    /// One homing attempt failed.
    CalibrationFailed {
        axis: AxisKind,
        attempt: u8,
        error: CalibrationError,
    },

    /// A tracking sample was computed and applied.
    Sample { time: JulianDate, report: SampleReport },

    /// A non-fatal error; the loop continues with the next sample.
    Fault(Error),

    /// A fatal error; the process stops after releasing the motors.
    Fatal(Error),
}
