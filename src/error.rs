//! Unified error types for the orrery firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! calibrate-then-track loop handles failures in one place.  All variants
//! are `Copy` and carry only the numbers needed for a useful log line.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Error {
    /// The Earth model could not be computed or produced an invalid value.
    Model(ModelError),
    /// Homing an axis against its hall sensor failed.
    Calibration(CalibrationError),
    /// A stepper command failed.
    Actuator(ActuatorError),
    /// A sensor could not be read.
    Sensor(SensorError),
    /// The wall clock is not usable yet.
    Clock(ClockError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl Error {
    /// Fatal errors stop the process before the motors are driven again.
    ///
    /// Out-of-range model values and a missing straddling event pair both
    /// mean the model integration is broken; everything else is logged and
    /// the control loop moves on to the next sample.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Model(_) | Self::Init(_))
    }
}

impl CalibrationError {
    /// Steps the failed phase had consumed.
    pub fn steps(&self) -> u32 {
        match *self {
            Self::BackOffExhausted { steps }
            | Self::SensorNotFound { steps }
            | Self::SensorNotCleared { steps }
            | Self::Actuator { steps }
            | Self::Sensor { steps } => steps,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(e) => write!(f, "model: {e}"),
            Self::Calibration(e) => write!(f, "calibration: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Clock(e) => write!(f, "clock: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Model errors
// ---------------------------------------------------------------------------

/// Which almanac timeline a lookup ran against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observable {
    Seasons,
    NoonNadir,
}

impl fmt::Display for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seasons => write!(f, "seasons"),
            Self::NoonNadir => write!(f, "solar noon/nadir"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelError {
    /// No consecutive event pair strictly straddles the query time.
    NoSurroundingEvents(Observable),
    /// Orbit degrees fell outside [0, 180].
    OrbitOutOfRange(f64),
    /// Rotation degrees fell outside [0, 360).
    RotationOutOfRange(f64),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSurroundingEvents(obs) => {
                write!(f, "no {obs} events straddle the query time")
            }
            Self::OrbitOutOfRange(d) => write!(f, "unexpected orbit degrees: {d}"),
            Self::RotationOutOfRange(d) => write!(f, "unexpected rotation degrees: {d}"),
        }
    }
}

impl From<ModelError> for Error {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

// ---------------------------------------------------------------------------
// Calibration errors
// ---------------------------------------------------------------------------

/// Homing failures.  Each variant carries the steps the failed phase used;
/// the axis position is undefined afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    /// Sensor still active after backing off `max_sensor_steps`.
    BackOffExhausted { steps: u32 },
    /// Sensor never reached within `max_scan_steps`.
    SensorNotFound { steps: u32 },
    /// Sensor still active after crossing `max_sensor_steps`.
    SensorNotCleared { steps: u32 },
    /// The stepper rejected a step mid-homing.
    Actuator { steps: u32 },
    /// The hall sensor could not be read mid-homing.
    Sensor { steps: u32 },
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BackOffExhausted { steps } => {
                write!(f, "back off of sensor failed after {steps} steps")
            }
            Self::SensorNotFound { steps } => {
                write!(f, "scan forward to sensor failed after {steps} steps")
            }
            Self::SensorNotCleared { steps } => {
                write!(f, "scan forward off of sensor failed after {steps} steps")
            }
            Self::Actuator { steps } => write!(f, "stepper fault after {steps} steps"),
            Self::Sensor { steps } => write!(f, "sensor read fault after {steps} steps"),
        }
    }
}

impl From<CalibrationError> for Error {
    fn from(e: CalibrationError) -> Self {
        Self::Calibration(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// STEP pulse could not be written.
    StepWriteFailed,
    /// DIR pin could not be set.
    DirectionWriteFailed,
    /// ENABLE pin could not be set.
    EnableWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StepWriteFailed => write!(f, "STEP write failed"),
            Self::DirectionWriteFailed => write!(f, "DIR write failed"),
            Self::EnableWriteFailed => write!(f, "ENABLE write failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// GPIO read returned an error.
    GpioReadFailed,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioReadFailed => write!(f, "GPIO read failed"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Clock errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    /// Wall clock reads before 2020-01-01, i.e. SNTP has not synced.
    NotSynced,
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSynced => write!(f, "wall clock not synced"),
        }
    }
}

impl From<ClockError> for Error {
    fn from(e: ClockError) -> Self {
        Self::Clock(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
