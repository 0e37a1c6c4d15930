//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ OrreryService (domain)
//! ```
//!
//! Driven adapters (almanac, steppers, hall sensors, clock, event sinks,
//! storage) implement these traits.  The
//! [`OrreryService`](super::service::OrreryService) and the homing / motion
//! controllers consume them via generics, so the domain core never touches
//! hardware directly and every collaborator can be swapped for a test double.
//!
//! ## Notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - All port errors are typed — callers must handle every variant explicitly.

use embedded_hal::delay::DelayNs;

use crate::astro::time::JulianDate;
use crate::astro::timeline::Season;
use crate::config::SystemConfig;
use crate::error::{ActuatorError, ClockError, SensorError};

// ───────────────────────────────────────────────────────────────
// Almanac port (ephemeris → domain)
// ───────────────────────────────────────────────────────────────

/// The two discrete-event queries the Earth model needs, for a fixed
/// ephemeris and a fixed observer.  Both return events in
/// `[start, end]`, sorted ascending with no duplicate instants.
pub trait AlmanacPort {
    /// Season changes; the code is the season that begins at that instant.
    fn seasons(&self, start: JulianDate, end: JulianDate) -> Vec<(JulianDate, Season)>;

    /// Sunrise (`true`) and sunset (`false`) at the observer.
    fn sunrise_sunset(&self, start: JulianDate, end: JulianDate) -> Vec<(JulianDate, bool)>;
}

impl<A: AlmanacPort + ?Sized> AlmanacPort for &A {
    fn seasons(&self, start: JulianDate, end: JulianDate) -> Vec<(JulianDate, Season)> {
        (**self).seasons(start, end)
    }

    fn sunrise_sunset(&self, start: JulianDate, end: JulianDate) -> Vec<(JulianDate, bool)> {
        (**self).sunrise_sunset(start, end)
    }
}

// ───────────────────────────────────────────────────────────────
// Stepper port (domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Rotation sense of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn from_forward(forward: bool) -> Self {
        if forward { Self::Forward } else { Self::Backward }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }

    /// `+1` for forward, `-1` for backward.
    pub fn sign(self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Backward => write!(f, "backward"),
        }
    }
}

/// One independently addressable stepper axis.
///
/// No batching: every call is exactly one pulse.  Settling between pulses
/// is the caller's job.
pub trait StepperPort {
    /// Issue a single step.
    fn step(&mut self, direction: Direction) -> Result<(), ActuatorError>;

    /// De-energize the coils.  Must be safe to call repeatedly.
    fn release(&mut self) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Presence sensor port (hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Binary hall-effect read: `true` while the axis magnet is over the sensor.
pub trait PresenceSensor {
    fn sensing(&mut self) -> Result<bool, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Motor rig (both axes + settle timer as one borrow)
// ───────────────────────────────────────────────────────────────

/// Both physical axes and the settle timer.
///
/// Each axis is its stepper and hall sensor together, so homing and
/// tracking take one `&mut` per axis.
pub trait MotorRig {
    type Orbit: StepperPort + PresenceSensor;
    type Rotation: StepperPort + PresenceSensor;
    type Delay: DelayNs;

    fn parts(&mut self) -> (&mut Self::Orbit, &mut Self::Rotation, &mut Self::Delay);

    /// De-energize both motors.  Both are attempted even if the first fails.
    fn release_all(&mut self) -> Result<(), ActuatorError> {
        let (orbit, rotation, _) = self.parts();
        let a = orbit.release();
        let b = rotation.release();
        a.and(b)
    }
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Wall-clock source for the sampling loop.
pub trait ClockPort {
    /// Current instant, or [`ClockError::NotSynced`] before a time sync.
    fn now(&self) -> Result<JulianDate, ClockError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / journal)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log,
/// rotating journal, …).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

/// Fan-out: every event goes to both sinks, left first.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &super::events::AppEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// never silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage (config blob, diagnostic journal).
///
/// Keys are namespaced to prevent collisions between subsystems.  Write
/// operations MUST be atomic; the ESP-IDF NVS API guarantees this natively.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for StorageError {}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => Self::NotFound,
            StorageError::Full => Self::StorageFull,
            StorageError::IoError => Self::IoError,
        }
    }
}
