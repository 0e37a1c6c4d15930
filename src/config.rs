//! System configuration parameters
//!
//! All tunable parameters for the orrery.
//! Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

/// Homing parameters for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomingConfig {
    /// Seek direction toward the sensor (`true` = forward).
    pub forward: bool,
    /// Step budget for SEEK.
    pub max_scan_steps: u32,
    /// Step budget for BACK_OFF and CLEAR.
    pub max_sensor_steps: u32,
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Motors ---
    /// Full-step count per motor revolution (both axes)
    pub steps_per_revolution: u32,
    /// Settle delay after every single step (milliseconds)
    pub step_settle_ms: u32,

    // --- Sampling ---
    /// Sleep between model samples (seconds)
    pub sample_interval_secs: u32,
    /// Hysteresis band around the current step, in steps
    pub quantize_hysteresis_steps: f64,

    // --- Calibration ---
    /// Orbit axis: seeks backward onto the winter-solstice magnet
    pub orbit_homing: HomingConfig,
    /// Rotation axis: seeks forward onto the prime-meridian magnet
    pub rotation_homing: HomingConfig,
    /// Homing attempts per axis before giving up
    pub calibration_attempts: u8,

    // --- Observer ---
    /// Geodetic latitude for sunrise/sunset (degrees, north positive, within ±65)
    pub observer_latitude_deg: f64,
    /// Longitude for sunrise/sunset (degrees, east positive)
    pub observer_longitude_deg: f64,

    // --- Diagnostics ---
    /// Journal segment size before rotation (bytes)
    pub journal_segment_bytes: u32,
    /// Rotated segments kept behind the active one
    pub journal_backups: u8,
    /// Lines buffered in RAM between journal writes
    pub journal_flush_lines: u8,
}

impl SystemConfig {
    /// Degrees covered by one full step.
    pub fn degrees_per_step(&self) -> f64 {
        360.0 / f64::from(self.steps_per_revolution)
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Motors
            steps_per_revolution: 200, // 1.8° hybrid stepper
            step_settle_ms: 50,

            // Sampling
            sample_interval_secs: 60,
            quantize_hysteresis_steps: 0.05,

            // Calibration
            orbit_homing: HomingConfig {
                forward: false,
                max_scan_steps: 100,
                max_sensor_steps: 50,
            },
            rotation_homing: HomingConfig {
                forward: true,
                max_scan_steps: 200,
                max_sensor_steps: 50,
            },
            calibration_attempts: 1,

            // Greenwich
            observer_latitude_deg: 51.48,
            observer_longitude_deg: 0.0,

            // Diagnostics
            journal_segment_bytes: 4000,
            journal_backups: 3,
            journal_flush_lines: 24, // ~8 samples
        }
    }
}
