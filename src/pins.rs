//! GPIO pin assignments for the orrery controller board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.
//!
//! Both axes use a STEP/DIR driver (A4988 / DRV8825 class) with an
//! active-low ENABLE line, plus an open-drain hall-effect switch (A3144)
//! that pulls LOW while the axis magnet sits over it.

// ---------------------------------------------------------------------------
// Orbit axis (lower motor, winter-solstice magnet)
// ---------------------------------------------------------------------------

/// Digital output: one rising edge = one step.
pub const ORBIT_STEP_GPIO: i32 = 4;
/// Digital output: HIGH = forward, LOW = backward.
pub const ORBIT_DIR_GPIO: i32 = 5;
/// Digital output: LOW = coils energised, HIGH = released.
pub const ORBIT_ENABLE_GPIO: i32 = 6;
/// Digital input (pull-up): LOW = magnet present.
pub const ORBIT_HALL_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// Rotation axis (upper motor, prime-meridian magnet)
// ---------------------------------------------------------------------------

pub const ROTATION_STEP_GPIO: i32 = 15;
pub const ROTATION_DIR_GPIO: i32 = 16;
pub const ROTATION_ENABLE_GPIO: i32 = 17;
pub const ROTATION_HALL_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// Wiring polarity
// ---------------------------------------------------------------------------

/// Swap the DIR level for a motor wired the other way round.
pub const ORBIT_DIR_INVERTED: bool = false;
pub const ROTATION_DIR_INVERTED: bool = false;
/// `true` for A3144 open-drain switches; `false` for push-pull breakouts
/// that drive HIGH on the magnet.
pub const HALL_ACTIVE_LOW: bool = true;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// STEP pulse high time (microseconds).  Drivers need ≥ 1 µs.
pub const STEP_PULSE_US: u32 = 5;
/// Delay after changing DIR before the next STEP edge (microseconds).
pub const DIR_SETUP_US: u32 = 5;

/// Every output pin, for bulk configuration and the panic-path release.
pub const OUTPUT_PINS: [i32; 6] = [
    ORBIT_STEP_GPIO,
    ORBIT_DIR_GPIO,
    ORBIT_ENABLE_GPIO,
    ROTATION_STEP_GPIO,
    ROTATION_DIR_GPIO,
    ROTATION_ENABLE_GPIO,
];

/// Every hall input.
pub const INPUT_PINS: [i32; 2] = [ORBIT_HALL_GPIO, ROTATION_HALL_GPIO];

/// ENABLE lines only; driving these HIGH releases both motors.
pub const ENABLE_PINS: [i32; 2] = [ORBIT_ENABLE_GPIO, ROTATION_ENABLE_GPIO];
