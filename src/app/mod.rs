//! Application core — pure domain logic, zero I/O.
//!
//! The orrery's business rules: calibrate both axes, then keep them on the
//! Earth model sample after sample.  All interaction with hardware happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
