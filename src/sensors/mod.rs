//! Sensor drivers.

pub mod hall_effect;
