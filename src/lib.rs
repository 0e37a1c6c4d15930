//! Orrery firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod astro;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fsm;
pub mod motion;
pub mod pins;
pub mod safety;

// Hardware-facing layers; each carries a simulation twin for host builds.
pub mod adapters;
pub mod drivers;
pub mod sensors;
