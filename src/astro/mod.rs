//! Astronomy: time axis, built-in solar almanac, event timelines and the
//! Earth position model.

pub mod model;
pub mod solar;
pub mod time;
pub mod timeline;

pub use model::{earth_model, EarthModel};
pub use solar::SolarAlmanac;
pub use time::JulianDate;
pub use timeline::{Event, EventKind, EventTime, Season};
