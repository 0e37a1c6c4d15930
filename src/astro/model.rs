//! Position Model Calculator: time → (orbit°, rotation°).

use core::fmt;

use log::debug;

use crate::app::ports::AlmanacPort;
use crate::error::{ModelError, Observable};
use crate::safety;

use super::time::JulianDate;
use super::timeline::{
    noon_nadir_event_times, season_event_times, surrounding_events, EventTime, Season,
    RISE_SET_RADIUS_DAYS, SEASON_RADIUS_DAYS,
};

/// Pose of the mechanical Earth for one instant.
///
/// `orbit_degrees` is in [0, 180]: 0 at winter solstice, 90 at either
/// equinox, 180 at summer solstice.  `rotation_degrees` is in [0, 360) and
/// is relative to the orbit axis the rotation motor is mounted on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarthModel {
    pub orbit_degrees: f64,
    pub rotation_degrees: f64,
}

impl EarthModel {
    /// Build a model, rejecting out-of-range values.
    pub fn new(orbit_degrees: f64, rotation_degrees: f64) -> Result<Self, ModelError> {
        let model = Self {
            orbit_degrees,
            rotation_degrees,
        };
        safety::check_model(&model)?;
        Ok(model)
    }

    /// Absolute spin the globe shows once both axes are applied.
    pub fn effective_degrees(&self) -> f64 {
        (self.rotation_degrees + self.orbit_degrees) % 360.0
    }
}

impl fmt::Display for EarthModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "orbit={:.4}° rotation={:.4}°",
            self.orbit_degrees, self.rotation_degrees
        )
    }
}

/// Fraction of the way from `x` to `y` that `time` lies, in [0, 1).
fn fraction_between(x: &EventTime, y: &EventTime, time: JulianDate) -> f64 {
    (time - x.time) / (y.time - x.time)
}

/// Orbit degrees on the 0–180–0 triangle anchored at winter solstice.
pub fn orbit_degrees_from_winter_solstice<A: AlmanacPort + ?Sized>(
    almanac: &A,
    time: JulianDate,
) -> Result<f64, ModelError> {
    let (x, y) = surrounding_events(time, SEASON_RADIUS_DAYS, |start, end| {
        season_event_times(almanac, start, end)
    })
    .ok_or(ModelError::NoSurroundingEvents(Observable::Seasons))?;

    let offset = fraction_between(&x, &y, time) * 90.0;
    let degrees = match x.event.as_season() {
        Some(Season::SummerSolstice) => 180.0 - offset,
        Some(Season::AutumnalEquinox) => 90.0 - offset,
        Some(Season::WinterSolstice) => offset,
        _ => 90.0 + offset,
    };
    debug!("orbit: after {x}, before {y}: {degrees:.4}°");
    Ok(degrees)
}

/// Absolute spin: 0° at solar noon, 180° at nadir.
pub fn rotation_degrees_from_solar_noon<A: AlmanacPort + ?Sized>(
    almanac: &A,
    time: JulianDate,
) -> Result<f64, ModelError> {
    let (x, y) = surrounding_events(time, RISE_SET_RADIUS_DAYS, |start, end| {
        noon_nadir_event_times(almanac, start, end)
    })
    .ok_or(ModelError::NoSurroundingEvents(Observable::NoonNadir))?;

    let mut degrees = fraction_between(&x, &y, time) * 180.0;
    if x.event.sun_flag() == Some(false) {
        degrees += 180.0;
    }
    debug!("rotation: after {x}, before {y}: {degrees:.4}°");
    Ok(degrees)
}

/// Full model for `time`.  Rotation is corrected by the orbit rotation
/// already applied underneath it, then wrapped into [0, 360).
pub fn earth_model<A: AlmanacPort + ?Sized>(almanac: &A, time: JulianDate) -> Result<EarthModel, ModelError> {
    let orbit = orbit_degrees_from_winter_solstice(almanac, time)?;
    let mut rotation = rotation_degrees_from_solar_noon(almanac, time)? - orbit;
    if rotation < 0.0 {
        rotation += 360.0;
    }
    // -ε + 360 rounds to exactly 360.0 in f64.
    if rotation >= 360.0 {
        rotation -= 360.0;
    }
    EarthModel::new(orbit, rotation)
}
