//! Built-in solar almanac.
//!
//! Low-precision solar theory (mean elements + equation of centre,
//! nutation/aberration folded into one longitude correction).  Good to
//! roughly 0.01° in longitude, i.e. season instants within about a quarter
//! hour and sunrise/sunset within about a minute, which is far below one
//! motor step on either axis.
//!
//! Discrete events are found the same way for both observables: sample a
//! step function of time on a fixed grid, then bisect every change down to
//! one second.

use crate::app::ports::AlmanacPort;

use super::time::JulianDate;
use super::timeline::Season;

/// Bisection stops once the bracket is narrower than this (one second).
const EPSILON_DAYS: f64 = 1.0 / 86_400.0;
/// Sampling grid for the season function.
const SEASON_STEP_DAYS: f64 = 1.0;
/// Sampling grid for the sun-up function.
const RISE_SET_STEP_DAYS: f64 = 1.0 / 24.0;
/// Altitude of the sun's centre at apparent sunrise/sunset
/// (34' refraction + 16' semi-diameter).
const HORIZON_ALTITUDE_DEG: f64 = -0.8333;
/// Highest |latitude| at which the sun rises and sets every day of the
/// year.  Polar day starts near 65.7° once refraction is counted.
pub const MAX_LATITUDE_DEG: f64 = 65.0;

/// Apparent equatorial position of the sun.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunPosition {
    /// Apparent ecliptic longitude, degrees in [0, 360).
    pub longitude_deg: f64,
    /// Right ascension, degrees in [0, 360).
    pub right_ascension_deg: f64,
    /// Declination, degrees.
    pub declination_deg: f64,
}

/// Solar almanac for a fixed observer.
#[derive(Debug, Clone, Copy)]
pub struct SolarAlmanac {
    latitude_deg: f64,
    longitude_deg: f64,
}

impl SolarAlmanac {
    /// Greenwich observatory, the rotation axis' reference meridian.
    pub const GREENWICH: (f64, f64) = (51.48, 0.0);

    /// Observer at the given geodetic latitude / east longitude (degrees).
    pub fn new(latitude_deg: f64, longitude_deg: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
        }
    }

    pub fn greenwich() -> Self {
        Self::new(Self::GREENWICH.0, Self::GREENWICH.1)
    }

    /// Season code in force at `t` (0 = after vernal equinox … 3 = after
    /// winter solstice).
    pub fn season_at(&self, t: JulianDate) -> u8 {
        (sun_position(t).longitude_deg / 90.0).floor() as u8 % 4
    }

    /// Whether the sun is above the apparent horizon at `t`.
    pub fn sun_is_up(&self, t: JulianDate) -> bool {
        self.sun_altitude_deg(t) > HORIZON_ALTITUDE_DEG
    }

    /// Geometric altitude of the sun's centre for the observer.
    pub fn sun_altitude_deg(&self, t: JulianDate) -> f64 {
        let sun = sun_position(t);
        let hour_angle = greenwich_mean_sidereal_deg(t) + self.longitude_deg
            - sun.right_ascension_deg;

        let lat = self.latitude_deg.to_radians();
        let dec = sun.declination_deg.to_radians();
        let sin_alt =
            lat.sin() * dec.sin() + lat.cos() * dec.cos() * hour_angle.to_radians().cos();
        sin_alt.clamp(-1.0, 1.0).asin().to_degrees()
    }
}

impl Default for SolarAlmanac {
    fn default() -> Self {
        Self::greenwich()
    }
}

impl AlmanacPort for SolarAlmanac {
    fn seasons(&self, start: JulianDate, end: JulianDate) -> Vec<(JulianDate, Season)> {
        find_discrete(start, end, SEASON_STEP_DAYS, |t| self.season_at(t))
            .into_iter()
            .map(|(t, code)| (t, Season::from_code(code)))
            .collect()
    }

    fn sunrise_sunset(&self, start: JulianDate, end: JulianDate) -> Vec<(JulianDate, bool)> {
        find_discrete(start, end, RISE_SET_STEP_DAYS, |t| self.sun_is_up(t))
    }
}

// ───────────────────────────────────────────────────────────────
// Discrete event search
// ───────────────────────────────────────────────────────────────

/// Find every instant in `(start, end]` where the step function `f`
/// changes value.  Each event carries the value `f` takes *after* the
/// change.  Output is strictly increasing in time.
///
/// `step` must be shorter than the shortest interval between two changes,
/// otherwise a pair of changes inside one grid cell goes unseen.
pub fn find_discrete<T, F>(start: JulianDate, end: JulianDate, step: f64, f: F) -> Vec<(JulianDate, T)>
where
    T: Copy + PartialEq,
    F: Fn(JulianDate) -> T,
{
    let mut events = Vec::new();
    if end.tt() <= start.tt() || step <= 0.0 {
        return events;
    }

    let mut lo = start;
    let mut lo_value = f(lo);
    while lo.tt() < end.tt() {
        let hi = JulianDate((lo.tt() + step).min(end.tt()));
        let hi_value = f(hi);
        if hi_value != lo_value {
            events.push(bisect(lo, hi, lo_value, &f));
        }
        lo = hi;
        lo_value = hi_value;
    }
    events
}

/// Narrow `[lo, hi]` around the single change of `f` inside it.
fn bisect<T, F>(mut lo: JulianDate, mut hi: JulianDate, lo_value: T, f: &F) -> (JulianDate, T)
where
    T: Copy + PartialEq,
    F: Fn(JulianDate) -> T,
{
    let mut hi_value = f(hi);
    while hi.tt() - lo.tt() > EPSILON_DAYS {
        let mid = lo.midpoint(hi);
        let mid_value = f(mid);
        if mid_value == lo_value {
            lo = mid;
        } else {
            hi = mid;
            hi_value = mid_value;
        }
    }
    (hi, hi_value)
}

// ───────────────────────────────────────────────────────────────
// Solar position
// ───────────────────────────────────────────────────────────────

/// Apparent position of the sun at `t`.
pub fn sun_position(t: JulianDate) -> SunPosition {
    let c = t.centuries_since_j2000();

    let mean_longitude = 280.466_46 + 36_000.769_83 * c + 0.000_303_2 * c * c;
    let mean_anomaly = (357.529_11 + 35_999.050_29 * c - 0.000_153_7 * c * c).to_radians();
    let centre = (1.914_602 - 0.004_817 * c - 0.000_014 * c * c) * mean_anomaly.sin()
        + (0.019_993 - 0.000_101 * c) * (2.0 * mean_anomaly).sin()
        + 0.000_289 * (3.0 * mean_anomaly).sin();
    let true_longitude = mean_longitude + centre;

    let omega = (125.04 - 1_934.136 * c).to_radians();
    let apparent_longitude = true_longitude - 0.005_69 - 0.004_78 * omega.sin();

    let mean_obliquity = 23.439_291_1 - 0.013_004_2 * c - 1.64e-7 * c * c + 5.04e-7 * c * c * c;
    let obliquity = (mean_obliquity + 0.002_56 * omega.cos()).to_radians();

    let lambda = apparent_longitude.to_radians();
    let right_ascension = (obliquity.cos() * lambda.sin()).atan2(lambda.cos());
    let declination = (obliquity.sin() * lambda.sin()).asin();

    SunPosition {
        longitude_deg: apparent_longitude.rem_euclid(360.0),
        right_ascension_deg: right_ascension.to_degrees().rem_euclid(360.0),
        declination_deg: declination.to_degrees(),
    }
}

/// Greenwich mean sidereal time in degrees, [0, 360).
pub fn greenwich_mean_sidereal_deg(t: JulianDate) -> f64 {
    let d = t.ut() - super::time::J2000;
    let c = d / 36_525.0;
    (280.460_618_37 + 360.985_647_366_29 * d + 0.000_387_933 * c * c - c * c * c / 38_710_000.0)
        .rem_euclid(360.0)
}
