//! Continuous time axis for the almanac and the Earth model.
//!
//! [`JulianDate`] counts Terrestrial Time days.  Search radii, midpoints
//! and fractional positions are all computed on this axis, so "1 day"
//! anywhere in the model means one TT day.

use core::fmt;
use core::ops::{Add, Sub};

use chrono::{DateTime, Utc};

/// Julian date of the Unix epoch (1970-01-01T00:00:00 UTC).
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
/// Julian date of J2000.0.
pub const J2000: f64 = 2_451_545.0;
/// TT − UTC in seconds (37 leap seconds + 32.184 s TAI offset).
pub const TT_MINUS_UTC_SECS: f64 = 69.184;
/// Seconds per day.
pub const SECS_PER_DAY: f64 = 86_400.0;

/// An instant on the Terrestrial Time Julian-day axis.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct JulianDate(pub f64);

impl JulianDate {
    /// Build from Unix seconds (UTC).
    pub fn from_unix_secs(secs: f64) -> Self {
        Self(UNIX_EPOCH_JD + (secs + TT_MINUS_UTC_SECS) / SECS_PER_DAY)
    }

    /// Back to Unix seconds (UTC).
    pub fn to_unix_secs(self) -> f64 {
        (self.0 - UNIX_EPOCH_JD) * SECS_PER_DAY - TT_MINUS_UTC_SECS
    }

    /// Build from a UTC calendar instant.
    pub fn from_utc(time: DateTime<Utc>) -> Self {
        let secs = time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) * 1e-9;
        Self::from_unix_secs(secs)
    }

    /// UTC calendar instant, to the millisecond.  `None` outside chrono's
    /// representable range.
    pub fn utc(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis((self.to_unix_secs() * 1000.0).round() as i64)
    }

    /// TT Julian days.
    pub fn tt(self) -> f64 {
        self.0
    }

    /// UT Julian days (Earth-rotation time, used for sidereal time).
    pub fn ut(self) -> f64 {
        self.0 - TT_MINUS_UTC_SECS / SECS_PER_DAY
    }

    /// Julian centuries since J2000.0 (TT).
    pub fn centuries_since_j2000(self) -> f64 {
        (self.0 - J2000) / 36_525.0
    }

    /// Instant halfway between `self` and `other`.
    pub fn midpoint(self, other: Self) -> Self {
        Self(self.0 + (other.0 - self.0) / 2.0)
    }
}

impl From<DateTime<Utc>> for JulianDate {
    fn from(time: DateTime<Utc>) -> Self {
        Self::from_utc(time)
    }
}

impl Add<f64> for JulianDate {
    type Output = JulianDate;

    fn add(self, days: f64) -> JulianDate {
        JulianDate(self.0 + days)
    }
}

impl Sub<f64> for JulianDate {
    type Output = JulianDate;

    fn sub(self, days: f64) -> JulianDate {
        JulianDate(self.0 - days)
    }
}

impl Sub for JulianDate {
    type Output = f64;

    /// Elapsed days between two instants.
    fn sub(self, rhs: JulianDate) -> f64 {
        self.0 - rhs.0
    }
}

/// Log rendering: `YYYY-MM-DD HH:MM:SS` UTC, rounded to the second.
impl fmt::Display for JulianDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match JulianDate(self.0 + 0.5 / SECS_PER_DAY).utc() {
            Some(time) => write!(f, "{}", time.format("%Y-%m-%d %H:%M:%S")),
            None => write!(f, "JD {:.6}", self.0),
        }
    }
}

#[cfg(test)]
pub(crate) fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> JulianDate {
    use chrono::TimeZone;

    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .single()
        .map(JulianDate::from_utc)
        .expect("valid UTC calendar time")
}
