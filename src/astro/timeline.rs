//! Event Timeline Engine.
//!
//! Turns almanac queries into ordered [`EventTime`] sequences and derives
//! the solar noon / nadir timeline from sunrise/sunset pairs.  Sequences are
//! built fresh on every query; nothing is cached between samples.

use core::fmt;

use crate::app::ports::AlmanacPort;

use super::time::JulianDate;

/// Search radius (TT days) for season events, spaced about 91 days apart.
pub const SEASON_RADIUS_DAYS: f64 = 100.0;
/// Search radius (TT days) for sunrise/sunset events.
pub const RISE_SET_RADIUS_DAYS: f64 = 1.0;

/// Season codes as the almanac numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    VernalEquinox = 0,
    SummerSolstice = 1,
    AutumnalEquinox = 2,
    WinterSolstice = 3,
}

impl Season {
    /// Map an almanac code (taken mod 4) to a season.
    pub fn from_code(code: u8) -> Self {
        match code % 4 {
            0 => Self::VernalEquinox,
            1 => Self::SummerSolstice,
            2 => Self::AutumnalEquinox,
            _ => Self::WinterSolstice,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::VernalEquinox => "Vernal Equinox",
            Self::SummerSolstice => "Summer Solstice",
            Self::AutumnalEquinox => "Autumnal Equinox",
            Self::WinterSolstice => "Winter Solstice",
        }
    }
}

/// What an event says: a season change or a boolean sun flag.
///
/// The boolean is `true` for sunrise and the solar noon derived from it,
/// `false` for sunset and nadir.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Season(Season),
    Sun(bool),
}

/// Tagged event plus its display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub label: &'static str,
}

impl Event {
    pub fn season(season: Season) -> Self {
        Self {
            kind: EventKind::Season(season),
            label: season.label(),
        }
    }

    pub fn rise_set(rising: bool) -> Self {
        Self {
            kind: EventKind::Sun(rising),
            label: if rising { "Sunrise" } else { "Sunset" },
        }
    }

    pub fn noon_nadir(noon: bool) -> Self {
        Self {
            kind: EventKind::Sun(noon),
            label: if noon { "Solar noon" } else { "Nadir" },
        }
    }

    /// Season code, if this is a season event.
    pub fn as_season(&self) -> Option<Season> {
        match self.kind {
            EventKind::Season(s) => Some(s),
            EventKind::Sun(_) => None,
        }
    }

    /// Sun flag, if this is a rise/set or noon/nadir event.
    pub fn sun_flag(&self) -> Option<bool> {
        match self.kind {
            EventKind::Sun(b) => Some(b),
            EventKind::Season(_) => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label)
    }
}

/// An event at an absolute instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventTime {
    pub event: Event,
    pub time: JulianDate,
}

impl EventTime {
    pub fn new(event: Event, time: JulianDate) -> Self {
        Self { event, time }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.event, self.time)
    }
}

/// Season changes in `[start, end]`, ascending.
pub fn season_event_times<A: AlmanacPort + ?Sized>(
    almanac: &A,
    start: JulianDate,
    end: JulianDate,
) -> Vec<EventTime> {
    almanac
        .seasons(start, end)
        .into_iter()
        .map(|(t, season)| EventTime::new(Event::season(season), t))
        .collect()
}

/// Sunrises (`true`) and sunsets (`false`) in `[start, end]`, ascending.
pub fn rise_set_event_times<A: AlmanacPort + ?Sized>(
    almanac: &A,
    start: JulianDate,
    end: JulianDate,
) -> Vec<EventTime> {
    almanac
        .sunrise_sunset(start, end)
        .into_iter()
        .map(|(t, rising)| EventTime::new(Event::rise_set(rising), t))
        .collect()
}

/// Midpoints of consecutive rise/set pairs.  A pair starting at sunrise
/// yields solar noon, one starting at sunset yields nadir.  One fewer event
/// than the underlying rise/set sequence.
pub fn noon_nadir_event_times<A: AlmanacPort + ?Sized>(
    almanac: &A,
    start: JulianDate,
    end: JulianDate,
) -> Vec<EventTime> {
    noon_nadir_from_rise_set(&rise_set_event_times(almanac, start, end))
}

/// Pure half of [`noon_nadir_event_times`].
pub fn noon_nadir_from_rise_set(rise_set: &[EventTime]) -> Vec<EventTime> {
    rise_set
        .windows(2)
        .map(|pair| {
            let (x, y) = (pair[0], pair[1]);
            let noon = x.event.sun_flag().unwrap_or(false);
            EventTime::new(Event::noon_nadir(noon), x.time.midpoint(y.time))
        })
        .collect()
}

/// First consecutive pair `(x, y)` with `x.time < time < y.time`.
///
/// `None` when `time` lies outside the covered range or exactly on an
/// event; callers treat that as a broken invariant.
pub fn find_surrounding_events(events: &[EventTime], time: JulianDate) -> Option<(EventTime, EventTime)> {
    events
        .windows(2)
        .find(|pair| pair[0].time < time && time < pair[1].time)
        .map(|pair| (pair[0], pair[1]))
}

/// Query `events_fn` over `[time − radius, time + radius]` and return the
/// pair straddling `time`.
pub fn surrounding_events<F>(time: JulianDate, radius: f64, events_fn: F) -> Option<(EventTime, EventTime)>
where
    F: FnOnce(JulianDate, JulianDate) -> Vec<EventTime>,
{
    let events = events_fn(time - radius, time + radius);
    find_surrounding_events(&events, time)
}
