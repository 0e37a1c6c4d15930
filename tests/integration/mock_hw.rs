//! Mock adapters for integration tests.
//!
//! Simulated axes record every step so tests can assert on the full
//! command history without touching real GPIO registers.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use orrery::app::events::AppEvent;
use orrery::app::ports::{
    AlmanacPort, ClockPort, Direction, EventSink, MotorRig, PresenceSensor, StepperPort,
    StorageError, StoragePort,
};
use orrery::astro::time::JulianDate;
use orrery::astro::timeline::Season;
use orrery::error::{ActuatorError, ClockError, SensorError};

// ── Almanac ───────────────────────────────────────────────────

/// Seasons every 90 days with a winter solstice at day 0; sunrise at
/// x.75 and sunset at x.25, so solar noon falls on whole days and nadir
/// on x.5.
pub struct FakeAlmanac;

impl AlmanacPort for FakeAlmanac {
    fn seasons(&self, start: JulianDate, end: JulianDate) -> Vec<(JulianDate, Season)> {
        let first = (start.tt() / 90.0).ceil() as i64;
        let last = (end.tt() / 90.0).floor() as i64;
        (first..=last)
            .map(|k| {
                let code = (k + 3).rem_euclid(4) as u8;
                (JulianDate(k as f64 * 90.0), Season::from_code(code))
            })
            .collect()
    }

    fn sunrise_sunset(&self, start: JulianDate, end: JulianDate) -> Vec<(JulianDate, bool)> {
        let first = (start.tt() * 2.0 - 0.5).ceil() as i64;
        let last = (end.tt() * 2.0 - 0.5).floor() as i64;
        (first..=last)
            .map(|k| (JulianDate(k as f64 / 2.0 + 0.25), k.rem_euclid(2) == 1))
            .collect()
    }
}

// ── Axis ──────────────────────────────────────────────────────

/// One simulated axis: a stepper plus a hall sensor that fires while the
/// position is inside `[lo, hi]`.
pub struct SimAxis {
    pub position: i64,
    pub lo: i64,
    pub hi: i64,
    pub steps: Vec<Direction>,
    /// Steps at or beyond this count fail.
    pub fail_after: Option<usize>,
    pub sensor_broken: bool,
    pub released: Rc<Cell<u32>>,
}

impl SimAxis {
    pub fn new(position: i64, lo: i64, hi: i64) -> Self {
        Self {
            position,
            lo,
            hi,
            steps: Vec::new(),
            fail_after: None,
            sensor_broken: false,
            released: Rc::new(Cell::new(0)),
        }
    }

    pub fn clear_history(&mut self) {
        self.steps.clear();
    }

    pub fn count(&self, direction: Direction) -> usize {
        self.steps.iter().filter(|d| **d == direction).count()
    }
}

impl StepperPort for SimAxis {
    fn step(&mut self, direction: Direction) -> Result<(), ActuatorError> {
        if self.fail_after.is_some_and(|n| self.steps.len() >= n) {
            return Err(ActuatorError::StepWriteFailed);
        }
        self.position += direction.sign();
        self.steps.push(direction);
        Ok(())
    }

    fn release(&mut self) -> Result<(), ActuatorError> {
        self.released.set(self.released.get() + 1);
        Ok(())
    }
}

impl PresenceSensor for SimAxis {
    fn sensing(&mut self) -> Result<bool, SensorError> {
        if self.sensor_broken {
            return Err(SensorError::GpioReadFailed);
        }
        Ok((self.lo..=self.hi).contains(&self.position))
    }
}

// ── Delay ─────────────────────────────────────────────────────

/// Accumulates requested delay instead of sleeping.
#[derive(Default)]
pub struct CountingDelay {
    pub total_ns: u64,
}

impl CountingDelay {
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub struct SimRig {
    pub orbit: SimAxis,
    pub rotation: SimAxis,
    pub delay: CountingDelay,
}

impl SimRig {
    /// Orbit magnet at steps 5..=8 (seeked backward from 30), rotation
    /// magnet at 50..=53 (seeked forward from 0).
    pub fn typical() -> Self {
        Self {
            orbit: SimAxis::new(30, 5, 8),
            rotation: SimAxis::new(0, 50, 53),
            delay: CountingDelay::default(),
        }
    }

    pub fn clear_history(&mut self) {
        self.orbit.clear_history();
        self.rotation.clear_history();
    }
}

impl MotorRig for SimRig {
    type Orbit = SimAxis;
    type Rotation = SimAxis;
    type Delay = CountingDelay;

    fn parts(&mut self) -> (&mut SimAxis, &mut SimAxis, &mut CountingDelay) {
        (&mut self.orbit, &mut self.rotation, &mut self.delay)
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Clock pinned to a settable instant; `None` means not synced.
pub struct FixedClock {
    now: Cell<Option<f64>>,
}

impl FixedClock {
    pub fn at(jd: f64) -> Self {
        Self {
            now: Cell::new(Some(jd)),
        }
    }

    pub fn unsynced() -> Self {
        Self {
            now: Cell::new(None),
        }
    }

    pub fn set(&self, jd: f64) {
        self.now.set(Some(jd));
    }
}

impl ClockPort for FixedClock {
    fn now(&self) -> Result<JulianDate, ClockError> {
        self.now.get().map(JulianDate).ok_or(ClockError::NotSynced)
    }
}

// ── Storage ───────────────────────────────────────────────────

/// In-memory NVS stand-in.
#[derive(Default)]
pub struct MemStorage {
    data: RefCell<HashMap<String, Vec<u8>>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.data.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl StoragePort for MemStorage {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.data.borrow().get(&format!("{namespace}::{key}")) {
            Some(v) => {
                let len = v.len().min(buf.len());
                buf[..len].copy_from_slice(&v[..len]);
                Ok(len)
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.data
            .borrow_mut()
            .insert(format!("{namespace}::{key}"), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.data.borrow_mut().remove(&format!("{namespace}::{key}"));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.data.borrow().contains_key(&format!("{namespace}::{key}"))
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct CollectSink {
    pub events: Vec<AppEvent>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for CollectSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
