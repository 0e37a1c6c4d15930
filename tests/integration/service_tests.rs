//! End-to-end: start, calibrate, sample, journal, triage, release.

use orrery::adapters::nvs::NvsAdapter;
use orrery::app::events::AppEvent;
use orrery::app::ports::{AlmanacPort, ConfigPort};
use orrery::app::service::OrreryService;
use orrery::astro::time::JulianDate;
use orrery::astro::timeline::Season;
use orrery::config::SystemConfig;
use orrery::diagnostics::{Journal, JournalSink};
use orrery::error::{ClockError, Error, ModelError, Observable};
use orrery::motion::MotionController;
use orrery::safety::ReleaseGuard;

use crate::mock_hw::{CollectSink, FakeAlmanac, FixedClock, MemStorage, SimRig};

struct NoEvents;

impl AlmanacPort for NoEvents {
    fn seasons(&self, _: JulianDate, _: JulianDate) -> Vec<(JulianDate, Season)> {
        Vec::new()
    }

    fn sunrise_sunset(&self, _: JulianDate, _: JulianDate) -> Vec<(JulianDate, bool)> {
        Vec::new()
    }
}

#[test]
fn journal_records_the_whole_run() {
    let mut svc = OrreryService::new(FakeAlmanac, SystemConfig::default());
    let mut rig = SimRig::typical();
    let mut sinks = (
        CollectSink::new(),
        JournalSink::new(Journal::open(MemStorage::new(), 4000, 3)),
    );
    let clock = FixedClock::at(45.0 + 1e-7);

    svc.start(&mut sinks);
    let homed = svc.calibrate(&mut rig, &mut sinks).unwrap();
    let mut motion = MotionController::new(svc.config(), homed);
    svc.sample(&mut motion, &clock, &mut rig, &mut sinks).unwrap();

    let lines = sinks.1.journal().lines();
    assert_eq!(lines[0], "START | steps_per_revolution=200");
    assert_eq!(lines[1], "CAL | orbit homed | back_off=0 seek=22 clear=4 center=2");
    assert_eq!(lines[2], "CAL | rotation homed | back_off=0 seek=50 clear=4 center=2");
    assert!(lines[3].starts_with("SAMPLE | "), "{}", lines[3]);
    assert!(lines[3].contains("target=25"), "{}", lines[3]);
    assert_eq!(lines[4], "MOVE | orbit forward 25/25 steps -> 25");
    assert_eq!(lines[5], "MOVE | rotation forward 175/175 steps -> 175");
    assert_eq!(lines.len(), 6);
    // The collecting sink saw the same four events.
    assert_eq!(sinks.0.events.len(), 4);
    assert_eq!(svc.sample_count(), 1);
}

#[test]
fn unsynced_clock_is_a_fault_not_a_stop() {
    let mut svc = OrreryService::new(FakeAlmanac, SystemConfig::default());
    let mut rig = SimRig::typical();
    let mut sink = CollectSink::new();
    let homed = svc.calibrate(&mut rig, &mut sink).unwrap();
    let mut motion = MotionController::new(svc.config(), homed);
    rig.clear_history();

    let err = svc
        .sample(&mut motion, &FixedClock::unsynced(), &mut rig, &mut sink)
        .unwrap_err();
    assert_eq!(err, Error::Clock(ClockError::NotSynced));
    assert!(svc.triage(err, &mut sink).is_ok());

    assert!(matches!(
        sink.events.last(),
        Some(AppEvent::Fault(Error::Clock(ClockError::NotSynced)))
    ));
    assert!(rig.orbit.steps.is_empty());
    assert!(rig.rotation.steps.is_empty());
}

#[test]
fn clock_recovery_resumes_tracking() {
    let mut svc = OrreryService::new(FakeAlmanac, SystemConfig::default());
    let mut rig = SimRig::typical();
    let mut sink = CollectSink::new();
    let homed = svc.calibrate(&mut rig, &mut sink).unwrap();
    let mut motion = MotionController::new(svc.config(), homed);
    let clock = FixedClock::unsynced();

    assert!(svc.sample(&mut motion, &clock, &mut rig, &mut sink).is_err());
    clock.set(45.0 + 1e-7);
    let report = svc.sample(&mut motion, &clock, &mut rig, &mut sink).unwrap();

    assert_eq!(report.orbit.position, 25);
}

#[test]
fn missing_events_stop_the_loop() {
    let mut svc = OrreryService::new(NoEvents, SystemConfig::default());
    let mut rig = SimRig::typical();
    let mut sink = CollectSink::new();
    let homed = svc.calibrate(&mut rig, &mut sink).unwrap();
    let mut motion = MotionController::new(svc.config(), homed);
    rig.clear_history();

    let err = svc
        .sample(&mut motion, &FixedClock::at(100.3), &mut rig, &mut sink)
        .unwrap_err();

    assert_eq!(
        err,
        Error::Model(ModelError::NoSurroundingEvents(Observable::Seasons))
    );
    assert_eq!(svc.triage(err, &mut sink), Err(err));
    assert!(matches!(sink.events.last(), Some(AppEvent::Fatal(_))));
    assert!(rig.orbit.steps.is_empty());
}

#[test]
fn guard_releases_both_motors_on_early_exit() {
    let rig = SimRig::typical();
    let orbit_released = rig.orbit.released.clone();
    let rotation_released = rig.rotation.released.clone();

    fn run(rig: SimRig) -> Result<(), Error> {
        let mut svc = OrreryService::new(NoEvents, SystemConfig::default());
        let mut rig = ReleaseGuard::new(rig);
        let mut sink = CollectSink::new();
        let homed = svc.calibrate(&mut *rig, &mut sink)?;
        let mut motion = MotionController::new(svc.config(), homed);
        svc.sample_at(&mut motion, JulianDate(100.3), &mut *rig, &mut sink)?;
        Ok(())
    }

    assert!(run(rig).is_err());
    assert_eq!(orbit_released.get(), 1);
    assert_eq!(rotation_released.get(), 1);
}

#[test]
fn stored_config_drives_the_service() {
    let nvs = NvsAdapter::new().unwrap();
    let mut config = SystemConfig::default();
    config.steps_per_revolution = 400;
    nvs.save(&config).unwrap();

    let loaded = nvs.load().unwrap();
    let mut svc = OrreryService::new(FakeAlmanac, loaded);
    let mut rig = SimRig::typical();
    let mut sink = CollectSink::new();
    let homed = svc.calibrate(&mut rig, &mut sink).unwrap();
    let mut motion = MotionController::new(svc.config(), homed);

    let report = svc
        .sample_at(&mut motion, JulianDate(45.0 + 1e-7), &mut rig, &mut sink)
        .unwrap();

    // 45° at 0.9°/step.
    assert_eq!(report.orbit.target, 50);
}

#[test]
fn journal_survives_on_nvs() {
    let nvs = NvsAdapter::new().unwrap();
    let mut sink = JournalSink::new(Journal::open(nvs, 256, 2));
    let mut svc = OrreryService::new(FakeAlmanac, SystemConfig::default());
    svc.start(&mut sink);

    assert_eq!(sink.journal().lines(), vec!["START | steps_per_revolution=200"]);
}
