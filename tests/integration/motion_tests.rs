//! Tracking samples after calibration.

use orrery::app::events::AppEvent;
use orrery::app::ports::Direction;
use orrery::app::service::OrreryService;
use orrery::astro::time::JulianDate;
use orrery::config::SystemConfig;
use orrery::error::{ActuatorError, Error};
use orrery::motion::{AxisKind, MotionController};

use crate::mock_hw::{CollectSink, FakeAlmanac, SimRig};

const EPS: f64 = 1e-7;

fn calibrated() -> (OrreryService<FakeAlmanac>, MotionController, SimRig, CollectSink) {
    let mut svc = OrreryService::new(FakeAlmanac, SystemConfig::default());
    let mut rig = SimRig::typical();
    let mut sink = CollectSink::new();
    let homed = svc.calibrate(&mut rig, &mut sink).unwrap();
    let motion = MotionController::new(svc.config(), homed);
    rig.clear_history();
    sink.events.clear();
    (svc, motion, rig, sink)
}

#[test]
fn first_sample_moves_both_axes_from_zero() {
    let (mut svc, mut motion, mut rig, mut sink) = calibrated();

    // Just after noon on day 45: orbit 45° (25 steps), rotation 315° (175).
    let report = svc
        .sample_at(&mut motion, JulianDate(45.0 + EPS), &mut rig, &mut sink)
        .unwrap();

    assert_eq!(report.orbit.target, 25);
    assert_eq!(report.rotation.target, 175);
    assert_eq!(rig.orbit.count(Direction::Forward), 25);
    assert_eq!(rig.rotation.count(Direction::Forward), 175);
    assert!(report.model.effective_degrees() < 1e-3);
    assert!(matches!(sink.events.as_slice(), [AppEvent::Sample { .. }]));
}

#[test]
fn rotation_wraps_forward_through_the_seam() {
    let (mut svc, mut motion, mut rig, mut sink) = calibrated();
    svc.sample_at(&mut motion, JulianDate(45.0 + EPS), &mut rig, &mut sink)
        .unwrap();
    rig.clear_history();

    // Six hours later: spin 90°, orbit 45.25°, rotation 44.75° (24 steps).
    let report = svc
        .sample_at(&mut motion, JulianDate(45.25), &mut rig, &mut sink)
        .unwrap();

    assert_eq!(report.rotation.target, 24);
    assert_eq!(report.rotation.planned.steps, 49);
    assert_eq!(rig.rotation.count(Direction::Backward), 0);
    assert_eq!(rig.rotation.steps.len(), 49);
    assert_eq!(motion.axis(AxisKind::Rotation).position(), 24);
}

#[test]
fn hysteresis_holds_a_position_near_its_boundary() {
    let (mut svc, mut motion, mut rig, mut sink) = calibrated();
    svc.sample_at(&mut motion, JulianDate(45.0 + EPS), &mut rig, &mut sink)
        .unwrap();
    rig.clear_history();

    // Orbit 45.25° is 25.14 steps: inside the band around step 25.
    let report = svc
        .sample_at(&mut motion, JulianDate(45.25), &mut rig, &mut sink)
        .unwrap();

    assert_eq!(report.orbit.target, 25);
    assert!(report.orbit.planned.is_empty());
    assert!(rig.orbit.steps.is_empty());
}

#[test]
fn orbit_steps_backward_after_summer_solstice() {
    let (mut svc, mut motion, mut rig, mut sink) = calibrated();

    // Orbit 159.9° (88 steps), then 99.9° (55 steps).
    svc.sample_at(&mut motion, JulianDate(200.1), &mut rig, &mut sink)
        .unwrap();
    assert_eq!(motion.axis(AxisKind::Orbit).position(), 88);
    rig.clear_history();

    let report = svc
        .sample_at(&mut motion, JulianDate(260.1), &mut rig, &mut sink)
        .unwrap();

    assert_eq!(report.orbit.planned.direction, Direction::Backward);
    assert_eq!(rig.orbit.count(Direction::Backward), 33);
    assert_eq!(rig.orbit.count(Direction::Forward), 0);
    assert_eq!(motion.axis(AxisKind::Orbit).position(), 55);
}

#[test]
fn repeated_sample_at_the_same_instant_is_still() {
    let (mut svc, mut motion, mut rig, mut sink) = calibrated();
    let t = JulianDate(123.4);
    svc.sample_at(&mut motion, t, &mut rig, &mut sink).unwrap();
    rig.clear_history();

    let report = svc.sample_at(&mut motion, t, &mut rig, &mut sink).unwrap();

    assert!(!report.moved());
    assert!(rig.orbit.steps.is_empty());
    assert!(rig.rotation.steps.is_empty());
}

#[test]
fn stepper_fault_keeps_the_steps_taken() {
    let (mut svc, mut motion, mut rig, mut sink) = calibrated();
    rig.rotation.fail_after = Some(100);

    let report = svc
        .sample_at(&mut motion, JulianDate(45.0 + EPS), &mut rig, &mut sink)
        .unwrap();

    assert_eq!(report.rotation.planned.steps, 175);
    assert_eq!(report.rotation.issued, 100);
    assert_eq!(report.rotation.fault, Some(ActuatorError::StepWriteFailed));
    assert_eq!(motion.axis(AxisKind::Rotation).position(), 100);
    // Orbit is unaffected.
    assert_eq!(report.orbit.issued, 25);
    assert!(sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::Fault(Error::Actuator(ActuatorError::StepWriteFailed)))));
}

#[test]
fn next_sample_recovers_from_a_partial_move() {
    let (mut svc, mut motion, mut rig, mut sink) = calibrated();
    rig.rotation.fail_after = Some(100);
    let t = JulianDate(45.0 + EPS);
    svc.sample_at(&mut motion, t, &mut rig, &mut sink).unwrap();

    rig.rotation.fail_after = None;
    rig.clear_history();
    let report = svc.sample_at(&mut motion, t, &mut rig, &mut sink).unwrap();

    assert_eq!(report.rotation.issued, 75);
    assert_eq!(motion.axis(AxisKind::Rotation).position(), 175);
}
