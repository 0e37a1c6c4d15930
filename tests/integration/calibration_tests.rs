//! Calibration through `OrreryService` against simulated axes.

use orrery::app::events::AppEvent;
use orrery::app::ports::Direction;
use orrery::app::service::OrreryService;
use orrery::config::SystemConfig;
use orrery::error::{CalibrationError, Error};
use orrery::motion::AxisKind;

use crate::mock_hw::{CollectSink, FakeAlmanac, SimAxis, SimRig};

#[test]
fn both_axes_end_at_their_sensor_midpoints() {
    let mut svc = OrreryService::new(FakeAlmanac, SystemConfig::default());
    let mut rig = SimRig::typical();
    let mut sink = CollectSink::new();

    svc.calibrate(&mut rig, &mut sink).unwrap();

    // Orbit seeks backward: 30 → 8, clears to 4, centers forward to 6.
    assert_eq!(rig.orbit.position, 6);
    assert_eq!(rig.orbit.count(Direction::Backward), 26);
    assert_eq!(rig.orbit.count(Direction::Forward), 2);
    // Rotation seeks forward: 0 → 50, clears to 54, centers back to 52.
    assert_eq!(rig.rotation.position, 52);
}

#[test]
fn orbit_is_homed_before_rotation() {
    let mut svc = OrreryService::new(FakeAlmanac, SystemConfig::default());
    let mut rig = SimRig::typical();
    let mut sink = CollectSink::new();

    svc.calibrate(&mut rig, &mut sink).unwrap();

    let axes: Vec<AxisKind> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Calibrated { axis, .. } => Some(*axis),
            _ => None,
        })
        .collect();
    assert_eq!(axes, vec![AxisKind::Orbit, AxisKind::Rotation]);
}

#[test]
fn report_matches_steps_taken() {
    let mut svc = OrreryService::new(FakeAlmanac, SystemConfig::default());
    let mut rig = SimRig::typical();
    let mut sink = CollectSink::new();

    svc.calibrate(&mut rig, &mut sink).unwrap();

    let report = sink
        .events
        .iter()
        .find_map(|e| match e {
            AppEvent::Calibrated {
                axis: AxisKind::Rotation,
                report,
            } => Some(*report),
            _ => None,
        })
        .unwrap();
    assert_eq!(report.back_off_steps, 0);
    assert_eq!(report.seek_steps, 50);
    assert_eq!(report.clear_steps, 4);
    assert_eq!(report.center_steps, 2);
    assert_eq!(report.total_steps() as usize, rig.rotation.steps.len());
}

#[test]
fn every_step_is_followed_by_the_settle_delay() {
    let config = SystemConfig::default();
    let settle = u64::from(config.step_settle_ms);
    let mut svc = OrreryService::new(FakeAlmanac, config);
    let mut rig = SimRig::typical();
    let mut sink = CollectSink::new();

    svc.calibrate(&mut rig, &mut sink).unwrap();

    let steps = (rig.orbit.steps.len() + rig.rotation.steps.len()) as u64;
    assert_eq!(rig.delay.total_ms(), steps * settle);
}

#[test]
fn starting_on_the_sensor_backs_off_first() {
    let mut svc = OrreryService::new(FakeAlmanac, SystemConfig::default());
    let mut rig = SimRig::typical();
    rig.rotation = SimAxis::new(51, 50, 53);
    let mut sink = CollectSink::new();

    svc.calibrate(&mut rig, &mut sink).unwrap();

    // Back off 51 → 49, seek to 50, clear to 54, center to 52.
    assert_eq!(rig.rotation.steps[..2], [Direction::Backward, Direction::Backward]);
    assert_eq!(rig.rotation.position, 52);
}

#[test]
fn unreachable_sensor_fails_with_scan_budget() {
    let mut svc = OrreryService::new(FakeAlmanac, SystemConfig::default());
    let mut rig = SimRig::typical();
    rig.rotation = SimAxis::new(0, 500, 503);
    let mut sink = CollectSink::new();

    let err = svc.calibrate(&mut rig, &mut sink).unwrap_err();

    assert_eq!(
        err,
        Error::Calibration(CalibrationError::SensorNotFound { steps: 200 })
    );
    assert!(!err.is_fatal());
    assert_eq!(rig.rotation.steps.len(), 200);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::CalibrationFailed { axis: AxisKind::Rotation, .. })),
        1
    );
}

#[test]
fn orbit_failure_skips_rotation() {
    let mut svc = OrreryService::new(FakeAlmanac, SystemConfig::default());
    let mut rig = SimRig::typical();
    rig.orbit.sensor_broken = true;
    let mut sink = CollectSink::new();

    let err = svc.calibrate(&mut rig, &mut sink).unwrap_err();

    assert_eq!(err, Error::Calibration(CalibrationError::Sensor { steps: 0 }));
    assert!(rig.rotation.steps.is_empty());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::Calibrated { .. })), 0);
}

#[test]
fn stepper_fault_aborts_homing() {
    let mut svc = OrreryService::new(FakeAlmanac, SystemConfig::default());
    let mut rig = SimRig::typical();
    rig.orbit.fail_after = Some(10);
    let mut sink = CollectSink::new();

    let err = svc.calibrate(&mut rig, &mut sink).unwrap_err();

    assert_eq!(err, Error::Calibration(CalibrationError::Actuator { steps: 10 }));
    assert_eq!(rig.orbit.steps.len(), 10);
}

#[test]
fn retry_picks_up_where_the_last_attempt_stopped() {
    let mut config = SystemConfig::default();
    config.calibration_attempts = 2;
    config.rotation_homing.max_scan_steps = 100;
    let mut svc = OrreryService::new(FakeAlmanac, config);
    let mut rig = SimRig::typical();
    rig.rotation = SimAxis::new(0, 150, 153);
    let mut sink = CollectSink::new();

    svc.calibrate(&mut rig, &mut sink).unwrap();

    // First attempt runs out at 100; the second seeks 50 more.
    assert_eq!(rig.rotation.position, 152);
    assert!(matches!(
        sink.events.iter().find(|e| matches!(e, AppEvent::CalibrationFailed { .. })),
        Some(AppEvent::CalibrationFailed {
            axis: AxisKind::Rotation,
            attempt: 1,
            error: CalibrationError::SensorNotFound { steps: 100 },
        })
    ));
    assert_eq!(sink.count(|e| matches!(e, AppEvent::Calibrated { .. })), 2);
}

#[test]
fn attempts_are_bounded() {
    let mut config = SystemConfig::default();
    config.calibration_attempts = 3;
    let mut svc = OrreryService::new(FakeAlmanac, config);
    let mut rig = SimRig::typical();
    rig.orbit.sensor_broken = true;
    let mut sink = CollectSink::new();

    assert!(svc.calibrate(&mut rig, &mut sink).is_err());
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::CalibrationFailed { .. })),
        3
    );
}
