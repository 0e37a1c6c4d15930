//! Concrete homing phase handlers and table builder.
//!
//! Each phase is defined by plain `fn` pointers — no closures, no dynamic
//! dispatch.  A handler either requests one step (stay), moves to the next
//! phase, or records a failure and moves to `Failed`.
//!
//! ```text
//!  BACK_OFF ──[sensor clear]──▶ SEEK ──[sensor hit]──▶ CLEAR
//!                                                         │
//!                                                 [sensor clear]
//!                                                         ▼
//!                              HOMED ◀──[width/2 back]── CENTER
//!
//!  BACK_OFF / SEEK / CLEAR ──[budget exhausted]──▶ FAILED
//! ```
//!
//! Every polling phase checks its budget before looking at the sensor, so a
//! phase that has used its last step fails without one more poll.

use super::context::HomingContext;
use super::{PhaseDescriptor, PhaseId};
use crate::error::CalibrationError;
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static phase table.  Called once per homing run.
pub fn build_phase_table() -> [PhaseDescriptor; PhaseId::COUNT] {
    [
        // Index 0 — BackOff
        PhaseDescriptor {
            name: "BACK_OFF",
            on_enter: Some(phase_enter),
            on_exit: Some(back_off_exit),
            on_update: back_off_update,
        },
        // Index 1 — Seek
        PhaseDescriptor {
            name: "SEEK",
            on_enter: Some(phase_enter),
            on_exit: Some(seek_exit),
            on_update: seek_update,
        },
        // Index 2 — Clear
        PhaseDescriptor {
            name: "CLEAR",
            on_enter: Some(phase_enter),
            on_exit: Some(clear_exit),
            on_update: clear_update,
        },
        // Index 3 — Center
        PhaseDescriptor {
            name: "CENTER",
            on_enter: Some(center_enter),
            on_exit: Some(center_exit),
            on_update: center_update,
        },
        // Index 4 — Homed
        PhaseDescriptor {
            name: "HOMED",
            on_enter: Some(homed_enter),
            on_exit: None,
            on_update: terminal_update,
        },
        // Index 5 — Failed
        PhaseDescriptor {
            name: "FAILED",
            on_enter: Some(failed_enter),
            on_exit: None,
            on_update: terminal_update,
        },
    ]
}

fn phase_enter(ctx: &mut HomingContext) {
    ctx.phase_steps = 0;
    ctx.request = None;
}

fn terminal_update(_ctx: &mut HomingContext) -> Option<PhaseId> {
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  BACK_OFF — step away while the magnet is over the sensor
// ═══════════════════════════════════════════════════════════════════════════

fn back_off_update(ctx: &mut HomingContext) -> Option<PhaseId> {
    if ctx.phase_steps >= ctx.config.max_sensor_steps {
        ctx.fail(CalibrationError::BackOffExhausted {
            steps: ctx.phase_steps,
        });
        return Some(PhaseId::Failed);
    }
    if !ctx.sensing {
        return Some(PhaseId::Seek);
    }
    ctx.request = Some(ctx.back_off_direction());
    None
}

fn back_off_exit(ctx: &mut HomingContext) {
    ctx.report.back_off_steps = ctx.phase_steps;
    info!("{}: scanned {} steps back off of sensor", ctx.axis, ctx.phase_steps);
}

// ═══════════════════════════════════════════════════════════════════════════
//  SEEK — step toward the sensor until it fires
// ═══════════════════════════════════════════════════════════════════════════

fn seek_update(ctx: &mut HomingContext) -> Option<PhaseId> {
    if ctx.phase_steps >= ctx.config.max_scan_steps {
        ctx.fail(CalibrationError::SensorNotFound {
            steps: ctx.phase_steps,
        });
        return Some(PhaseId::Failed);
    }
    if ctx.sensing {
        return Some(PhaseId::Clear);
    }
    ctx.request = Some(ctx.seek_direction());
    None
}

fn seek_exit(ctx: &mut HomingContext) {
    ctx.report.seek_steps = ctx.phase_steps;
    info!("{}: scanned {} steps forward to sensor", ctx.axis, ctx.phase_steps);
}

// ═══════════════════════════════════════════════════════════════════════════
//  CLEAR — keep going across the sensor, measuring its width
// ═══════════════════════════════════════════════════════════════════════════

fn clear_update(ctx: &mut HomingContext) -> Option<PhaseId> {
    if ctx.phase_steps >= ctx.config.max_sensor_steps {
        ctx.fail(CalibrationError::SensorNotCleared {
            steps: ctx.phase_steps,
        });
        return Some(PhaseId::Failed);
    }
    if !ctx.sensing {
        return Some(PhaseId::Center);
    }
    ctx.request = Some(ctx.seek_direction());
    None
}

fn clear_exit(ctx: &mut HomingContext) {
    ctx.report.clear_steps = ctx.phase_steps;
    info!("{}: scanned {} steps forward off of sensor", ctx.axis, ctx.phase_steps);
}

// ═══════════════════════════════════════════════════════════════════════════
//  CENTER — step back half the sensor width
// ═══════════════════════════════════════════════════════════════════════════

fn center_enter(ctx: &mut HomingContext) {
    phase_enter(ctx);
    info!(
        "{}: scanning back {} steps to midpoint",
        ctx.axis,
        ctx.report.clear_steps / 2
    );
}

fn center_update(ctx: &mut HomingContext) -> Option<PhaseId> {
    if ctx.phase_steps >= ctx.report.clear_steps / 2 {
        return Some(PhaseId::Homed);
    }
    ctx.request = Some(ctx.back_off_direction());
    None
}

fn center_exit(ctx: &mut HomingContext) {
    ctx.report.center_steps = ctx.phase_steps;
}

// ═══════════════════════════════════════════════════════════════════════════
//  Terminal phases
// ═══════════════════════════════════════════════════════════════════════════

fn homed_enter(ctx: &mut HomingContext) {
    ctx.request = None;
    info!(
        "{}: homed at sensor midpoint ({} steps total)",
        ctx.axis,
        ctx.report.total_steps()
    );
}

fn failed_enter(ctx: &mut HomingContext) {
    ctx.request = None;
    match ctx.failure {
        Some(e) => warn!("{}: calibration failed: {e}", ctx.axis),
        None => warn!("{}: calibration failed", ctx.axis),
    }
}
