//! Function-pointer finite state machine engine for axis homing.
//!
//! Classic embedded FSM pattern:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  PhaseTable                                                │
//! │  ┌──────────┬───────────┬──────────┬───────────────────┐   │
//! │  │ PhaseId  │ on_enter  │ on_exit  │ on_update         │   │
//! │  ├──────────┼───────────┼──────────┼───────────────────┤   │
//! │  │ BackOff  │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  │ Seek     │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  │ Clear    │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  │ Center   │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  │ Homed    │ fn(ctx)   │ —        │ fn(ctx)->None     │   │
//! │  │ Failed   │ fn(ctx)   │ —        │ fn(ctx)->None     │   │
//! │  └──────────┴───────────┴──────────┴───────────────────┘   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** phase.
//! If it returns `Some(next_id)`, the engine runs `on_exit` for the
//! current phase, then `on_enter` for the next, and updates the
//! current pointer.  All functions receive `&mut HomingContext`.
//!
//! [`home_axis`] drives the machine against real ports: poll the sensor,
//! tick, issue the requested step, settle, repeat until a terminal phase.

pub mod context;
pub mod states;

use context::{CalibrationReport, HomingContext};
use embedded_hal::delay::DelayNs;
use log::{debug, info};

use crate::app::ports::{PresenceSensor, StepperPort};
use crate::config::HomingConfig;
use crate::error::CalibrationError;
use crate::motion::axis::AxisKind;

// ---------------------------------------------------------------------------
// Phase identity
// ---------------------------------------------------------------------------

/// Enumeration of all homing phases.
/// Must stay in sync with the table built in [`states::build_phase_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PhaseId {
    BackOff = 0,
    Seek = 1,
    Clear = 2,
    Center = 3,
    Homed = 4,
    Failed = 5,
}

impl PhaseId {
    /// Total number of phases — used to size the table array.
    pub const COUNT: usize = 6;

    /// Convert an index back to `PhaseId`.  Panics on out-of-range in
    /// debug builds; returns `Failed` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::BackOff,
            1 => Self::Seek,
            2 => Self::Clear,
            3 => Self::Center,
            4 => Self::Homed,
            5 => Self::Failed,
            _ => {
                debug_assert!(false, "invalid phase index: {idx}");
                Self::Failed
            }
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Homed | Self::Failed)
    }

    /// Phases that read the hall sensor each tick.
    pub fn polls_sensor(self) -> bool {
        matches!(self, Self::BackOff | Self::Seek | Self::Clear)
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type PhaseActionFn = fn(&mut HomingContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type PhaseUpdateFn = fn(&mut HomingContext) -> Option<PhaseId>;

// ---------------------------------------------------------------------------
// Phase descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single phase.
/// Rows are indexed by `PhaseId as usize`.
pub struct PhaseDescriptor {
    pub name: &'static str,
    pub on_enter: Option<PhaseActionFn>,
    pub on_exit: Option<PhaseActionFn>,
    pub on_update: PhaseUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
pub struct Fsm {
    /// Fixed-size table indexed by `PhaseId as usize`.
    table: [PhaseDescriptor; PhaseId::COUNT],
    /// Index of the currently active phase.
    current: usize,
}

impl Fsm {
    /// Construct a new FSM with the given table, starting in `initial`.
    pub fn new(table: [PhaseDescriptor; PhaseId::COUNT], initial: PhaseId) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter` for the starting phase.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut HomingContext) {
        debug!("{}: homing starts in {}", ctx.axis, self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick.
    pub fn tick(&mut self, ctx: &mut HomingContext) {
        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Force an immediate transition (used by the runner to jump to
    /// `Failed` when a port call fails).
    pub fn force_transition(&mut self, next: PhaseId, ctx: &mut HomingContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    /// The current phase's identity.
    pub fn current_phase(&self) -> PhaseId {
        PhaseId::from_index(self.current)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: PhaseId, ctx: &mut HomingContext) {
        let next_idx = next_id as usize;

        debug!(
            "{}: {} -> {}",
            ctx.axis, self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Home one axis against its hall sensor.
///
/// `hw` is the axis' stepper and sensor as one borrow, the same way the
/// tracking loop sees it.
///
/// On success the axis sits at the sensor midpoint, which becomes step 0.
/// On failure the axis position is undefined and must not be used for
/// absolute positioning.
pub fn home_axis<H, D>(
    axis: AxisKind,
    config: HomingConfig,
    settle_ms: u32,
    hw: &mut H,
    delay: &mut D,
) -> Result<CalibrationReport, CalibrationError>
where
    H: StepperPort + PresenceSensor + ?Sized,
    D: DelayNs + ?Sized,
{
    info!(
        "{axis}: homing ({} seek, scan {} / sensor {} steps)",
        if config.forward { "forward" } else { "backward" },
        config.max_scan_steps,
        config.max_sensor_steps
    );

    let mut fsm = Fsm::new(states::build_phase_table(), PhaseId::BackOff);
    let mut ctx = HomingContext::new(axis, config);
    fsm.start(&mut ctx);

    while !fsm.current_phase().is_terminal() {
        let phase = fsm.current_phase();
        if phase.polls_sensor() && within_budget(phase, &ctx) {
            match hw.sensing() {
                Ok(v) => ctx.sensing = v,
                Err(_) => {
                    ctx.fail(CalibrationError::Sensor {
                        steps: ctx.phase_steps,
                    });
                    fsm.force_transition(PhaseId::Failed, &mut ctx);
                    continue;
                }
            }
        }

        fsm.tick(&mut ctx);

        if let Some(direction) = ctx.request.take() {
            if hw.step(direction).is_err() {
                ctx.fail(CalibrationError::Actuator {
                    steps: ctx.phase_steps,
                });
                fsm.force_transition(PhaseId::Failed, &mut ctx);
                continue;
            }
            ctx.phase_steps += 1;
            delay.delay_ms(settle_ms);
        }
    }

    match ctx.failure {
        Some(e) => Err(e),
        None => Ok(ctx.report),
    }
}

/// Whether `phase` still has step budget, i.e. will look at the sensor.
fn within_budget(phase: PhaseId, ctx: &HomingContext) -> bool {
    let budget = match phase {
        PhaseId::Seek => ctx.config.max_scan_steps,
        _ => ctx.config.max_sensor_steps,
    };
    ctx.phase_steps < budget
}
