//! Motion control: per-axis step state and the tracking controller.

pub mod axis;
pub mod controller;

pub use axis::{AxisKind, AxisState, Move};
pub use crate::app::ports::Direction;
pub use controller::{AxisSample, Homed, MotionController, SampleReport};
