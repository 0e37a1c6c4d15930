//! Hardware adapter — bridges the board's steppers and hall sensors to the
//! domain port traits.
//!
//! Each [`AxisHardware`] pairs one stepper with the hall sensor that marks
//! its zero; [`HardwareRig`] bundles both axes with the settle timer as the
//! [`MotorRig`] the service drives.  On non-espidf targets the underlying
//! pins are the simulated ones from `hw_init`.

use embedded_hal::delay::DelayNs;

use crate::app::ports::{Direction, MotorRig, PresenceSensor, StepperPort};
use crate::drivers::hw_init::{GpioPin, SystemDelay};
use crate::drivers::stepper::StepDirStepper;
use crate::error::{ActuatorError, SensorError};
use crate::pins;
use crate::sensors::hall_effect::HallSensor;

/// One axis: a motor and the sensor that homes it.
pub struct AxisHardware<M, S> {
    motor: M,
    sensor: S,
}

impl<M: StepperPort, S: PresenceSensor> AxisHardware<M, S> {
    pub fn new(motor: M, sensor: S) -> Self {
        Self { motor, sensor }
    }

    pub fn motor(&self) -> &M {
        &self.motor
    }
}

impl<M: StepperPort, S> StepperPort for AxisHardware<M, S> {
    fn step(&mut self, direction: Direction) -> Result<(), ActuatorError> {
        self.motor.step(direction)
    }

    fn release(&mut self) -> Result<(), ActuatorError> {
        self.motor.release()
    }
}

impl<M, S: PresenceSensor> PresenceSensor for AxisHardware<M, S> {
    fn sensing(&mut self) -> Result<bool, SensorError> {
        self.sensor.sensing()
    }
}

/// Both axes plus the settle timer.
pub struct HardwareRig<O, R, D> {
    orbit: O,
    rotation: R,
    delay: D,
}

impl<O, R, D> HardwareRig<O, R, D>
where
    O: StepperPort + PresenceSensor,
    R: StepperPort + PresenceSensor,
    D: DelayNs,
{
    pub fn new(orbit: O, rotation: R, delay: D) -> Self {
        Self {
            orbit,
            rotation,
            delay,
        }
    }
}

impl<O, R, D> MotorRig for HardwareRig<O, R, D>
where
    O: StepperPort + PresenceSensor,
    R: StepperPort + PresenceSensor,
    D: DelayNs,
{
    type Orbit = O;
    type Rotation = R;
    type Delay = D;

    fn parts(&mut self) -> (&mut O, &mut R, &mut D) {
        (&mut self.orbit, &mut self.rotation, &mut self.delay)
    }
}

// ── Board wiring ──────────────────────────────────────────────

pub type BoardStepper = StepDirStepper<GpioPin, GpioPin, GpioPin, SystemDelay>;
pub type BoardAxis = AxisHardware<BoardStepper, HallSensor<GpioPin>>;
pub type BoardRig = HardwareRig<BoardAxis, BoardAxis, SystemDelay>;

/// Build the rig from the pin map in [`pins`].  Call after
/// `hw_init::init_peripherals()`.
pub fn board_rig() -> BoardRig {
    let orbit = AxisHardware::new(
        StepDirStepper::new(
            GpioPin(pins::ORBIT_STEP_GPIO),
            GpioPin(pins::ORBIT_DIR_GPIO),
            GpioPin(pins::ORBIT_ENABLE_GPIO),
            SystemDelay,
        )
        .with_inverted_direction(pins::ORBIT_DIR_INVERTED),
        HallSensor::with_polarity(GpioPin(pins::ORBIT_HALL_GPIO), pins::HALL_ACTIVE_LOW),
    );
    let rotation = AxisHardware::new(
        StepDirStepper::new(
            GpioPin(pins::ROTATION_STEP_GPIO),
            GpioPin(pins::ROTATION_DIR_GPIO),
            GpioPin(pins::ROTATION_ENABLE_GPIO),
            SystemDelay,
        )
        .with_inverted_direction(pins::ROTATION_DIR_INVERTED),
        HallSensor::with_polarity(GpioPin(pins::ROTATION_HALL_GPIO), pins::HALL_ACTIVE_LOW),
    );
    HardwareRig::new(orbit, rotation, SystemDelay)
}
