//! STEP/DIR stepper driver (A4988 / DRV8825 class).
//!
//! Generic over `embedded-hal` 1.0 output pins and a short busy-wait delay
//! for the pulse timing, so the same driver runs on ESP-IDF GPIOs and on
//! the host against recording pins.
//!
//! ENABLE is active-low.  The coils are energised lazily on the first step
//! after construction or after [`release`](StepperPort::release), and DIR
//! is only rewritten when the direction actually changes.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::debug;

use crate::app::ports::{Direction, StepperPort};
use crate::error::ActuatorError;
use crate::pins;

pub struct StepDirStepper<STEP, DIR, EN, D> {
    step: STEP,
    dir: DIR,
    enable: EN,
    delay: D,
    /// Swap forward/backward for a motor wired the other way round.
    invert_direction: bool,
    current_dir: Option<Direction>,
    energised: bool,
    pulses: u64,
}

impl<STEP, DIR, EN, D> StepDirStepper<STEP, DIR, EN, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
{
    pub fn new(step: STEP, dir: DIR, enable: EN, delay: D) -> Self {
        Self {
            step,
            dir,
            enable,
            delay,
            invert_direction: false,
            current_dir: None,
            energised: false,
            pulses: 0,
        }
    }

    #[must_use]
    pub fn with_inverted_direction(mut self, inverted: bool) -> Self {
        self.invert_direction = inverted;
        self
    }

    /// Pulses issued since construction.
    pub fn pulses(&self) -> u64 {
        self.pulses
    }

    pub fn is_energised(&self) -> bool {
        self.energised
    }

    fn energise(&mut self) -> Result<(), ActuatorError> {
        if !self.energised {
            self.enable
                .set_low()
                .map_err(|_| ActuatorError::EnableWriteFailed)?;
            self.energised = true;
        }
        Ok(())
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), ActuatorError> {
        if self.current_dir == Some(direction) {
            return Ok(());
        }
        let high = (direction == Direction::Forward) != self.invert_direction;
        self.dir
            .set_state(high.into())
            .map_err(|_| ActuatorError::DirectionWriteFailed)?;
        self.current_dir = Some(direction);
        self.delay.delay_us(pins::DIR_SETUP_US);
        Ok(())
    }
}

impl<STEP, DIR, EN, D> StepperPort for StepDirStepper<STEP, DIR, EN, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
{
    fn step(&mut self, direction: Direction) -> Result<(), ActuatorError> {
        self.energise()?;
        self.set_direction(direction)?;
        self.step
            .set_high()
            .map_err(|_| ActuatorError::StepWriteFailed)?;
        self.delay.delay_us(pins::STEP_PULSE_US);
        self.step
            .set_low()
            .map_err(|_| ActuatorError::StepWriteFailed)?;
        self.pulses += 1;
        Ok(())
    }

    fn release(&mut self) -> Result<(), ActuatorError> {
        self.enable
            .set_high()
            .map_err(|_| ActuatorError::EnableWriteFailed)?;
        if self.energised {
            debug!("stepper released after {} pulses", self.pulses);
        }
        self.energised = false;
        Ok(())
    }
}
