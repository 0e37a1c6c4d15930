//! A3144 hall-effect switch, one per axis.
//!
//! The switch is open-drain and pulls its line LOW while the axis magnet
//! sits over it.  Reads are single polls with no debouncing; the homing
//! phases treat each sample as authoritative.

use embedded_hal::digital::InputPin;
use log::trace;

use crate::app::ports::PresenceSensor;
use crate::error::SensorError;

pub struct HallSensor<P> {
    pin: P,
    /// Polarity: `true` when the magnet pulls the line LOW.
    active_low: bool,
    last: Option<bool>,
}

impl<P: InputPin> HallSensor<P> {
    /// A3144 wiring: magnet present = LOW.
    pub fn new(pin: P) -> Self {
        Self::with_polarity(pin, true)
    }

    /// `active_low = false` for push-pull breakouts that drive HIGH on
    /// the magnet.
    pub fn with_polarity(pin: P, active_low: bool) -> Self {
        Self {
            pin,
            active_low,
            last: None,
        }
    }

    /// The most recent successful read, if any.
    pub fn last(&self) -> Option<bool> {
        self.last
    }
}

impl<P: InputPin> PresenceSensor for HallSensor<P> {
    fn sensing(&mut self) -> Result<bool, SensorError> {
        let low = self.pin.is_low().map_err(|_| SensorError::GpioReadFailed)?;
        let present = low == self.active_low;
        if self.last != Some(present) {
            trace!("hall: magnet {}", if present { "present" } else { "absent" });
        }
        self.last = Some(present);
        Ok(present)
    }
}
